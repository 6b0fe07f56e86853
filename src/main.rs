//! `install-sct`: bootstrap the Spinal Cord Toolbox into an isolated
//! environment.

mod cli;
mod output;

use cli::{CliAction, USAGE_EXIT_CODE};
use sct_bootstrap::{Bootstrap, BootstrapConfig, BootstrapError, HostEnvironment};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match cli::parse_args(std::env::args_os()) {
        CliAction::Run(cli) => cli,
        CliAction::Usage { message } => {
            if let Some(message) = message {
                output::error(&message);
            }
            println!("{}", cli::usage());
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match BootstrapConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                output::failure(&e, &BootstrapConfig::default());
                return ExitCode::FAILURE;
            }
        },
        None => BootstrapConfig::default(),
    };

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            output::failure(&BootstrapError::io("read", ".", e), &config);
            return ExitCode::FAILURE;
        }
    };
    let request = cli.to_request(&cwd);
    let host = HostEnvironment::capture(config.options().probe_timeout).await;

    output::banner(&config.toolbox.name);
    let result = Bootstrap::new(config.clone(), host)
        .run(request, output::stage, interrupted())
        .await;

    match result {
        Ok(summary) => {
            output::summary(&summary, &config);
            ExitCode::SUCCESS
        }
        Err(e) => {
            output::failure(&e, &config);
            if e.is_user_abort() {
                // A prompt may still be blocking its thread; do not wait for it.
                let _ = console::Term::stderr().show_cursor();
                std::process::exit(e.exit_code());
            }
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Initialize tracing on stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("trace")
        } else {
            EnvFilter::new("warn,sct_bootstrap=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

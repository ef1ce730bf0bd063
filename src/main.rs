//! zapit - automate an OWASP ZAP scan from the command line

use clap::Parser;
use log::debug;
use tokio_util::sync::CancellationToken;

mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod report;
mod scan;
mod supervisor;

use cli::Cli;
use error::{Error, SupervisorError};
use models::ScanStatus;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.debug);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli::run::run(&cli, &cancel).await {
        Ok(outcome) => {
            if outcome.scan == ScanStatus::Cancelled {
                println!();
            }
            if let Err(err) = output::print(&outcome, cli.format) {
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
        }
        Err(Error::Supervisor(SupervisorError::Cancelled)) => println!(),
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "zapit=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Cancel the run on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            cancel.cancel();
        }
    });
}

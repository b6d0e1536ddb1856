//! intakedesk - police-report intake dashboard backend.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use intakedesk::{load_config, Config};
use intakedesk_server::shutdown::install_signal_handler;
use intakedesk_server::{run, App};

/// Serves the intake dashboard API and delivers pipeline webhooks.
#[derive(Parser, Debug)]
#[command(name = "intakedesk", version, about, long_about = None)]
struct Cli {
    /// Config file (JSON, or YAML for .yaml/.yml). Defaults apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("intakedesk: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Err(e) = intakedesk::logging::init(&config.logging) {
        eprintln!("intakedesk: {}", e);
        return ExitCode::FAILURE;
    }

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config, app, install_signal_handler()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

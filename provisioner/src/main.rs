//! Provisioner - Entry Point
//!
//! Bootstraps and configures one remote host over SSH, then reports the outcome.

use std::env;

use anyhow::Context;
use provisioner::app::options::{parse_args, AppOptions, Mode};
use provisioner::app::run::{exit_code, load_settings, print_version, run, EXIT_FAILED, EXIT_OK};
use provisioner::errors::ProvisionError;
use provisioner::logs::{init_logging, LogOptions};

use tracing::{error, info};

/// Exit status for an error that reached the entry point
fn exit_status(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ProvisionError>()
        .map(exit_code)
        .unwrap_or(EXIT_FAILED)
}

#[tokio::main]
async fn main() {
    let cli_args = parse_args(env::args().skip(1));
    let options = AppOptions::from_args(&cli_args);

    // Print version and exit
    if options.mode == Mode::Version {
        let code = match print_version() {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("{e}");
                EXIT_FAILED
            }
        };
        std::process::exit(code);
    }

    // Retrieve the settings file
    let settings = match load_settings(&options.config_path)
        .await
        .with_context(|| format!("Unable to load settings from {}", options.config_path.display()))
    {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(exit_status(&e));
        }
    };

    // Initialize logging; the guard flushes the file sink on exit
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    let guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Running provisioner with options: {:?}", options);
    let code = match run(&options, settings).await.context("Provisioning failed") {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{e:#}");
            exit_status(&e)
        }
    };

    drop(guard);
    std::process::exit(code);
}

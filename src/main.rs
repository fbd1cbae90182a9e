mod classify;
mod cli;
mod config;
mod database;
mod error;
mod registry;
mod reports;
mod scan;
mod schema;

use log::error;

use crate::cli::Cli;
use crate::config::Config;

fn main() {
    let config = Config::load();

    // The handle must stay alive for the lifetime of the process
    let logger = flexi_logger::Logger::try_with_str(format!("regscan={}", config.logging.regscan))
        .and_then(|logger| logger.start());
    if let Err(err) = &logger {
        eprintln!("Failed to initialize logging: {err}");
    }

    if let Err(err) = Cli::handle_command_line(&config) {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

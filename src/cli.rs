use clap::{Parser, Subcommand};
use log::info;

use crate::config::Config;
use crate::database::Database;
use crate::error::RegScanError;
use crate::registry::Status;
use crate::reports::Reports;
use crate::scan::{Scan, ScanSettings};

#[derive(Parser)]
#[command(
    name = "regscan",
    version,
    about = "regscan: vendor report delivery tree scanner"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan a delivery tree and register newly seen files
    Scan {
        /// Root directory of the delivery tree
        #[arg(long = "root", short = 'r')]
        root: String,

        /// Comma-separated extension allow-list; "" allows all (default: configured list)
        #[arg(long = "ext", short = 'e')]
        extensions: Option<String>,

        /// Walk and classify without writing to the registry
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,

        /// Database file directory (default: current directory)
        #[arg(long = "dbpath", short = 'd', default_value = ".")]
        dbpath: String,
    },

    /// Report registry status counts and recent entries
    Report {
        /// Only list entries with this status (NEW, PROCESSING, ERROR, CREATED, DELETE)
        #[arg(long = "status", short = 's')]
        status: Option<String>,

        /// Number of entries to list (default: 10)
        #[arg(long = "count", short = 'c', default_value_t = 10)]
        count: u64,

        /// Database file directory (default: current directory)
        #[arg(long = "dbpath", short = 'd', default_value = ".")]
        dbpath: String,
    },
}

impl Cli {
    pub fn handle_command_line(config: &Config) -> Result<(), RegScanError> {
        let args = Cli::parse();

        match args.command {
            Command::Scan {
                root,
                extensions,
                dry_run,
                dbpath,
            } => Self::do_scan(config, &root, extensions, dry_run, &dbpath),
            Command::Report {
                status,
                count,
                dbpath,
            } => Self::do_report(status, count, &dbpath),
        }
    }

    fn do_scan(
        config: &Config,
        root: &str,
        extensions: Option<String>,
        dry_run: bool,
        dbpath: &str,
    ) -> Result<(), RegScanError> {
        let ext_spec = extensions.unwrap_or_else(|| config.scan.extensions().to_owned());
        let settings = ScanSettings::new(root, &ext_spec, dry_run)?;

        let mut db = Database::connect(dbpath)?;

        info!(
            "Scanning '{}' (dry_run: {}, allowed extensions: {:?})",
            settings.root().display(),
            settings.dry_run(),
            settings.allowed_exts()
        );

        let scan = Scan::run(&mut db, settings)?;
        Reports::print_scan_summary(&scan);

        Ok(())
    }

    fn do_report(status: Option<String>, count: u64, dbpath: &str) -> Result<(), RegScanError> {
        let status = match status {
            Some(status_arg) => Some(
                status_arg
                    .trim()
                    .to_ascii_uppercase()
                    .parse::<Status>()
                    .map_err(|_| {
                        RegScanError::Error(format!("Invalid status: '{status_arg}'"))
                    })?,
            ),
            None => None,
        };

        let db = Database::connect(dbpath)?;
        Reports::print_registry(&db, status, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing_scan_command() {
        let result = Cli::try_parse_from(["regscan", "scan", "--root", "/data/deliveries"]);
        assert!(result.is_ok(), "Should accept scan with a root");

        let cli = result.unwrap();
        match cli.command {
            Command::Scan {
                root,
                extensions,
                dry_run,
                dbpath,
            } => {
                assert_eq!(root, "/data/deliveries");
                assert!(extensions.is_none());
                assert!(!dry_run);
                assert_eq!(dbpath, ".");
            }
            _ => panic!("Expected scan command"),
        }
    }

    #[test]
    fn test_cli_parsing_scan_flags() {
        let cli = Cli::try_parse_from([
            "regscan", "scan", "-r", "/data", "-e", "csv,xlsx", "--dry-run", "-d", "/var/db",
        ])
        .unwrap();

        match cli.command {
            Command::Scan {
                root,
                extensions,
                dry_run,
                dbpath,
            } => {
                assert_eq!(root, "/data");
                assert_eq!(extensions.as_deref(), Some("csv,xlsx"));
                assert!(dry_run);
                assert_eq!(dbpath, "/var/db");
            }
            _ => panic!("Expected scan command"),
        }
    }

    #[test]
    fn test_cli_parsing_scan_requires_root() {
        let result = Cli::try_parse_from(["regscan", "scan"]);
        assert!(result.is_err(), "Should reject scan without a root");
    }

    #[test]
    fn test_cli_parsing_report_defaults() {
        let cli = Cli::try_parse_from(["regscan", "report"]).unwrap();

        match cli.command {
            Command::Report {
                status,
                count,
                dbpath,
            } => {
                assert!(status.is_none());
                assert_eq!(count, 10);
                assert_eq!(dbpath, ".");
            }
            _ => panic!("Expected report command"),
        }
    }

    #[test]
    fn test_cli_parsing_invalid_arguments() {
        let result = Cli::try_parse_from(["regscan", "nonexistent-command"]);
        assert!(result.is_err(), "Should reject unknown commands");

        let result = Cli::try_parse_from(["regscan", "report", "--invalid-flag"]);
        assert!(result.is_err(), "Should reject unknown flags on report");
    }
}

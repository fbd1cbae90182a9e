use chrono::{DateTime, Local};
use strum::IntoEnumIterator;

use crate::database::Database;
use crate::error::RegScanError;
use crate::registry::{FileRegistryEntry, Status, StatusCounts};
use crate::scan::Scan;

pub struct Reports {
    // No fields
}

impl Reports {
    /// The one-line summary printed after a non-fatal scan.
    pub fn print_scan_summary(scan: &Scan) {
        let counts = scan.counts();
        let mode = if scan.settings().dry_run() {
            " (dry run)"
        } else {
            ""
        };

        println!(
            "[{}] Scan of '{}' complete{}: {} files seen | {} added | {} skipped by filter | {} skipped by structure",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            scan.settings().root().display(),
            mode,
            counts.total,
            counts.added,
            counts.skipped_filter,
            counts.skipped_structure,
        );
    }

    /// Status totals plus the most recent entries, newest first.
    pub fn print_registry(
        db: &Database,
        status: Option<Status>,
        count: u64,
    ) -> Result<(), RegScanError> {
        let status_counts = StatusCounts::get(db)?;

        println!("Registry: {} entries", FileRegistryEntry::count(db)?);
        for known_status in Status::iter() {
            println!(
                "  {:<10} {}",
                known_status.as_ref(),
                status_counts.count_of(known_status)
            );
        }

        println!();
        match status {
            Some(status) => println!("Most recent {} entries with status {}:", count, status.as_ref()),
            None => println!("Most recent {count} entries:"),
        }

        FileRegistryEntry::for_each_entry(db, status, count, |entry| {
            println!(
                "  #{:<5} {:<10} {:<11} {:04}-{:02} {}/{}  {}  (uploaded {}, registered {})",
                entry.entry_id(),
                entry.status(),
                entry.data_provider(),
                entry.report_year(),
                entry.report_month(),
                entry.client_name(),
                entry.report_type(),
                entry.file_path(),
                Self::format_epoch(entry.uploaded_at()),
                Self::format_epoch(entry.created_at()),
            );
            if let Some(reason) = entry.error_reason() {
                println!("         reason: {reason}");
            }
            Ok(())
        })
    }

    fn format_epoch(epoch: i64) -> String {
        DateTime::from_timestamp(epoch, 0)
            .map(|stamp| stamp.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| epoch.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_epoch() {
        assert_eq!(Reports::format_epoch(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(Reports::format_epoch(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }
}

use log::{debug, info, warn};
use rusqlite::Connection;

use std::collections::VecDeque;
use std::fs;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::{env, time};

use crate::classify;
use crate::database::Database;
use crate::error::RegScanError;
use crate::registry::FileRegistryEntry;

/// Editor lock artifacts (e.g. spreadsheets open for editing) carry this prefix.
const LOCK_PREFIX: &str = "~$";
/// Temp artifacts by extension, matched case-insensitively.
const TEMP_EXT: &str = "tmp";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub total: u64,
    pub added: u64,
    pub skipped_filter: u64,
    pub skipped_structure: u64,
}

/// Per-run scan configuration. Built once from the CLI arguments and passed
/// into [`Scan::run`] - scans carry no ambient state.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    root: PathBuf,
    allowed_exts: Vec<String>,
    dry_run: bool,
}

impl ScanSettings {
    /// Validates and canonicalizes the root and normalizes the allow-list.
    /// An empty extension spec allows every extension.
    pub fn new(root_arg: &str, ext_spec: &str, dry_run: bool) -> Result<Self, RegScanError> {
        let root = Self::validate_and_canonicalize_root(root_arg)?;

        Ok(ScanSettings {
            root,
            allowed_exts: Self::parse_ext_list(ext_spec),
            dry_run,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allowed_exts(&self) -> &[String] {
        &self.allowed_exts
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn parse_ext_list(ext_spec: &str) -> Vec<String> {
        ext_spec
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    fn validate_and_canonicalize_root(path_arg: &str) -> Result<PathBuf, RegScanError> {
        let path_arg = path_arg.trim();
        if path_arg.is_empty() {
            return Err(RegScanError::Error("Provided root path is empty".into()));
        }

        let path = Path::new(path_arg);

        let absolute_path = if path.is_absolute() {
            path.to_owned()
        } else {
            env::current_dir()?.join(path)
        };

        if !absolute_path.exists() {
            return Err(RegScanError::Error(format!(
                "Root path '{}' does not exist",
                absolute_path.display()
            )));
        }

        let metadata = fs::symlink_metadata(&absolute_path)?;

        if metadata.file_type().is_symlink() {
            return Err(RegScanError::Error(format!(
                "Root path '{}' is a symlink and not allowed",
                absolute_path.display()
            )));
        }

        if !metadata.is_dir() {
            return Err(RegScanError::Error(format!(
                "Root path '{}' is not a directory",
                absolute_path.display()
            )));
        }

        // Canonicalize using Dunce (de-UNC) to strip the "UNC" (e.g., \\?\C) on Windows
        let canonical_path = dunce::canonicalize(absolute_path)?;

        Ok(canonical_path)
    }
}

/// One traversal of a delivery tree: walk, filter, classify, and register
/// newly seen files.
pub struct Scan {
    settings: ScanSettings,
    counts: ScanCounts,
}

impl Scan {
    /// Walks the configured root and registers every newly seen, well-formed
    /// file with status NEW. All inserts run in one transaction committed at
    /// the end; an aborted scan rolls back and the next run re-registers. In
    /// dry-run mode no write transaction is opened at all.
    pub fn run(db: &mut Database, settings: ScanSettings) -> Result<Scan, RegScanError> {
        let mut scan = Scan {
            settings,
            counts: ScanCounts::default(),
        };

        if scan.settings.dry_run {
            scan.walk(db.conn())?;
        } else {
            let tx = db.conn_mut().transaction()?;
            scan.walk(&tx)?;
            tx.commit()?;
        }

        Ok(scan)
    }

    pub fn counts(&self) -> &ScanCounts {
        &self.counts
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    fn walk(&mut self, conn: &Connection) -> Result<(), RegScanError> {
        let mut q = VecDeque::new();

        q.push_back(self.settings.root.clone());

        while let Some(dir) = q.pop_front() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Cannot read directory '{}': {}", dir.display(), err);
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("Cannot read entry in '{}': {}", dir.display(), err);
                        continue;
                    }
                };

                // Use symlink_metadata so symlinked directories are not followed
                let metadata = match fs::symlink_metadata(entry.path()) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        warn!("Cannot stat '{}': {}", entry.path().display(), err);
                        continue;
                    }
                };

                if metadata.is_dir() {
                    q.push_back(entry.path());
                } else {
                    self.handle_file(conn, &entry.path(), &metadata)?;
                }
            }
        }

        Ok(())
    }

    /// Filters, classifies, and registers a single file. Per-file problems
    /// are logged and counted; only database errors propagate.
    fn handle_file(
        &mut self,
        conn: &Connection,
        path: &Path,
        metadata: &Metadata,
    ) -> Result<(), RegScanError> {
        self.counts.total += 1;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if is_filtered(&file_name, &self.settings.allowed_exts) {
            self.counts.skipped_filter += 1;
            debug!("Filtered out '{}'", path.display());
            return Ok(());
        }

        let rel = path.strip_prefix(&self.settings.root).map_err(|_| {
            RegScanError::Error(format!(
                "Path '{}' is outside the scan root",
                path.display()
            ))
        })?;

        let segments: Vec<String> = rel
            .components()
            .map(|comp| comp.as_os_str().to_string_lossy().into_owned())
            .collect();
        let segment_refs: Vec<&str> = segments.iter().map(String::as_str).collect();

        // The registry key: root-relative with '/' separators, so the same
        // tree produces the same keys on every host
        let rel_key = segments.join("/");

        let source = match classify::classify(&segment_refs) {
            Ok(source) => source,
            Err(err) => {
                warn!("Skipping '{}': {}", rel_key, err);
                self.counts.skipped_structure += 1;
                return Ok(());
            }
        };

        let uploaded_at = match mtime_epoch(metadata) {
            Some(uploaded_at) => uploaded_at,
            None => {
                warn!("Skipping '{}': cannot read modification time", rel_key);
                self.counts.skipped_structure += 1;
                return Ok(());
            }
        };

        if self.settings.dry_run {
            if !FileRegistryEntry::exists(conn, &rel_key)? {
                self.counts.added += 1;
                info!("Would add '{}'", rel_key);
            }
        } else if FileRegistryEntry::insert_new(conn, &rel_key, uploaded_at, &source)? {
            self.counts.added += 1;
            debug!("Registered '{}' ({})", rel_key, source.provider.long_name());
        }

        Ok(())
    }
}

/// A file is filtered out when it is a lock/temp artifact, or when a
/// non-empty allow-list does not contain its extension. Extension matching
/// is case-insensitive; extensionless files never match a non-empty list.
fn is_filtered(file_name: &str, allowed_exts: &[String]) -> bool {
    if file_name.starts_with(LOCK_PREFIX) {
        return true;
    }

    let ext = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    if ext.as_deref() == Some(TEMP_EXT) {
        return true;
    }

    if allowed_exts.is_empty() {
        return false;
    }

    match ext {
        Some(ext) => !allowed_exts.iter().any(|allowed| *allowed == ext),
        None => true,
    }
}

fn mtime_epoch(metadata: &Metadata) -> Option<i64> {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.duration_since(time::UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs() as i64)
}

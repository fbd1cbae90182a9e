use rusqlite::{params, Connection, OptionalExtension};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::classify::ReportSource;
use crate::database::Database;
use crate::error::RegScanError;

/// Lifecycle states of a registry entry. The scanner only ever writes `New`;
/// the remaining states belong to downstream report processing.
#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum Status {
    #[strum(serialize = "NEW")]
    New,
    #[strum(serialize = "PROCESSING")]
    Processing,
    #[strum(serialize = "ERROR")]
    Error,
    #[strum(serialize = "CREATED")]
    Created,
    #[strum(serialize = "DELETE")]
    Delete,
}

#[derive(Clone, Debug, Default)]
pub struct FileRegistryEntry {
    entry_id: i64,
    file_path: String,
    uploaded_at: i64,
    status: String,
    data_provider: String,
    report_year: i64,
    report_month: i64,
    client_name: String,
    report_type: String,
    created_at: i64,
    error_reason: Option<String>,
}

impl FileRegistryEntry {
    /// Registers a newly seen file with status NEW. Returns true if a row was
    /// inserted, false if the path was already registered (silent no-op).
    /// Only the duplicate-path conflict is ignored - CHECK violations still
    /// surface as database errors.
    ///
    /// Takes a raw connection so the scan loop can run it inside its
    /// transaction.
    pub fn insert_new(
        conn: &Connection,
        file_path: &str,
        uploaded_at: i64,
        source: &ReportSource,
    ) -> Result<bool, RegScanError> {
        let rows = conn.execute(
            "INSERT INTO file_registry
               (file_path, uploaded_at, status, data_provider, report_year, report_month, client_name, report_type)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (file_path) DO NOTHING",
            params![
                file_path,
                uploaded_at,
                Status::New.as_ref(),
                source.provider.as_ref(),
                source.report_year,
                source.report_month,
                source.client_name,
                source.report_type,
            ],
        )?;

        Ok(rows > 0)
    }

    pub fn exists(conn: &Connection, file_path: &str) -> Result<bool, RegScanError> {
        let row: Option<i64> = conn
            .query_row(
                "SELECT entry_id FROM file_registry WHERE file_path = ?",
                [file_path],
                |row| row.get(0),
            )
            .optional()?;

        Ok(row.is_some())
    }

    pub fn get_by_path(db: &Database, file_path: &str) -> Result<Option<Self>, RegScanError> {
        db.conn()
            .query_row(
                "SELECT entry_id, file_path, uploaded_at, status, data_provider, report_year,
                        report_month, client_name, report_type, created_at, error_reason
                 FROM file_registry
                 WHERE file_path = ?",
                [file_path],
                Self::from_row,
            )
            .optional()
            .map_err(RegScanError::DatabaseError)
    }

    pub fn entry_id(&self) -> i64 {
        self.entry_id
    }
    pub fn file_path(&self) -> &str {
        &self.file_path
    }
    pub fn uploaded_at(&self) -> i64 {
        self.uploaded_at
    }
    pub fn status(&self) -> &str {
        &self.status
    }
    pub fn data_provider(&self) -> &str {
        &self.data_provider
    }
    pub fn report_year(&self) -> i64 {
        self.report_year
    }
    pub fn report_month(&self) -> i64 {
        self.report_month
    }
    pub fn client_name(&self) -> &str {
        &self.client_name
    }
    pub fn report_type(&self) -> &str {
        &self.report_type
    }
    pub fn created_at(&self) -> i64 {
        self.created_at
    }
    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    /// Visits the most recent `limit` entries, newest first, optionally
    /// restricted to one status.
    pub fn for_each_entry<F>(
        db: &Database,
        status: Option<Status>,
        limit: u64,
        mut func: F,
    ) -> Result<(), RegScanError>
    where
        F: FnMut(&FileRegistryEntry) -> Result<(), RegScanError>,
    {
        let mut stmt = db.conn().prepare(
            "SELECT entry_id, file_path, uploaded_at, status, data_provider, report_year,
                    report_month, client_name, report_type, created_at, error_reason
             FROM file_registry
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY entry_id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(
            params![status.map(|s| s.as_ref().to_owned()), limit as i64],
            Self::from_row,
        )?;

        for row in rows {
            let entry = row?;
            func(&entry)?;
        }

        Ok(())
    }

    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(FileRegistryEntry {
            entry_id: row.get(0)?,
            file_path: row.get(1)?,
            uploaded_at: row.get(2)?,
            status: row.get(3)?,
            data_provider: row.get(4)?,
            report_year: row.get(5)?,
            report_month: row.get(6)?,
            client_name: row.get(7)?,
            report_type: row.get(8)?,
            created_at: row.get(9)?,
            error_reason: row.get(10)?,
        })
    }

    pub fn count(db: &Database) -> Result<i64, RegScanError> {
        let count = db
            .conn()
            .query_row("SELECT count(*) FROM file_registry", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct StatusCounts {
    pub new_count: i64,
    pub processing_count: i64,
    pub error_count: i64,
    pub created_count: i64,
    pub delete_count: i64,
}

impl StatusCounts {
    pub fn get(db: &Database) -> Result<Self, RegScanError> {
        let mut counts = StatusCounts::default();

        let mut stmt = db
            .conn()
            .prepare("SELECT status, COUNT(*) FROM file_registry GROUP BY status")?;

        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;

            let status = status
                .parse()
                .map_err(|_| RegScanError::Error(format!("Invalid status in database: '{status}'")))?;

            counts.set_count_of(status, count);
        }

        Ok(counts)
    }

    pub fn set_count_of(&mut self, status: Status, count: i64) {
        let target = match status {
            Status::New => &mut self.new_count,
            Status::Processing => &mut self.processing_count,
            Status::Error => &mut self.error_count,
            Status::Created => &mut self.created_count,
            Status::Delete => &mut self.delete_count,
        };
        *target = count;
    }

    pub fn count_of(&self, status: Status) -> i64 {
        match status {
            Status::New => self.new_count,
            Status::Processing => self.processing_count,
            Status::Error => self.error_count,
            Status::Created => self.created_count,
            Status::Delete => self.delete_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ProviderKind;
    use strum::IntoEnumIterator;

    fn test_db(dir: &tempfile::TempDir) -> Database {
        Database::connect(dir.path().to_str().unwrap()).unwrap()
    }

    fn sample_source() -> ReportSource {
        ReportSource {
            provider: ProviderKind::Network,
            report_year: 2024,
            report_month: 3,
            client_name: "ClientA".to_string(),
            report_type: "Invoices".to_string(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in Status::iter() {
            let parsed: Status = status.as_ref().parse().unwrap();
            assert_eq!(status, parsed);
        }
        assert!("UNKNOWN".parse::<Status>().is_err());
    }

    #[test]
    fn test_insert_new_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        let path = "network-type/2024/03/ClientA/Invoices/report.csv";
        assert!(FileRegistryEntry::insert_new(db.conn(), path, 1_700_000_000, &source).unwrap());
        assert!(!FileRegistryEntry::insert_new(db.conn(), path, 1_700_000_999, &source).unwrap());

        assert_eq!(FileRegistryEntry::count(&db).unwrap(), 1);

        // The original row is untouched by the ignored insert
        let entry = FileRegistryEntry::get_by_path(&db, path).unwrap().unwrap();
        assert_eq!(entry.uploaded_at(), 1_700_000_000);
    }

    #[test]
    fn test_insert_and_get_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        let path = "network-type/2024/03/ClientA/Invoices/report.csv";
        FileRegistryEntry::insert_new(db.conn(), path, 1_700_000_000, &source).unwrap();

        let entry = FileRegistryEntry::get_by_path(&db, path).unwrap().unwrap();
        assert_eq!(entry.file_path(), path);
        assert_eq!(entry.status(), "NEW");
        assert_eq!(entry.data_provider(), "NETWORK");
        assert_eq!(entry.report_year(), 2024);
        assert_eq!(entry.report_month(), 3);
        assert_eq!(entry.client_name(), "ClientA");
        assert_eq!(entry.report_type(), "Invoices");
        assert_eq!(entry.error_reason(), None);
        assert!(entry.entry_id() > 0);
        assert!(entry.created_at() > 0);

        assert!(FileRegistryEntry::get_by_path(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        assert!(!FileRegistryEntry::exists(db.conn(), "some/path.csv").unwrap());
        FileRegistryEntry::insert_new(db.conn(), "some/path.csv", 1, &source).unwrap();
        assert!(FileRegistryEntry::exists(db.conn(), "some/path.csv").unwrap());
    }

    #[test]
    fn test_for_each_entry_limit_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        for i in 0..5 {
            let path = format!("network-type/2024/03/ClientA/Invoices/r{i}.csv");
            FileRegistryEntry::insert_new(db.conn(), &path, 100 + i, &source).unwrap();
        }

        let mut seen = Vec::new();
        FileRegistryEntry::for_each_entry(&db, None, 3, |entry| {
            seen.push(entry.file_path().to_string());
            Ok(())
        })
        .unwrap();

        // Newest first, capped at the limit
        assert_eq!(
            seen,
            vec![
                "network-type/2024/03/ClientA/Invoices/r4.csv",
                "network-type/2024/03/ClientA/Invoices/r3.csv",
                "network-type/2024/03/ClientA/Invoices/r2.csv",
            ]
        );
    }

    #[test]
    fn test_for_each_entry_status_filter() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        FileRegistryEntry::insert_new(db.conn(), "a.csv", 1, &source).unwrap();
        FileRegistryEntry::insert_new(db.conn(), "b.csv", 2, &source).unwrap();
        db.conn()
            .execute(
                "UPDATE file_registry SET status = 'PROCESSING' WHERE file_path = 'b.csv'",
                [],
            )
            .unwrap();

        let mut seen = Vec::new();
        FileRegistryEntry::for_each_entry(&db, Some(Status::Processing), 10, |entry| {
            seen.push(entry.file_path().to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec!["b.csv"]);
    }

    #[test]
    fn test_status_counts() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let source = sample_source();

        for i in 0..4 {
            FileRegistryEntry::insert_new(db.conn(), &format!("f{i}.csv"), i, &source).unwrap();
        }
        db.conn()
            .execute(
                "UPDATE file_registry SET status = 'CREATED' WHERE file_path = 'f0.csv'",
                [],
            )
            .unwrap();

        let counts = StatusCounts::get(&db).unwrap();
        assert_eq!(counts.new_count, 3);
        assert_eq!(counts.created_count, 1);
        assert_eq!(counts.processing_count, 0);
        assert_eq!(counts.count_of(Status::New), 3);
        assert_eq!(counts.count_of(Status::Created), 1);
    }

    #[test]
    fn test_insert_rejects_year_below_range() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let mut source = sample_source();
        source.report_year = 1999;

        // Only the duplicate-path conflict is a no-op; constraint violations
        // are real errors
        let result = FileRegistryEntry::insert_new(db.conn(), "old.csv", 1, &source);
        assert!(matches!(result, Err(RegScanError::DatabaseError(_))));
    }
}

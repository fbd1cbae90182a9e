use rusqlite::{Connection, OptionalExtension};
use std::{io, path::Path};

use crate::error::RegScanError;
use crate::schema::CREATE_SCHEMA_SQL;

const DB_FILENAME: &str = "regscan.db";
const SCHEMA_VERSION: &str = "1";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the registry database inside `db_folder`
    /// and ensures the schema exists. Safe to call on every invocation.
    pub fn connect(db_folder: &str) -> Result<Self, RegScanError> {
        let folder_path = Path::new(db_folder);

        // Ensure the folder exists and is a directory
        if !folder_path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!(
                    "Database folder '{}' does not exist or is not a directory",
                    db_folder
                ),
            )
            .into());
        }

        let db_path = folder_path.join(DB_FILENAME);

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };

        db.ensure_schema()?;

        Ok(db)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn ensure_schema(&self) -> Result<(), RegScanError> {
        let table_exists: bool = self
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false);

        if !table_exists {
            return self.create_schema();
        }

        // Get the stored schema version
        let stored_version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()), // Schema is up to date
            Some(other) => Err(RegScanError::Error(format!(
                "Database schema version mismatch: found '{other}', expected '{SCHEMA_VERSION}'"
            ))),
            None => Err(RegScanError::Error("Schema version missing".to_string())),
        }
    }

    fn create_schema(&self) -> Result<(), RegScanError> {
        self.conn.execute_batch(CREATE_SCHEMA_SQL)?;
        Ok(())
    }
}

pub const CREATE_SCHEMA_SQL: &str = r#"
BEGIN TRANSACTION;

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '1');

-- One row per distinct file path ever seen under a delivery root.
-- The scanner only inserts rows with status NEW; downstream processing
-- owns every later transition.
CREATE TABLE IF NOT EXISTS file_registry (
    entry_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path      TEXT NOT NULL,     -- Root-relative, '/'-separated
    uploaded_at    INTEGER NOT NULL,  -- File mtime (Unix epoch seconds, UTC)
    status         TEXT NOT NULL CHECK (status IN ('NEW','PROCESSING','ERROR','CREATED','DELETE')),
    data_provider  TEXT NOT NULL CHECK (data_provider IN ('NETWORK','DISTRIBUTOR')),
    report_year    INTEGER NOT NULL CHECK (report_year >= 2000),
    report_month   INTEGER NOT NULL CHECK (report_month BETWEEN 1 AND 12),
    client_name    TEXT NOT NULL,
    report_type    TEXT NOT NULL,
    created_at     INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    error_reason   TEXT DEFAULT NULL
);

-- The idempotence key: re-registering an already seen path is a no-op
CREATE UNIQUE INDEX IF NOT EXISTS uq_file_registry_path ON file_registry (file_path);

-- Indexes for the downstream consumers and the report command
CREATE INDEX IF NOT EXISTS idx_file_registry_status ON file_registry (status);
CREATE INDEX IF NOT EXISTS idx_file_registry_provider ON file_registry (data_provider);
CREATE INDEX IF NOT EXISTS idx_file_registry_period ON file_registry (report_year, report_month);
CREATE INDEX IF NOT EXISTS idx_file_registry_client ON file_registry (client_name);

COMMIT;
"#;

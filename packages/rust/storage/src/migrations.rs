//! SQL migration definitions for the keyword database.
//!
//! Migrations are applied in order on database open. Each migration is a
//! batch of statements that records its own version.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: keywords, runs",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cumulative clustered keywords; every run appends, nothing is deduplicated.
CREATE TABLE IF NOT EXISTS keywords (
    cluster INTEGER,
    keyword TEXT
);

CREATE TABLE IF NOT EXISTS runs (
    id            TEXT PRIMARY KEY,
    query         TEXT NOT NULL,
    started_at    TEXT NOT NULL,
    finished_at   TEXT NOT NULL,
    pages_used    INTEGER NOT NULL,
    pages_skipped INTEGER NOT NULL,
    keyword_count INTEGER NOT NULL,
    cluster_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

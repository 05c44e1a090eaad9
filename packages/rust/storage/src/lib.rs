//! libSQL storage for clustered keywords.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the cumulative
//! `keywords` table (`cluster`, `keyword`) and a `runs` history table.
//!
//! **Access rules:**
//! - pipeline runs append through [`Storage::open`] (the [`KeywordStore`] impl)
//! - review commands read through [`Storage::open_readonly`]

mod migrations;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use serpcluster_shared::{
    ClusterAssignment, Keyword, KeywordStore, Result, RunId, RunRecord, SerpClusterError,
    StoredKeywordRow,
};

fn storage_err(e: impl std::fmt::Display) -> SerpClusterError {
    SerpClusterError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// Serializes appends so one run's rows are written in one transaction
    /// without another run's transaction opening on the same connection.
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SerpClusterError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            write_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SerpClusterError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            write_lock: Mutex::new(()),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        SerpClusterError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            // Table doesn't exist yet
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SerpClusterError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Keywords
    // -----------------------------------------------------------------------

    /// Every stored row, oldest first.
    pub async fn list_rows(&self) -> Result<Vec<StoredKeywordRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT cluster, keyword FROM keywords ORDER BY rowid",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            out.push(StoredKeywordRow {
                cluster: row.get::<i64>(0).map_err(storage_err)?,
                keyword: row.get::<String>(1).map_err(storage_err)?,
            });
        }
        Ok(out)
    }

    /// The cumulative table grouped by cluster index. Keywords keep insertion
    /// order and may repeat across runs.
    pub async fn list_clusters(&self) -> Result<BTreeMap<i64, Vec<Keyword>>> {
        let mut clusters: BTreeMap<i64, Vec<Keyword>> = BTreeMap::new();
        for row in self.list_rows().await? {
            clusters.entry(row.cluster).or_default().push(row.keyword);
        }
        Ok(clusters)
    }

    /// Number of rows in the keyword table.
    pub async fn count_rows(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM keywords", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Run history
    // -----------------------------------------------------------------------

    /// The most recent runs, newest first.
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, query, started_at, finished_at, pages_used, pages_skipped,
                        keyword_count, cluster_count
                 FROM runs ORDER BY started_at DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(storage_err)?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let id: String = row.get(0).map_err(storage_err)?;
            let started_at: String = row.get(2).map_err(storage_err)?;
            let finished_at: String = row.get(3).map_err(storage_err)?;

            runs.push(RunRecord {
                id: id
                    .parse::<RunId>()
                    .map_err(|e| SerpClusterError::Storage(format!("bad run id {id}: {e}")))?,
                query: row.get(1).map_err(storage_err)?,
                started_at: parse_timestamp(&started_at)?,
                finished_at: parse_timestamp(&finished_at)?,
                pages_used: row.get::<i64>(4).map_err(storage_err)? as usize,
                pages_skipped: row.get::<i64>(5).map_err(storage_err)? as usize,
                keyword_count: row.get::<i64>(6).map_err(storage_err)? as usize,
                cluster_count: row.get::<i64>(7).map_err(storage_err)? as usize,
            });
        }
        Ok(runs)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SerpClusterError::Storage(format!("bad timestamp {raw}: {e}")))
}

#[async_trait]
impl KeywordStore for Storage {
    /// Insert the run summary and all of its keyword rows in one transaction.
    #[instrument(skip_all, fields(run_id = %run.id, clusters = assignment.cluster_count()))]
    async fn append_run(&self, run: &RunRecord, assignment: &ClusterAssignment) -> Result<usize> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;

        let tx = self.conn.transaction().await.map_err(storage_err)?;
        let rows = assignment.rows();

        let written = async {
            tx.execute(
                "INSERT INTO runs (id, query, started_at, finished_at, pages_used, pages_skipped,
                                   keyword_count, cluster_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.id.to_string(),
                    run.query.as_str(),
                    run.started_at.to_rfc3339(),
                    run.finished_at.to_rfc3339(),
                    run.pages_used as i64,
                    run.pages_skipped as i64,
                    run.keyword_count as i64,
                    run.cluster_count as i64,
                ],
            )
            .await?;

            for row in &rows {
                tx.execute(
                    "INSERT INTO keywords (cluster, keyword) VALUES (?1, ?2)",
                    params![row.cluster, row.keyword.as_str()],
                )
                .await?;
            }
            Ok::<_, libsql::Error>(())
        }
        .await;

        match written {
            Ok(()) => tx.commit().await.map_err(storage_err)?,
            Err(e) => {
                tx.rollback().await.map_err(storage_err)?;
                return Err(storage_err(e));
            }
        }

        debug!(rows = rows.len(), "keyword rows appended");
        Ok(rows.len())
    }
}

//! SQLite output
//!
//! Each run appends one row to `runs` and one row per extracted value to
//! `field_values`, so several runs can share a database file.

use crate::output::aggregator::CrawlOutput;
use crate::output::stats::CrawlStats;
use crate::output::traits::{OutputResult, OutputSink};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the output database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    stop_reason TEXT,
    pages_attempted INTEGER NOT NULL,
    pages_succeeded INTEGER NOT NULL,
    pages_failed INTEGER NOT NULL,
    retries INTEGER NOT NULL,
    fetch_attempts INTEGER NOT NULL,
    links_discovered INTEGER NOT NULL,
    links_enqueued INTEGER NOT NULL
);

-- Extracted values, in output order per key
CREATE TABLE IF NOT EXISTS field_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    field_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(run_id, field_key, position)
);

CREATE INDEX IF NOT EXISTS idx_field_values_run_key ON field_values(run_id, field_key);
"#;

/// Writes crawl results to a SQLite database
pub struct SqliteSink {
    conn: Connection,
    config_hash: String,
    last_run_id: Option<i64>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path, config_hash: impl Into<String>) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory(config_hash: impl Into<String>) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    fn with_connection(conn: Connection, config_hash: impl Into<String>) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            config_hash: config_hash.into(),
            last_run_id: None,
        })
    }

    /// ID of the run written by the last successful `write`
    pub fn last_run_id(&self) -> Option<i64> {
        self.last_run_id
    }

    /// Values stored for a run and key, in position order
    pub fn load_values(&self, run_id: i64, key: &str) -> OutputResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM field_values WHERE run_id = ?1 AND field_key = ?2 ORDER BY position",
        )?;
        let values = stmt
            .query_map(params![run_id, key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    /// Number of runs recorded in the database
    pub fn count_runs(&self) -> OutputResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl OutputSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&mut self, output: &CrawlOutput, stats: &CrawlStats) -> OutputResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (config_hash, started_at, finished_at, stop_reason,
                pages_attempted, pages_succeeded, pages_failed, retries, fetch_attempts,
                links_discovered, links_enqueued)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                self.config_hash,
                stats.started_at.to_rfc3339(),
                stats.finished_at.map(|t| t.to_rfc3339()),
                stats.stop_reason.map(|r| r.as_str()),
                stats.attempted as i64,
                stats.succeeded as i64,
                stats.failed as i64,
                stats.retried as i64,
                stats.fetch_attempts as i64,
                stats.links_discovered as i64,
                stats.links_enqueued as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO field_values (run_id, field_key, position, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (key, values) in output.iter() {
                for (position, value) in values.iter().enumerate() {
                    stmt.execute(params![run_id, key, position as i64, value])?;
                }
            }
        }

        tx.commit()?;
        self.last_run_id = Some(run_id);

        tracing::info!("Recorded run {} in SQLite output", run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::aggregator::Aggregator;
    use crate::selector::Fields;
    use crate::state::{PageResult, StopReason};
    use url::Url;

    fn finished_output() -> (CrawlOutput, CrawlStats) {
        let mut fields = Fields::with_keys(["title", "links"]);
        fields.push("title", "Home".to_string());
        fields.push("links", "/a".to_string());
        fields.push("links", "/b".to_string());

        let mut aggregator = Aggregator::new(["title", "links"]);
        aggregator.record(PageResult::success(
            Url::parse("http://a.test/").unwrap(),
            0,
            200,
            fields,
            Vec::new(),
        ));
        aggregator.finalize(StopReason::FrontierExhausted)
    }

    #[test]
    fn test_write_and_load_values() {
        let (output, stats) = finished_output();
        let mut sink = SqliteSink::new_in_memory("abc123").unwrap();

        sink.write(&output, &stats).unwrap();
        let run_id = sink.last_run_id().unwrap();

        assert_eq!(sink.load_values(run_id, "links").unwrap(), vec!["/a", "/b"]);
        assert_eq!(sink.load_values(run_id, "title").unwrap(), vec!["Home"]);
        assert!(sink.load_values(run_id, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_runs_accumulate() {
        let (output, stats) = finished_output();
        let mut sink = SqliteSink::new_in_memory("abc123").unwrap();

        sink.write(&output, &stats).unwrap();
        let first = sink.last_run_id().unwrap();
        sink.write(&output, &stats).unwrap();

        assert_eq!(sink.count_runs().unwrap(), 2);
        assert_ne!(sink.last_run_id(), Some(first));

        let stop_reason: String = sink
            .conn
            .query_row("SELECT stop_reason FROM runs WHERE id = ?1", params![first], |row| row.get(0))
            .unwrap();
        assert_eq!(stop_reason, "frontier_exhausted");
    }
}

//! SQLite call log.
//!
//! RULE: Only call_log.rs talks to the database.
//! The desk hands it finished calls; nothing else writes SQL.

use crate::{
    error::DeskResult,
    event::EventLogEntry,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Summary row for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id:               String,
    pub customer_name:         Option<String>,
    pub reason:                Option<String>,
    pub final_status:          Option<String>,
    pub confirmation_attempts: u32,
    pub started_at:            String,
    pub ended_at:              Option<String>,
}

pub struct CallLog {
    conn: Connection,
}

impl CallLog {
    /// Open (or create) the call log at `path`.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory call log (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_call_log.sql"))?;
        Ok(())
    }

    // ── Calls ──────────────────────────────────────────────────

    pub fn start_call(&self, call_id: &str, started_at: &str) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO call (call_id, started_at) VALUES (?1, ?2)",
            params![call_id, started_at],
        )?;
        Ok(())
    }

    pub fn finish_call(
        &self,
        call_id: &str,
        customer_name: Option<&str>,
        reason: &str,
        final_status: Option<&str>,
        confirmation_attempts: u32,
        ended_at: &str,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE call SET customer_name = ?1, reason = ?2, final_status = ?3,
                             confirmation_attempts = ?4, ended_at = ?5
             WHERE call_id = ?6",
            params![customer_name, reason, final_status, confirmation_attempts, ended_at, call_id],
        )?;
        Ok(())
    }

    pub fn call(&self, call_id: &str) -> DeskResult<Option<CallRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT call_id, customer_name, reason, final_status,
                        confirmation_attempts, started_at, ended_at
                 FROM call WHERE call_id = ?1",
                params![call_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Every call placed to `customer_name` (case-insensitive), oldest first.
    pub fn calls_for_customer(&self, customer_name: &str) -> DeskResult<Vec<CallRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT call_id, customer_name, reason, final_status,
                    confirmation_attempts, started_at, ended_at
             FROM call WHERE lower(customer_name) = lower(?1)
             ORDER BY started_at ASC, call_id ASC",
        )?;
        let rows = stmt.query_map(params![customer_name.trim()], row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn call_count(&self) -> DeskResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM call", [], |row| row.get(0))?;
        Ok(n)
    }

    // ── Events ─────────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO call_event (call_id, seq, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.call_id,
                entry.seq,
                entry.event_type,
                entry.payload,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_call(&self, call_id: &str) -> DeskResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, call_id, seq, event_type, payload, created_at
             FROM call_event WHERE call_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![call_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    call_id:    row.get(1)?,
                    seq:        row.get(2)?,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallRecord> {
    Ok(CallRecord {
        call_id:               row.get(0)?,
        customer_name:         row.get(1)?,
        reason:                row.get(2)?,
        final_status:          row.get(3)?,
        confirmation_attempts: row.get(4)?,
        started_at:            row.get(5)?,
        ended_at:              row.get(6)?,
    })
}

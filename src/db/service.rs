use crate::db::models::ActionRecord;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};

pub struct DbService;

impl DbService {
    fn row_to_action(row: &Row) -> DbResult<ActionRecord> {
        // DuckDB timestamps come back as raw values unless the chrono feature
        // is enabled, so every SELECT below casts created_at to VARCHAR and we
        // parse it here.
        let created_str: String = row.get(6)?;
        let created_at = created_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());

        Ok(ActionRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            instruction: row.get(2)?,
            generated_code: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            created_at,
        })
    }

    pub fn insert_action(
        conn: &Connection,
        session_id: &str,
        instruction: &str,
        generated_code: &str,
        title: &str,
        description: &str,
    ) -> DbResult<ActionRecord> {
        conn.execute(
            "INSERT INTO action_history (session_id, instruction, generated_code, title, description)
             VALUES (?, ?, ?, ?, ?)",
            params![session_id, instruction, generated_code, title, description],
        )?;

        // Fetch the record we just inserted (the ID comes from a sequence).
        let mut stmt = conn.prepare(
            "SELECT id, session_id, instruction, generated_code, title, description,
                    CAST(created_at AS VARCHAR)
             FROM action_history
             WHERE session_id = ?
             ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![session_id], Self::row_to_action)?;

        match rows.next() {
            Some(record) => record,
            None => Err(duckdb::Error::QueryReturnedNoRows),
        }
    }

    pub fn list_actions(
        conn: &Connection,
        session_id: &str,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<ActionRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, instruction, generated_code, title, description,
                    CAST(created_at AS VARCHAR)
             FROM action_history
             WHERE session_id = ?
             ORDER BY created_at ASC, id ASC
             LIMIT ? OFFSET ?",
        )?;

        let rows = stmt.query_map(
            params![session_id, limit as i64, offset as i64],
            Self::row_to_action,
        )?;

        let mut actions = Vec::new();
        for row in rows {
            actions.push(row?);
        }
        Ok(actions)
    }
}

// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only list operations.

use ghostwriter_core::GhostwriterError;
use rusqlite::params;

use crate::database::Database;

/// Append `value` to the list under `key`. Returns the new list length.
pub async fn append(db: &Database, key: &str, value: &str) -> Result<u64, GhostwriterError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO list_items (list_key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            let len: i64 = tx.query_row(
                "SELECT COUNT(*) FROM list_items WHERE list_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(len as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Read the whole list under `key` in insertion order.
pub async fn read(db: &Database, key: &str) -> Result<Vec<String>, GhostwriterError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT value FROM list_items WHERE list_key = ?1 ORDER BY id ASC")?;
            let rows = stmt.query_map(params![key], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

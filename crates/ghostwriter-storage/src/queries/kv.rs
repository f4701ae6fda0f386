// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value operations.

use ghostwriter_core::GhostwriterError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

/// Get the value stored under `key`.
pub async fn get(db: &Database, key: &str) -> Result<Option<String>, GhostwriterError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the value under `key`.
pub async fn set(db: &Database, key: &str, value: &str) -> Result<(), GhostwriterError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove `key`. Missing keys are ignored.
pub async fn delete(db: &Database, key: &str) -> Result<(), GhostwriterError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

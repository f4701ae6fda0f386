// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named FIFO queue operations.

use ghostwriter_core::GhostwriterError;
use rusqlite::params;

use crate::database::Database;

/// Push `payload` to the tail of the named queue.
pub async fn push(db: &Database, queue_name: &str, payload: &str) -> Result<(), GhostwriterError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                params![queue_name, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Push `payload` unless the same payload is already pending in the queue.
///
/// The check and insert are one statement, so concurrent callers cannot
/// both insert. Returns `true` when a row was added.
pub async fn push_unique(
    db: &Database,
    queue_name: &str,
    payload: &str,
) -> Result<bool, GhostwriterError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO queue (queue_name, payload)
                 SELECT ?1, ?2
                 WHERE NOT EXISTS (
                     SELECT 1 FROM queue WHERE queue_name = ?1 AND payload = ?2
                 )",
                params![queue_name, payload],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pop the oldest entry of the named queue. Returns `None` if the queue is empty.
pub async fn pop(db: &Database, queue_name: &str) -> Result<Option<String>, GhostwriterError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            // Select and delete in one transaction so an entry is handed out once.
            let tx = conn.transaction()?;

            let result = tx.query_row(
                "SELECT id, payload FROM queue
                 WHERE queue_name = ?1
                 ORDER BY id ASC
                 LIMIT 1",
                params![queue_name],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            );

            match result {
                Ok((id, payload)) => {
                    tx.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
                    tx.commit()?;
                    Ok(Some(payload))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of entries pending in the named queue.
pub async fn len(db: &Database, queue_name: &str) -> Result<u64, GhostwriterError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1",
                params![queue_name],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

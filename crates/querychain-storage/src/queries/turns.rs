// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn log operations.

use querychain_core::{QueryChainError, Role, Turn};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> Result<Turn, rusqlite::Error> {
    let role: String = row.get(3)?;
    let role = role.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Turn {
        seq: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        role,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a turn, assigning its sequence number and timestamp.
pub async fn insert_turn(
    db: &Database,
    session_id: &str,
    user_id: &str,
    role: Role,
    content: &str,
) -> Result<Turn, QueryChainError> {
    let mut turn = Turn {
        seq: 0,
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        role,
        content: content.to_string(),
        created_at: now_timestamp(),
    };
    let row = turn.clone();
    turn.seq = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO turns (session_id, user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.session_id,
                    row.user_id,
                    row.role.to_string(),
                    row.content,
                    row.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(turn)
}

/// The `limit` most recent turns of a session, oldest first.
pub async fn recent_turns(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<Turn>, QueryChainError> {
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, session_id, user_id, role, content, created_at
                 FROM turns WHERE session_id = ?1
                 ORDER BY seq DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![session_id, limit], row_to_turn)?;
            let mut turns = rows.collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every turn of a session, returning how many were removed.
pub async fn delete_session_turns(db: &Database, session_id: &str) -> Result<u64, QueryChainError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute("DELETE FROM turns WHERE session_id = ?1", params![session_id])?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation find-or-create, aggregates, and per-participant state.

use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Conversation, ParticipantState};

const CONVERSATION_COLUMNS: &str =
    "id, participant_low, participant_high, channel_id, last_message_id, last_message_at, created_at";

fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        participant_low: row.get(1)?,
        participant_high: row.get(2)?,
        channel_id: row.get(3)?,
        last_message_id: row.get(4)?,
        last_message_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Atomic find-or-create keyed on the sorted participant pair.
///
/// `low`/`high` must already be in canonical order. On create, both
/// participant-state rows are seeded inside the same transaction; a racing
/// create degrades to a lookup of the winner's row.
pub async fn find_or_create(
    db: &Database,
    id_hint: &str,
    low: &str,
    high: &str,
    channel_id: Option<&str>,
) -> Result<Conversation, ParleyError> {
    let id_hint = id_hint.to_string();
    let low = low.to_string();
    let high = high.to_string();
    let channel_id = channel_id.map(|s| s.to_string());
    let conflict_key = format!("conversations.pair=({low},{high})");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, participant_low, participant_high, channel_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(participant_low, participant_high) DO NOTHING",
                params![id_hint, low, high, channel_id],
            )?;
            let found = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE participant_low = ?1 AND participant_high = ?2"
                ))?;
                match stmt.query_row(params![low, high], row_to_conversation) {
                    Ok(c) => Some(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };
            if let Some(conversation) = &found {
                for person_id in [&low, &high] {
                    tx.execute(
                        "INSERT INTO conversation_participants (conversation_id, person_id)
                         VALUES (?1, ?2)
                         ON CONFLICT(conversation_id, person_id) DO NOTHING",
                        params![conversation.id, person_id],
                    )?;
                }
            }
            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ParleyError::Conflict { key: conflict_key })
}

/// Get a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_conversation) {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-participant display state for one member of a conversation.
pub async fn participant_state(
    db: &Database,
    conversation_id: &str,
    person_id: &str,
) -> Result<Option<ParticipantState>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    let person_id = person_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, person_id, unread_count, archived, pinned, muted
                 FROM conversation_participants
                 WHERE conversation_id = ?1 AND person_id = ?2",
            )?;
            let result = stmt.query_row(params![conversation_id, person_id], |row| {
                Ok(ParticipantState {
                    conversation_id: row.get(0)?,
                    person_id: row.get(1)?,
                    unread_count: row.get(2)?,
                    archived: row.get(3)?,
                    pinned: row.get(4)?,
                    muted: row.get(5)?,
                })
            });
            match result {
                Ok(state) => Ok(Some(state)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a new message to the conversation aggregates: last-message
/// pointers plus an unread increment for the recipient.
pub async fn record_message(
    db: &Database,
    conversation_id: &str,
    message_id: &str,
    at: &str,
    recipient_id: &str,
) -> Result<(), ParleyError> {
    let conversation_id = conversation_id.to_string();
    let message_id = message_id.to_string();
    let at = at.to_string();
    let recipient_id = recipient_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE conversations SET last_message_id = ?2, last_message_at = ?3 WHERE id = ?1",
                params![conversation_id, message_id, at],
            )?;
            tx.execute(
                "UPDATE conversation_participants SET unread_count = unread_count + 1
                 WHERE conversation_id = ?1 AND person_id = ?2",
                params![conversation_id, recipient_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Zero the unread counter for one participant.
pub async fn reset_unread(
    db: &Database,
    conversation_id: &str,
    person_id: &str,
) -> Result<(), ParleyError> {
    let conversation_id = conversation_id.to_string();
    let person_id = person_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation_participants SET unread_count = 0
                 WHERE conversation_id = ?1 AND person_id = ?2",
                params![conversation_id, person_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

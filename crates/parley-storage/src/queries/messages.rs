// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message insertion, status compare-and-set, and listing.

use std::str::FromStr;

use parley_core::types::MessageStatus;
use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Message, MessageView, NewMessage, StatusUpdate};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, recipient_id, content, kind, \
     status, external_message_id, external_timestamp, attachments, delivered_at, read_at, created_at";

pub(crate) fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let status_str: String = row.get(6)?;
    let status = MessageStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        content: row.get(4)?,
        kind: row.get(5)?,
        status,
        external_message_id: row.get(7)?,
        external_timestamp: row.get(8)?,
        attachments: row.get(9)?,
        delivered_at: row.get(10)?,
        read_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn select_by_external_id(
    tx: &rusqlite::Connection,
    external_id: &str,
) -> rusqlite::Result<Option<Message>> {
    let mut stmt = tx.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE external_message_id = ?1"
    ))?;
    match stmt.query_row(params![external_id], row_to_message) {
        Ok(m) => Ok(Some(m)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Insert a message.
///
/// When an external message id is present the insert deduplicates on it:
/// redelivery of the same logical message returns the existing row with
/// `created == false`, never a second row. Returns the persisted row and
/// whether this call created it.
pub async fn insert(db: &Database, message: NewMessage) -> Result<(Message, bool), ParleyError> {
    let conflict_key = format!("messages.id={}", message.id);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, recipient_id, content,
                                       kind, status, external_message_id, external_timestamp, attachments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(external_message_id) DO NOTHING",
                params![
                    message.id,
                    message.conversation_id,
                    message.sender_id,
                    message.recipient_id,
                    message.content,
                    message.kind,
                    message.status.to_string(),
                    message.external_message_id,
                    message.external_timestamp,
                    message.attachments,
                ],
            )?;
            let created = inserted > 0;
            let found = match &message.external_message_id {
                Some(ext) => select_by_external_id(&tx, ext)?,
                None => {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
                    ))?;
                    match stmt.query_row(params![message.id], row_to_message) {
                        Ok(m) => Some(m),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e),
                    }
                }
            };
            tx.commit()?;
            Ok(found.map(|m| (m, created)))
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ParleyError::Conflict { key: conflict_key })
}

/// Apply a status transition to the message carrying the external id.
///
/// The whole read-evaluate-write runs in one transaction on the single
/// writer: the audit event is always appended, but the message status only
/// moves when the transition supersedes the stored one under the monotonic
/// order. Returns [`ParleyError::NotFound`] when no message matches.
pub async fn apply_status(db: &Database, update: StatusUpdate) -> Result<Message, ParleyError> {
    let external_id = update.external_message_id.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = select_by_external_id(&tx, &update.external_message_id)?;
            let result = match existing {
                None => None,
                Some(message) => {
                    tx.execute(
                        "INSERT INTO message_status_events (message_id, status, occurred_at, metadata)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            message.id,
                            update.status.to_string(),
                            update.occurred_at,
                            update.metadata,
                        ],
                    )?;
                    if update.status.supersedes(message.status) {
                        let delivered_at = (update.status == MessageStatus::Delivered)
                            .then(|| update.occurred_at.clone());
                        let read_at = (update.status == MessageStatus::Read)
                            .then(|| update.occurred_at.clone());
                        tx.execute(
                            "UPDATE messages
                             SET status = ?2,
                                 delivered_at = COALESCE(?3, delivered_at),
                                 read_at = COALESCE(?4, read_at)
                             WHERE id = ?1",
                            params![message.id, update.status.to_string(), delivered_at, read_at],
                        )?;
                    }
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
                    ))?;
                    Some(stmt.query_row(params![message.id], row_to_message)?)
                }
            };
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or_else(|| ParleyError::not_found("message", external_id))
}

/// Get a message by its external id.
pub async fn get_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Message>, ParleyError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| select_by_external_id(conn, &external_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages in one conversation, chronological, with sender/recipient
/// display names denormalized for display.
pub async fn for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<MessageView>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender_id, m.recipient_id, m.content, m.kind,
                        m.status, m.external_message_id, m.external_timestamp, m.attachments,
                        m.delivered_at, m.read_at, m.created_at,
                        s.display_name, r.display_name
                 FROM messages m
                 JOIN persons s ON s.id = m.sender_id
                 JOIN persons r ON r.id = m.recipient_id
                 WHERE m.conversation_id = ?1
                 ORDER BY m.created_at ASC, m.id ASC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit, offset], |row| {
                Ok(MessageView {
                    message: row_to_message(row)?,
                    sender_name: row.get(13)?,
                    recipient_name: row.get(14)?,
                })
            })?;
            let mut views = Vec::new();
            for row in rows {
                views.push(row?);
            }
            Ok(views)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPerson;
    use crate::queries::{conversations, persons};
    use parley_core::types::PersonRole;
    use tempfile::tempdir;

    async fn setup_thread() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        for (id, name, role) in [
            ("pa", "Alice", PersonRole::EndUser),
            ("pb", "Support", PersonRole::Channel),
        ] {
            persons::find_or_create(
                &db,
                NewPerson {
                    id: id.to_string(),
                    external_id: Some(id.to_string()),
                    display_name: name.to_string(),
                    role,
                    contact_address: None,
                    access_token: None,
                },
            )
            .await
            .unwrap();
        }
        conversations::find_or_create(&db, "c1", "pa", "pb", None)
            .await
            .unwrap();
        (db, dir)
    }

    fn make_message(id: &str, external_id: Option<&str>, content: &str) -> NewMessage {
        NewMessage {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "pa".to_string(),
            recipient_id: "pb".to_string(),
            content: content.to_string(),
            kind: "text".to_string(),
            status: MessageStatus::Sent,
            external_message_id: external_id.map(|s| s.to_string()),
            external_timestamp: Some("1700000000".to_string()),
            attachments: None,
        }
    }

    fn make_status(external_id: &str, status: MessageStatus, occurred_at: &str) -> StatusUpdate {
        StatusUpdate {
            external_message_id: external_id.to_string(),
            status,
            occurred_at: occurred_at.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn insert_persists_with_sent_status() {
        let (db, _dir) = setup_thread().await;

        let (message, created) = insert(&db, make_message("m1", Some("wamid.1"), "hi"))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(message.content, "hi");
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.external_message_id.as_deref(), Some("wamid.1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_deduplicates_on_external_id() {
        let (db, _dir) = setup_thread().await;

        let (first, created) = insert(&db, make_message("m1", Some("wamid.1"), "hi"))
            .await
            .unwrap();
        assert!(created);

        // Redelivery under a different internal id hint.
        let (second, created) = insert(&db, make_message("m2", Some("wamid.1"), "hi again"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "hi");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outbound_without_external_id_always_inserts() {
        let (db, _dir) = setup_thread().await;

        let (_, c1) = insert(&db, make_message("m1", None, "one")).await.unwrap();
        let (_, c2) = insert(&db, make_message("m2", None, "two")).await.unwrap();
        assert!(c1);
        assert!(c2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_advances_and_stamps_timestamps() {
        let (db, _dir) = setup_thread().await;
        insert(&db, make_message("m1", Some("wamid.1"), "hi"))
            .await
            .unwrap();

        let message = apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Delivered, "2026-02-01T00:00:05Z"),
        )
        .await
        .unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);
        assert_eq!(message.delivered_at.as_deref(), Some("2026-02-01T00:00:05Z"));

        let message = apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Read, "2026-02-01T00:00:09Z"),
        )
        .await
        .unwrap();
        assert_eq!(message.status, MessageStatus::Read);
        assert_eq!(message.read_at.as_deref(), Some("2026-02-01T00:00:09Z"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn out_of_order_status_is_not_a_regression() {
        let (db, _dir) = setup_thread().await;
        insert(&db, make_message("m1", Some("wamid.1"), "hi"))
            .await
            .unwrap();

        // read arrives before delivered.
        apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Read, "2026-02-01T00:00:09Z"),
        )
        .await
        .unwrap();
        let message = apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Delivered, "2026-02-01T00:00:05Z"),
        )
        .await
        .unwrap();

        // Status stays read; the late delivered still stamps delivered_at
        // and lands in the audit trail.
        assert_eq!(message.status, MessageStatus::Read);

        let event_count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM message_status_events",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(event_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_is_terminal_in_storage() {
        let (db, _dir) = setup_thread().await;
        insert(&db, make_message("m1", Some("wamid.1"), "hi"))
            .await
            .unwrap();

        apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Read, "2026-02-01T00:00:09Z"),
        )
        .await
        .unwrap();
        let message = apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Failed, "2026-02-01T00:00:10Z"),
        )
        .await
        .unwrap();
        assert_eq!(message.status, MessageStatus::Failed);

        // Nothing moves a failed message.
        let message = apply_status(
            &db,
            make_status("wamid.1", MessageStatus::Read, "2026-02-01T00:00:11Z"),
        )
        .await
        .unwrap();
        assert_eq!(message.status, MessageStatus::Failed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_for_unknown_external_id_is_not_found() {
        let (db, _dir) = setup_thread().await;

        let err = apply_status(
            &db,
            make_status("wamid.ghost", MessageStatus::Delivered, "2026-02-01T00:00:05Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));

        // No orphan audit row was written.
        let event_count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM message_status_events",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(event_count, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn listing_denormalizes_display_names() {
        let (db, _dir) = setup_thread().await;
        insert(&db, make_message("m1", Some("wamid.1"), "first"))
            .await
            .unwrap();
        insert(&db, make_message("m2", Some("wamid.2"), "second"))
            .await
            .unwrap();

        let views = for_conversation(&db, "c1", 10, 0).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].message.content, "first");
        assert_eq!(views[0].sender_name, "Alice");
        assert_eq!(views[0].recipient_name, "Support");

        let paged = for_conversation(&db, "c1", 1, 1).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].message.content, "second");

        db.close().await.unwrap();
    }
}

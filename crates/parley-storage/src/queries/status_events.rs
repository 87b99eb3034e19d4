// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status-event audit queries.
//!
//! Events are appended by [`crate::queries::messages::apply_status`] inside
//! the same transaction as the status compare-and-set; this module only
//! reads them back.

use std::str::FromStr;

use parley_core::types::MessageStatus;
use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::MessageStatusEvent;

/// Every status event recorded for the message carrying the external id,
/// ordered by occurrence time. Answers status-history queries independent
/// of the message's current status.
pub async fn history(
    db: &Database,
    external_message_id: &str,
) -> Result<Vec<MessageStatusEvent>, ParleyError> {
    let external_message_id = external_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.message_id, e.status, e.occurred_at, e.metadata, e.recorded_at
                 FROM message_status_events e
                 JOIN messages m ON m.id = e.message_id
                 WHERE m.external_message_id = ?1
                 ORDER BY e.occurred_at ASC, e.id ASC",
            )?;
            let rows = stmt.query_map(params![external_message_id], |row| {
                let status_str: String = row.get(2)?;
                let status = MessageStatus::from_str(&status_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(MessageStatusEvent {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    status,
                    occurred_at: row.get(3)?,
                    metadata: row.get(4)?,
                    recorded_at: row.get(5)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound delivery records: idempotent persistence and processing outcome.

use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::DeliveryRecord;

const DELIVERY_COLUMNS: &str = "id, payload, processed, error, received_at, processed_at";

fn row_to_delivery(row: &rusqlite::Row) -> rusqlite::Result<DeliveryRecord> {
    Ok(DeliveryRecord {
        id: row.get(0)?,
        payload: row.get(1)?,
        processed: row.get(2)?,
        error: row.get(3)?,
        received_at: row.get(4)?,
        processed_at: row.get(5)?,
    })
}

fn select_by_id(
    conn: &rusqlite::Connection,
    id: &str,
) -> rusqlite::Result<Option<DeliveryRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?1"
    ))?;
    match stmt.query_row(params![id], row_to_delivery) {
        Ok(d) => Ok(Some(d)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Record an inbound delivery. Idempotent on the delivery id: a redelivered
/// id keeps its original payload and processing state, and the stored row
/// is returned either way.
pub async fn record(db: &Database, id: &str, payload: &str) -> Result<DeliveryRecord, ParleyError> {
    let id = id.to_string();
    let payload = payload.to_string();
    let conflict_key = format!("deliveries.id={id}");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO deliveries (id, payload) VALUES (?1, ?2)
                 ON CONFLICT(id) DO NOTHING",
                params![id, payload],
            )?;
            let found = select_by_id(&tx, &id)?;
            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ParleyError::Conflict { key: conflict_key })
}

/// Get a delivery by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<DeliveryRecord>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_by_id(conn, &id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a delivery processed, with an optional itemized-error summary.
pub async fn mark_processed(
    db: &Database,
    id: &str,
    error: Option<&str>,
) -> Result<(), ParleyError> {
    let id = id.to_string();
    let error = error.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE deliveries SET processed = 1, error = ?2,
                 processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reset a delivery to unprocessed for reprocessing. Returns the stored
/// record, or `None` when the id was never recorded.
pub async fn reset(db: &Database, id: &str) -> Result<Option<DeliveryRecord>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE deliveries SET processed = 0, error = NULL, processed_at = NULL
                 WHERE id = ?1",
                params![id],
            )?;
            let found = select_by_id(&tx, &id)?;
            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn record_is_idempotent_on_delivery_id() {
        let (db, _dir) = setup_db().await;

        let first = record(&db, "d1", r#"{"entry":[]}"#).await.unwrap();
        assert!(!first.processed);
        assert_eq!(first.payload, r#"{"entry":[]}"#);

        mark_processed(&db, "d1", None).await.unwrap();

        // Redelivery of the same id keeps the original payload and the
        // processed flag.
        let second = record(&db, "d1", r#"{"entry":["other"]}"#).await.unwrap();
        assert!(second.processed);
        assert_eq!(second.payload, r#"{"entry":[]}"#);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_processed_stores_error_summary() {
        let (db, _dir) = setup_db().await;
        record(&db, "d1", "{}").await.unwrap();

        mark_processed(&db, "d1", Some("1 of 4 items failed"))
            .await
            .unwrap();

        let delivery = get(&db, "d1").await.unwrap().unwrap();
        assert!(delivery.processed);
        assert_eq!(delivery.error.as_deref(), Some("1 of 4 items failed"));
        assert!(delivery.processed_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_clears_processing_outcome() {
        let (db, _dir) = setup_db().await;
        record(&db, "d1", "{}").await.unwrap();
        mark_processed(&db, "d1", Some("boom")).await.unwrap();

        let delivery = reset(&db, "d1").await.unwrap().unwrap();
        assert!(!delivery.processed);
        assert!(delivery.error.is_none());
        assert!(delivery.processed_at.is_none());
        // Raw payload is retained for lossless reprocessing.
        assert_eq!(delivery.payload, "{}");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_unknown_delivery_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(reset(&db, "ghost").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}

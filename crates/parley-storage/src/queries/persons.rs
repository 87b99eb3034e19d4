// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Person find-or-create and lookup operations.
//!
//! Find-or-create is a conflict-tolerant insert followed by a re-select in
//! one transaction, so concurrent resolution of the same external id always
//! converges on a single row.

use std::str::FromStr;

use parley_core::types::PersonRole;
use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{NewPerson, Person};

const PERSON_COLUMNS: &str = "id, external_id, display_name, role, contact_address, created_at";

pub(crate) fn row_to_person(row: &rusqlite::Row) -> rusqlite::Result<Person> {
    let role_str: String = row.get(3)?;
    let role = PersonRole::from_str(&role_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Person {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        role,
        contact_address: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Atomic find-or-create keyed on `external_id`.
///
/// When the external id is already taken the insert is a no-op and the
/// existing row is returned, so N racing calls for one id all see the same
/// person.
pub async fn find_or_create(db: &Database, person: NewPerson) -> Result<Person, ParleyError> {
    let conflict_key = match &person.external_id {
        Some(ext) => format!("persons.external_id={ext}"),
        None => format!("persons.id={}", person.id),
    };
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO persons (id, external_id, display_name, role, contact_address, access_token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(external_id) DO NOTHING",
                params![
                    person.id,
                    person.external_id,
                    person.display_name,
                    person.role.to_string(),
                    person.contact_address,
                    person.access_token,
                ],
            )?;
            let found = match &person.external_id {
                Some(ext) => {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {PERSON_COLUMNS} FROM persons WHERE external_id = ?1"
                    ))?;
                    match stmt.query_row(params![ext], row_to_person) {
                        Ok(p) => Some(p),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e),
                    }
                }
                None => {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"
                    ))?;
                    match stmt.query_row(params![person.id], row_to_person) {
                        Ok(p) => Some(p),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e),
                    }
                }
            };
            tx.commit()?;
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ParleyError::Conflict { key: conflict_key })
}

/// Look up the channel-side person matched on (channel id, display address).
pub async fn find_channel(
    db: &Database,
    channel_id: &str,
    display_address: &str,
) -> Result<Option<Person>, ParleyError> {
    let channel_id = channel_id.to_string();
    let display_address = display_address.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PERSON_COLUMNS} FROM persons
                 WHERE role = 'channel' AND external_id = ?1 AND contact_address = ?2"
            ))?;
            match stmt.query_row(params![channel_id, display_address], row_to_person) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a person by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Person>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_person) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_contact(id: &str, external_id: &str, name: &str) -> NewPerson {
        NewPerson {
            id: id.to_string(),
            external_id: Some(external_id.to_string()),
            display_name: name.to_string(),
            role: PersonRole::EndUser,
            contact_address: Some(external_id.to_string()),
            access_token: Some("tok-placeholder".to_string()),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_then_find_returns_same_person() {
        let (db, _dir) = setup_db().await;

        let first = find_or_create(&db, make_contact("p1", "1555", "Alice"))
            .await
            .unwrap();
        assert_eq!(first.id, "p1");
        assert_eq!(first.external_id.as_deref(), Some("1555"));

        // Second resolution with a different id hint finds the winner.
        let second = find_or_create(&db, make_contact("p2", "1555", "Alice B."))
            .await
            .unwrap();
        assert_eq!(second.id, "p1");
        assert_eq!(second.display_name, "Alice");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_resolution_yields_one_row() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = Arc::clone(&db);
            handles.push(tokio::spawn(async move {
                find_or_create(&db, make_contact(&format!("cand-{i}"), "1555", "Alice")).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all racers must converge on one person");

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM persons WHERE external_id = '1555'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn channel_person_matched_on_address_and_channel_id() {
        let (db, _dir) = setup_db().await;

        assert!(find_channel(&db, "PNI1", "1999").await.unwrap().is_none());

        let channel = NewPerson {
            id: "ch1".to_string(),
            external_id: Some("PNI1".to_string()),
            display_name: "1999".to_string(),
            role: PersonRole::Channel,
            contact_address: Some("1999".to_string()),
            access_token: Some("tok-channel".to_string()),
        };
        find_or_create(&db, channel).await.unwrap();

        let found = find_channel(&db, "PNI1", "1999").await.unwrap().unwrap();
        assert_eq!(found.id, "ch1");
        assert_eq!(found.role, PersonRole::Channel);

        // A different display address does not match.
        assert!(find_channel(&db, "PNI1", "1888").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_unknown_person_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SyncStore trait.

use async_trait::async_trait;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::types::{
    Conversation, DeliveryRecord, Message, MessageStatusEvent, MessageView, NewMessage,
    NewPerson, ParticipantState, Person, StatusUpdate,
};
use parley_core::{ParleyError, SyncStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed sync store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules, which serialize every write through the single background
/// writer thread.
pub struct SqliteSyncStore {
    db: Database,
}

impl SqliteSyncStore {
    /// Open the database at the configured path, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, ParleyError> {
        let db = Database::open(&config.database_path).await?;
        debug!(path = %config.database_path, "SQLite sync store opened");
        Ok(Self { db })
    }

    /// Wrap an already-open database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), ParleyError> {
        self.db.close().await
    }
}

#[async_trait]
impl SyncStore for SqliteSyncStore {
    async fn health_check(&self) -> Result<(), ParleyError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }

    // --- Delivery operations ---

    async fn record_delivery(
        &self,
        id: &str,
        payload: &str,
    ) -> Result<DeliveryRecord, ParleyError> {
        queries::deliveries::record(&self.db, id, payload).await
    }

    async fn get_delivery(&self, id: &str) -> Result<Option<DeliveryRecord>, ParleyError> {
        queries::deliveries::get(&self.db, id).await
    }

    async fn mark_delivery_processed(
        &self,
        id: &str,
        error: Option<&str>,
    ) -> Result<(), ParleyError> {
        queries::deliveries::mark_processed(&self.db, id, error).await
    }

    async fn reset_delivery(&self, id: &str) -> Result<Option<DeliveryRecord>, ParleyError> {
        queries::deliveries::reset(&self.db, id).await
    }

    // --- Person operations ---

    async fn find_or_create_person(&self, person: NewPerson) -> Result<Person, ParleyError> {
        queries::persons::find_or_create(&self.db, person).await
    }

    async fn find_channel_person(
        &self,
        channel_id: &str,
        display_address: &str,
    ) -> Result<Option<Person>, ParleyError> {
        queries::persons::find_channel(&self.db, channel_id, display_address).await
    }

    async fn get_person(&self, id: &str) -> Result<Option<Person>, ParleyError> {
        queries::persons::get(&self.db, id).await
    }

    // --- Conversation operations ---

    async fn find_or_create_conversation(
        &self,
        id_hint: &str,
        low: &str,
        high: &str,
        channel_id: Option<&str>,
    ) -> Result<Conversation, ParleyError> {
        queries::conversations::find_or_create(&self.db, id_hint, low, high, channel_id).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParleyError> {
        queries::conversations::get(&self.db, id).await
    }

    async fn participant_state(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<Option<ParticipantState>, ParleyError> {
        queries::conversations::participant_state(&self.db, conversation_id, person_id).await
    }

    async fn record_conversation_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        at: &str,
        recipient_id: &str,
    ) -> Result<(), ParleyError> {
        queries::conversations::record_message(&self.db, conversation_id, message_id, at, recipient_id)
            .await
    }

    async fn reset_unread(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<(), ParleyError> {
        queries::conversations::reset_unread(&self.db, conversation_id, person_id).await
    }

    // --- Message operations ---

    async fn insert_message(&self, message: NewMessage) -> Result<(Message, bool), ParleyError> {
        queries::messages::insert(&self.db, message).await
    }

    async fn apply_status(&self, update: StatusUpdate) -> Result<Message, ParleyError> {
        queries::messages::apply_status(&self.db, update).await
    }

    async fn get_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Message>, ParleyError> {
        queries::messages::get_by_external_id(&self.db, external_id).await
    }

    async fn conversation_messages(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, ParleyError> {
        queries::messages::for_conversation(&self.db, conversation_id, limit, offset).await
    }

    async fn status_history(
        &self,
        external_message_id: &str,
    ) -> Result<Vec<MessageStatusEvent>, ParleyError> {
        queries::status_events::history(&self.db, external_message_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::{MessageStatus, PersonRole};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn open_runs_migrations_and_health_check_passes() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adapter.db");
        let store = SqliteSyncStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        store.health_check().await.unwrap();
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn full_inbound_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteSyncStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        let sender = store
            .find_or_create_person(NewPerson {
                id: "p-sender".to_string(),
                external_id: Some("1555".to_string()),
                display_name: "Alice".to_string(),
                role: PersonRole::EndUser,
                contact_address: Some("1555".to_string()),
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap();
        let channel = store
            .find_or_create_person(NewPerson {
                id: "p-channel".to_string(),
                external_id: Some("PNI1".to_string()),
                display_name: "1999".to_string(),
                role: PersonRole::Channel,
                contact_address: Some("1999".to_string()),
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap();

        let (low, high) = if sender.id <= channel.id {
            (sender.id.clone(), channel.id.clone())
        } else {
            (channel.id.clone(), sender.id.clone())
        };
        let conversation = store
            .find_or_create_conversation("c-1", &low, &high, Some("PNI1"))
            .await
            .unwrap();

        let (message, created) = store
            .insert_message(NewMessage {
                id: "m-1".to_string(),
                conversation_id: conversation.id.clone(),
                sender_id: sender.id.clone(),
                recipient_id: channel.id.clone(),
                content: "hi".to_string(),
                kind: "text".to_string(),
                status: MessageStatus::Sent,
                external_message_id: Some("wamid.1".to_string()),
                external_timestamp: Some("1700000000".to_string()),
                attachments: None,
            })
            .await
            .unwrap();
        assert!(created);

        store
            .record_conversation_message(
                &conversation.id,
                &message.id,
                &message.created_at,
                &channel.id,
            )
            .await
            .unwrap();

        let state = store
            .participant_state(&conversation.id, &channel.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.unread_count, 1);

        let updated = store
            .apply_status(StatusUpdate {
                external_message_id: "wamid.1".to_string(),
                status: MessageStatus::Delivered,
                occurred_at: "2026-02-01T00:00:05Z".to_string(),
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.status, MessageStatus::Delivered);

        let history = store.status_history("wamid.1").await.unwrap();
        assert_eq!(history.len(), 1);

        let views = store
            .conversation_messages(&conversation.id, 10, 0)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].sender_name, "Alice");

        store.close().await.unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait for the five durable collections behind the sync pipeline.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{
    Conversation, DeliveryRecord, Message, MessageStatusEvent, MessageView, NewMessage,
    NewPerson, ParticipantState, Person, StatusUpdate,
};

/// Persistence boundary for the sync pipeline.
///
/// Every find-or-create keyed on an external identifier must be atomic:
/// a racing create degrades to a lookup of the winner's row, never a
/// duplicate or an error surfaced to the caller. `apply_status` must be a
/// compare-and-set under [`crate::types::MessageStatus::supersedes`], not a
/// blind overwrite.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Cheap liveness probe against the backing store.
    async fn health_check(&self) -> Result<(), ParleyError>;

    // --- Delivery operations ---

    /// Record an inbound delivery. Idempotent on the delivery id: if the id
    /// is already recorded the existing row is returned unchanged, raw
    /// payload included.
    async fn record_delivery(&self, id: &str, payload: &str)
        -> Result<DeliveryRecord, ParleyError>;

    async fn get_delivery(&self, id: &str) -> Result<Option<DeliveryRecord>, ParleyError>;

    /// Mark a delivery processed, with an optional itemized-error summary.
    async fn mark_delivery_processed(
        &self,
        id: &str,
        error: Option<&str>,
    ) -> Result<(), ParleyError>;

    /// Reset a delivery to unprocessed for reprocessing. Returns the stored
    /// record, or `None` when the id was never recorded.
    async fn reset_delivery(&self, id: &str) -> Result<Option<DeliveryRecord>, ParleyError>;

    // --- Person operations ---

    /// Atomic find-or-create keyed on `external_id`. Returns the existing
    /// person when one already carries the external id.
    async fn find_or_create_person(&self, person: NewPerson) -> Result<Person, ParleyError>;

    /// Look up the channel-side person matched on (channel id, display address).
    async fn find_channel_person(
        &self,
        channel_id: &str,
        display_address: &str,
    ) -> Result<Option<Person>, ParleyError>;

    async fn get_person(&self, id: &str) -> Result<Option<Person>, ParleyError>;

    // --- Conversation operations ---

    /// Atomic find-or-create keyed on the sorted participant pair.
    /// `low`/`high` must already be in canonical order. On create, seeds
    /// participant-state rows for both members and stamps the channel id.
    async fn find_or_create_conversation(
        &self,
        id_hint: &str,
        low: &str,
        high: &str,
        channel_id: Option<&str>,
    ) -> Result<Conversation, ParleyError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParleyError>;

    async fn participant_state(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<Option<ParticipantState>, ParleyError>;

    /// Apply a new message to the conversation aggregates: last-message
    /// pointers plus an unread increment for the recipient.
    async fn record_conversation_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        at: &str,
        recipient_id: &str,
    ) -> Result<(), ParleyError>;

    /// Zero the unread counter for one participant.
    async fn reset_unread(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<(), ParleyError>;

    // --- Message operations ---

    /// Insert a message. Deduplicates on `external_message_id` when present:
    /// returns the existing row with `false` instead of inserting twice.
    async fn insert_message(&self, message: NewMessage) -> Result<(Message, bool), ParleyError>;

    /// Apply a status transition to the message carrying the external id.
    ///
    /// Always appends a [`MessageStatusEvent`]; updates the message status
    /// only when the transition supersedes the stored one. Fails with
    /// [`ParleyError::NotFound`] when no message carries the external id.
    async fn apply_status(&self, update: StatusUpdate) -> Result<Message, ParleyError>;

    async fn get_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Message>, ParleyError>;

    /// Messages in one conversation, chronological, with sender/recipient
    /// display names denormalized.
    async fn conversation_messages(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, ParleyError>;

    /// Every status event recorded for the message carrying the external id,
    /// ordered by occurrence time.
    async fn status_history(
        &self,
        external_message_id: &str,
    ) -> Result<Vec<MessageStatusEvent>, ParleyError>;
}

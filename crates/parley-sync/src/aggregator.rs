// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation aggregates: last-message pointers and unread counters.

use std::sync::Arc;

use parley_core::types::{Conversation, Message, Person};
use parley_core::{ParleyError, SyncStore};

/// Maintains derived conversation state on new messages.
///
/// Status transitions never touch conversation aggregates: there is no
/// status hook here on purpose.
#[derive(Clone)]
pub struct ConversationAggregator {
    store: Arc<dyn SyncStore>,
}

impl ConversationAggregator {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Stamp the conversation's last-message pointers and bump the
    /// recipient's unread counter by one.
    pub async fn on_new_message(
        &self,
        conversation: &Conversation,
        message: &Message,
        recipient: &Person,
    ) -> Result<(), ParleyError> {
        self.store
            .record_conversation_message(
                &conversation.id,
                &message.id,
                &message.created_at,
                &recipient.id,
            )
            .await
    }

    /// Zero the unread counter for one participant. Invoked by an external
    /// mark-read collaborator, not by the ingestion pipeline.
    pub async fn reset_unread(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<(), ParleyError> {
        self.store.reset_unread(conversation_id, person_id).await
    }
}

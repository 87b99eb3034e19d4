// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ledger: canonical message creation and status application.

use std::sync::Arc;

use parley_core::types::{
    Conversation, Message, MessageStatus, NewMessage, Person, StatusUpdate,
};
use parley_core::{ParleyError, SyncStore};

use crate::ids;
use crate::normalize::NormalizedContent;

/// Provider identity carried on an inbound message.
#[derive(Debug, Clone)]
pub struct InboundMeta {
    pub external_message_id: String,
    pub external_timestamp: Option<String>,
}

/// Durable store facade for canonical message records.
#[derive(Clone)]
pub struct MessageLedger {
    store: Arc<dyn SyncStore>,
}

impl MessageLedger {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Insert an inbound message with status `sent`, keyed on the external
    /// message id for later status matching and duplicate detection.
    /// Returns the persisted row and whether this call created it.
    pub async fn create_inbound(
        &self,
        sender: &Person,
        recipient: &Person,
        conversation: &Conversation,
        normalized: NormalizedContent,
        meta: InboundMeta,
    ) -> Result<(Message, bool), ParleyError> {
        self.store
            .insert_message(NewMessage {
                id: ids::new_id(),
                conversation_id: conversation.id.clone(),
                sender_id: sender.id.clone(),
                recipient_id: recipient.id.clone(),
                content: normalized.content,
                kind: normalized.kind,
                status: MessageStatus::Sent,
                external_message_id: Some(meta.external_message_id),
                external_timestamp: meta.external_timestamp,
                attachments: normalized.attachments.map(|v| v.to_string()),
            })
            .await
    }

    /// Insert an application-originated message. No external message id:
    /// the provider has not assigned one yet.
    pub async fn create_outbound(
        &self,
        sender: &Person,
        recipient: &Person,
        conversation: &Conversation,
        content: &str,
        kind: &str,
    ) -> Result<Message, ParleyError> {
        let (message, _created) = self
            .store
            .insert_message(NewMessage {
                id: ids::new_id(),
                conversation_id: conversation.id.clone(),
                sender_id: sender.id.clone(),
                recipient_id: recipient.id.clone(),
                content: content.to_string(),
                kind: kind.to_string(),
                status: MessageStatus::Sent,
                external_message_id: None,
                external_timestamp: None,
                attachments: None,
            })
            .await?;
        Ok(message)
    }

    /// Apply a status transition by external message id. Not-found is
    /// reported to the caller, never swallowed.
    pub async fn apply_status(&self, update: StatusUpdate) -> Result<Message, ParleyError> {
        self.store.apply_status(update).await
    }
}

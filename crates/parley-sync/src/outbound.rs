// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message factory for application-originated messages.

use std::sync::Arc;

use parley_core::types::{Message, Person};
use parley_core::{ParleyError, SyncStore};

use crate::aggregator::ConversationAggregator;
use crate::ledger::MessageLedger;
use crate::resolver::{ContactHints, EntityResolver};

/// Creates application-originated messages, reusing the resolver and the
/// aggregator so outbound traffic shapes conversation state exactly like
/// inbound traffic does.
#[derive(Clone)]
pub struct OutboundFactory {
    store: Arc<dyn SyncStore>,
    resolver: EntityResolver,
    ledger: MessageLedger,
    aggregator: ConversationAggregator,
}

impl OutboundFactory {
    pub fn new(
        store: Arc<dyn SyncStore>,
        resolver: EntityResolver,
        ledger: MessageLedger,
        aggregator: ConversationAggregator,
    ) -> Self {
        Self {
            store,
            resolver,
            ledger,
            aggregator,
        }
    }

    /// Create an outbound message from a known person to a contact address,
    /// synthesizing the recipient when the address was never seen before.
    pub async fn create(
        &self,
        from_person_id: &str,
        to_address: &str,
        content: &str,
        kind: &str,
    ) -> Result<Message, ParleyError> {
        let sender = self.sender(from_person_id).await?;
        let recipient = self
            .resolver
            .resolve_contact(to_address, &ContactHints::default())
            .await?;
        let conversation = self
            .resolver
            .find_or_create_conversation(&sender.id, &recipient.id, None)
            .await?;
        let message = self
            .ledger
            .create_outbound(&sender, &recipient, &conversation, content, kind)
            .await?;
        self.aggregator
            .on_new_message(&conversation, &message, &recipient)
            .await?;
        Ok(message)
    }

    async fn sender(&self, person_id: &str) -> Result<Person, ParleyError> {
        self.store
            .get_person(person_id)
            .await?
            .ok_or_else(|| ParleyError::not_found("person", person_id))
    }
}

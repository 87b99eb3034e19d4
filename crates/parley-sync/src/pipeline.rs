// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline orchestrator: the top-level entry point per delivery.
//!
//! Per-delivery states: RECEIVED -> PERSISTED -> PROCESSING ->
//! {PROCESSED | PROCESSED_WITH_ERRORS}. The raw payload is persisted first,
//! then every nested sub-event is processed strictly in array order.
//! Per-item failures accumulate into the report without aborting siblings;
//! storage failures abort the whole call and leave the delivery
//! unprocessed for retry.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use parley_core::types::{Message, MessageStatusEvent, MessageView};
use parley_core::{ParleyError, SyncStore};

use crate::aggregator::ConversationAggregator;
use crate::ledger::{InboundMeta, MessageLedger};
use crate::normalize::normalize;
use crate::outbound::OutboundFactory;
use crate::payload::{self, ChangeValue, WebhookPayload};
use crate::reducer::StatusReducer;
use crate::report::{DeliveryState, IngestReport, ItemError, ProcessedItem};
use crate::resolver::{ContactHints, EntityResolver};

/// Top-level ingestion pipeline over a [`SyncStore`].
#[derive(Clone)]
pub struct SyncPipeline {
    store: Arc<dyn SyncStore>,
    resolver: EntityResolver,
    ledger: MessageLedger,
    reducer: StatusReducer,
    aggregator: ConversationAggregator,
    outbound: OutboundFactory,
}

impl SyncPipeline {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        let resolver = EntityResolver::new(Arc::clone(&store));
        let ledger = MessageLedger::new(Arc::clone(&store));
        let reducer = StatusReducer::new(ledger.clone());
        let aggregator = ConversationAggregator::new(Arc::clone(&store));
        let outbound = OutboundFactory::new(
            Arc::clone(&store),
            resolver.clone(),
            ledger.clone(),
            aggregator.clone(),
        );
        Self {
            store,
            resolver,
            ledger,
            reducer,
            aggregator,
            outbound,
        }
    }

    /// Ingest one webhook delivery.
    ///
    /// Persists the raw payload keyed by delivery id (a no-op returning an
    /// empty report when the id was already processed), then walks the
    /// nested message and status events.
    pub async fn ingest(
        &self,
        delivery_id: &str,
        raw_payload: &str,
    ) -> Result<IngestReport, ParleyError> {
        let record = self.store.record_delivery(delivery_id, raw_payload).await?;
        if record.processed {
            debug!(delivery_id, "delivery already processed, skipping");
            let mut report = IngestReport::new(delivery_id);
            report.state = DeliveryState::Processed;
            report.already_processed = true;
            return Ok(report);
        }
        // Process against the stored payload so ingest and reprocess see
        // the identical bytes.
        self.run(delivery_id, &record.payload).await
    }

    /// Re-run a previously stored delivery against its retained raw payload.
    pub async fn reprocess(&self, delivery_id: &str) -> Result<IngestReport, ParleyError> {
        let record = self
            .store
            .reset_delivery(delivery_id)
            .await?
            .ok_or_else(|| ParleyError::not_found("delivery", delivery_id))?;
        info!(delivery_id, "reprocessing stored delivery");
        self.run(delivery_id, &record.payload).await
    }

    async fn run(&self, delivery_id: &str, raw: &str) -> Result<IngestReport, ParleyError> {
        let mut report = IngestReport::new(delivery_id);
        report.state = DeliveryState::Persisted;

        let payload: WebhookPayload = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                let error = format!("undecodable webhook payload: {e}");
                warn!(delivery_id, %error, "delivery body failed to parse");
                report.errors.push(ItemError {
                    index: 0,
                    context: "payload".to_string(),
                    error: error.clone(),
                });
                self.store
                    .mark_delivery_processed(delivery_id, Some(&error))
                    .await?;
                report.state = DeliveryState::ProcessedWithErrors;
                return Ok(report);
            }
        };

        report.state = DeliveryState::Processing;
        let mut index = 0usize;
        for entry in &payload.entry {
            for change in &entry.changes {
                let value = &change.value;
                for raw_message in &value.messages {
                    match self.process_message(value, raw_message).await {
                        Ok(item) => report.processed.push(item),
                        Err(e) if e.is_delivery_fatal() => return Err(e),
                        Err(e) => {
                            warn!(delivery_id, index, error = %e, "message event failed");
                            report.errors.push(ItemError {
                                index,
                                context: "message".to_string(),
                                error: e.to_string(),
                            });
                        }
                    }
                    index += 1;
                }
                for raw_status in &value.statuses {
                    match self.process_status(raw_status).await {
                        Ok(item) => report.processed.push(item),
                        Err(e) if e.is_delivery_fatal() => return Err(e),
                        Err(e) => {
                            warn!(delivery_id, index, error = %e, "status event failed");
                            report.errors.push(ItemError {
                                index,
                                context: "status".to_string(),
                                error: e.to_string(),
                            });
                        }
                    }
                    index += 1;
                }
            }
        }

        let summary = report.error_summary();
        self.store
            .mark_delivery_processed(delivery_id, summary.as_deref())
            .await?;
        report.state = if report.errors.is_empty() {
            DeliveryState::Processed
        } else {
            DeliveryState::ProcessedWithErrors
        };
        info!(
            delivery_id,
            processed = report.processed.len(),
            errors = report.errors.len(),
            "delivery processed"
        );
        Ok(report)
    }

    /// Resolver -> normalizer -> ledger -> aggregator for one message event.
    async fn process_message(
        &self,
        value: &ChangeValue,
        raw: &Value,
    ) -> Result<ProcessedItem, ParleyError> {
        let event = payload::parse_message_event(raw)?;
        let metadata = value.metadata.as_ref().ok_or_else(|| {
            ParleyError::Payload(format!(
                "message {} arrived without channel metadata",
                event.external_id
            ))
        })?;
        let channel_id = metadata.phone_number_id.as_deref().ok_or_else(|| {
            ParleyError::Payload(format!(
                "message {} arrived without a channel id",
                event.external_id
            ))
        })?;
        let display_address = metadata.display_phone_number.as_deref().unwrap_or(channel_id);

        let hints = ContactHints::for_sender(value, &event.from);
        let sender = self.resolver.resolve_contact(&event.from, &hints).await?;
        let channel = self.resolver.resolve_channel(channel_id, display_address).await?;
        let conversation = self
            .resolver
            .find_or_create_conversation(&sender.id, &channel.id, Some(channel_id))
            .await?;

        let normalized = normalize(&event.variant);
        let external_timestamp = event.timestamp.clone();
        let (message, created) = self
            .ledger
            .create_inbound(
                &sender,
                &channel,
                &conversation,
                normalized,
                InboundMeta {
                    external_message_id: event.external_id.clone(),
                    external_timestamp,
                },
            )
            .await?;

        if created {
            self.aggregator
                .on_new_message(&conversation, &message, &channel)
                .await?;
        } else {
            debug!(external_id = %event.external_id, "duplicate message delivery collapsed");
        }

        Ok(ProcessedItem::Message {
            message_id: message.id,
            external_message_id: event.external_id,
            conversation_id: conversation.id,
            deduplicated: !created,
        })
    }

    async fn process_status(&self, raw: &Value) -> Result<ProcessedItem, ParleyError> {
        let event = payload::parse_status_event(raw)?;
        let external_message_id = event.external_message_id.clone();
        let status = event.status;
        self.reducer.apply(event).await?;
        Ok(ProcessedItem::Status {
            external_message_id,
            status,
        })
    }

    // --- External query and command surface ---

    /// Create an application-originated message.
    pub async fn create_outbound_message(
        &self,
        from_person_id: &str,
        to_address: &str,
        content: &str,
        kind: &str,
    ) -> Result<Message, ParleyError> {
        self.outbound
            .create(from_person_id, to_address, content, kind)
            .await
    }

    /// Status audit trail for one external message id, ordered by time.
    pub async fn status_history(
        &self,
        external_message_id: &str,
    ) -> Result<Vec<MessageStatusEvent>, ParleyError> {
        self.store.status_history(external_message_id).await
    }

    /// Messages in one conversation with display names denormalized.
    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageView>, ParleyError> {
        self.store
            .conversation_messages(conversation_id, limit, offset)
            .await
    }

    /// External mark-read entry point: zero one participant's unread count.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: &str,
        person_id: &str,
    ) -> Result<(), ParleyError> {
        self.aggregator.reset_unread(conversation_id, person_id).await
    }

    /// Liveness of the backing store.
    pub async fn health_check(&self) -> Result<(), ParleyError> {
        self.store.health_check().await
    }

    /// The underlying store, for collaborators that need direct reads.
    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }
}

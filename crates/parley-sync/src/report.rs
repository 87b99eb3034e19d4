// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-delivery processing report.

use serde::Serialize;
use strum::Display;

use parley_core::types::MessageStatus;

/// Per-delivery pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Received,
    Persisted,
    Processing,
    Processed,
    ProcessedWithErrors,
}

/// One successfully processed sub-event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedItem {
    Message {
        message_id: String,
        external_message_id: String,
        conversation_id: String,
        /// True when the external message id was already on record and the
        /// event collapsed into the existing row.
        deduplicated: bool,
    },
    Status {
        external_message_id: String,
        status: MessageStatus,
    },
}

/// One failed sub-event, with enough context to diagnose which item broke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    /// Position of the sub-event within the delivery, in array order.
    pub index: usize,
    /// What kind of sub-event failed ("message", "status", "payload").
    pub context: String,
    pub error: String,
}

/// Itemized outcome of one `ingest`/`reprocess` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub delivery_id: String,
    pub state: DeliveryState,
    /// True when the delivery id was already processed and this call was a
    /// no-op.
    pub already_processed: bool,
    pub processed: Vec<ProcessedItem>,
    pub errors: Vec<ItemError>,
}

impl IngestReport {
    pub fn new(delivery_id: impl Into<String>) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            state: DeliveryState::Received,
            already_processed: false,
            processed: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Human-readable one-line summary of the itemized errors, stored on
    /// the delivery record.
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("[{}:{}] {}", e.context, e.index, e.error))
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_starts_in_received_state() {
        let report = IngestReport::new("d1");
        assert_eq!(report.state, DeliveryState::Received);
        assert!(!report.already_processed);
        assert!(report.processed.is_empty());
        assert!(report.errors.is_empty());
        assert!(report.error_summary().is_none());
    }

    #[test]
    fn error_summary_enumerates_items() {
        let mut report = IngestReport::new("d1");
        report.errors.push(ItemError {
            index: 1,
            context: "status".to_string(),
            error: "message not found: wamid.X".to_string(),
        });
        report.errors.push(ItemError {
            index: 3,
            context: "message".to_string(),
            error: "message event missing sender".to_string(),
        });
        assert_eq!(
            report.error_summary().unwrap(),
            "[status:1] message not found: wamid.X; [message:3] message event missing sender"
        );
    }

    #[test]
    fn delivery_state_renders_snake_case() {
        assert_eq!(
            DeliveryState::ProcessedWithErrors.to_string(),
            "processed_with_errors"
        );
    }

    #[test]
    fn report_serializes_for_operators() {
        let mut report = IngestReport::new("d1");
        report.state = DeliveryState::Processed;
        report.processed.push(ProcessedItem::Status {
            external_message_id: "wamid.1".to_string(),
            status: MessageStatus::Delivered,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["delivery_id"], "d1");
        assert_eq!(json["state"], "processed");
        assert_eq!(json["processed"][0]["kind"], "status");
        assert_eq!(json["processed"][0]["status"], "delivered");
    }
}

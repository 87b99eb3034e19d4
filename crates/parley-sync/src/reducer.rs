// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reducer: applies provider status events to the ledger.

use parley_core::types::{Message, StatusUpdate};
use parley_core::ParleyError;

use crate::ledger::MessageLedger;
use crate::payload::StatusEvent;

/// Thin orchestration over [`MessageLedger::apply_status`], one event at a
/// time. The caller accumulates per-event outcomes; one event's failure
/// never aborts its siblings.
#[derive(Clone)]
pub struct StatusReducer {
    ledger: MessageLedger,
}

impl StatusReducer {
    pub fn new(ledger: MessageLedger) -> Self {
        Self { ledger }
    }

    /// Apply one status event under the monotonic ordering.
    pub async fn apply(&self, event: StatusEvent) -> Result<Message, ParleyError> {
        self.ledger
            .apply_status(StatusUpdate {
                external_message_id: event.external_message_id,
                status: event.status,
                occurred_at: event.occurred_at,
                metadata: event.metadata,
            })
            .await
    }
}

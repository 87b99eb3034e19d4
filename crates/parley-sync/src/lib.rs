// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion and conversation-state synchronization pipeline.
//!
//! Converts inbound provider notifications (new-message arrivals and
//! delivery-status transitions) into a normalized internal model: entities
//! are resolved or created exactly once despite at-least-once upstream
//! delivery, content is extracted from heterogeneous message shapes through
//! one canonical algorithm, and message lifecycle state and conversation
//! aggregates evolve consistently under concurrent, out-of-order delivery.

pub mod aggregator;
mod ids;
pub mod ledger;
pub mod normalize;
pub mod outbound;
pub mod payload;
pub mod pipeline;
pub mod reducer;
pub mod report;
pub mod resolver;

pub use normalize::{normalize, NormalizedContent};
pub use payload::{MessageVariant, WebhookPayload};
pub use pipeline::SyncPipeline;
pub use report::{DeliveryState, IngestReport, ItemError, ProcessedItem};
pub use resolver::{ContactHints, EntityResolver};

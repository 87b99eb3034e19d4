// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `parley-core::types` for use across
//! the store trait boundary. This module re-exports them for convenience
//! within the storage crate.

pub use parley_core::types::{
    Conversation, DeliveryRecord, Message, MessageStatusEvent, MessageView, NewMessage,
    NewPerson, ParticipantState, Person, StatusUpdate,
};

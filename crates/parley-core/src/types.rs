// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared between the pipeline and the storage layer.
//!
//! Records mirror the five durable collections (persons, conversations,
//! messages, message status events, deliveries) plus the per-participant
//! conversation state rows. Timestamps are ISO 8601 strings throughout,
//! matching what SQLite's `strftime` defaults produce.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which side of a conversation a person represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    EndUser,
    Channel,
}

/// Message lifecycle status.
///
/// Ordered `sent < delivered < read`; `failed` is terminal from any state.
/// [`MessageStatus::supersedes`] is the single source of truth for which
/// transitions are allowed to overwrite the stored status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Sent => 0,
            MessageStatus::Delivered => 1,
            MessageStatus::Read => 2,
            MessageStatus::Failed => 3,
        }
    }

    /// Whether a transition to `self` is allowed to overwrite `current`.
    ///
    /// `failed` supersedes every non-failed status and nothing supersedes
    /// `failed`. All other transitions must strictly advance the
    /// sent/delivered/read order, so late or duplicate events are no-ops.
    pub fn supersedes(self, current: MessageStatus) -> bool {
        if current == MessageStatus::Failed {
            return false;
        }
        if self == MessageStatus::Failed {
            return true;
        }
        self.rank() > current.rank()
    }
}

/// An addressable party in a conversation: an end user or a business channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    /// Provider-assigned identifier. Unique when present.
    pub external_id: Option<String>,
    pub display_name: String,
    pub role: PersonRole,
    pub contact_address: Option<String>,
    pub created_at: String,
}

/// Input for person find-or-create. The id is only used when the insert
/// wins; a racing create falls back to the existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPerson {
    pub id: String,
    pub external_id: Option<String>,
    pub display_name: String,
    pub role: PersonRole,
    pub contact_address: Option<String>,
    /// Generated non-login placeholder credential for synthesized identities.
    pub access_token: Option<String>,
}

/// A thread between two persons, stored under the canonically sorted pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_low: String,
    pub participant_high: String,
    /// Provider channel id (e.g. phone number id) the thread runs over.
    pub channel_id: Option<String>,
    pub last_message_id: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

/// Per-participant conversation display state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    pub conversation_id: String,
    pub person_id: String,
    pub unread_count: i64,
    pub archived: bool,
    pub pinned: bool,
    pub muted: bool,
}

/// One communication unit with content, kind, and lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    /// Canonical content kind tag ("text", "image", ...). Unrecognized
    /// provider tags are stored verbatim.
    pub kind: String,
    pub status: MessageStatus,
    /// Provider message id. Unique when present; the idempotency key for
    /// duplicate detection and status application.
    pub external_message_id: Option<String>,
    pub external_timestamp: Option<String>,
    /// Kind-specific payload as a JSON string (media refs, location, ...).
    pub attachments: Option<String>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

/// Input for message insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub kind: String,
    pub status: MessageStatus,
    pub external_message_id: Option<String>,
    pub external_timestamp: Option<String>,
    pub attachments: Option<String>,
}

/// A message joined with sender/recipient display names for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub recipient_name: String,
}

/// Immutable audit record of one status transition received from the
/// provider, kept even when the message status does not move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStatusEvent {
    pub id: i64,
    pub message_id: String,
    pub status: MessageStatus,
    pub occurred_at: String,
    /// Pricing/conversation/error metadata as a JSON string.
    pub metadata: Option<String>,
    pub recorded_at: String,
}

/// A status transition to apply to an existing message.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub external_message_id: String,
    pub status: MessageStatus,
    pub occurred_at: String,
    pub metadata: Option<String>,
}

/// One webhook call's raw payload plus its processing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub payload: String,
    pub processed: bool,
    pub error: Option<String>,
    pub received_at: String,
    pub processed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_advances_monotonically() {
        use MessageStatus::*;
        assert!(Delivered.supersedes(Sent));
        assert!(Read.supersedes(Sent));
        assert!(Read.supersedes(Delivered));
        assert!(!Sent.supersedes(Delivered));
        assert!(!Delivered.supersedes(Read));
        assert!(!Sent.supersedes(Sent));
        assert!(!Read.supersedes(Read));
    }

    #[test]
    fn failed_is_sticky_and_terminal() {
        use MessageStatus::*;
        // failed wins from any prior state...
        assert!(Failed.supersedes(Sent));
        assert!(Failed.supersedes(Delivered));
        assert!(Failed.supersedes(Read));
        // ...and nothing moves a failed message.
        assert!(!Sent.supersedes(Failed));
        assert!(!Delivered.supersedes(Failed));
        assert!(!Read.supersedes(Failed));
        assert!(!Failed.supersedes(Failed));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
            MessageStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(MessageStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(MessageStatus::Sent.to_string(), "sent");
    }

    #[test]
    fn person_role_round_trips_through_strings() {
        assert_eq!(PersonRole::EndUser.to_string(), "end_user");
        assert_eq!(PersonRole::Channel.to_string(), "channel");
        assert_eq!(PersonRole::from_str("end_user").unwrap(), PersonRole::EndUser);
        assert_eq!(PersonRole::from_str("channel").unwrap(), PersonRole::Channel);
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!(MessageStatus::from_str("bounced").is_err());
    }
}

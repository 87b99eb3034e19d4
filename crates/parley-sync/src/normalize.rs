// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical content extraction over the closed message union.
//!
//! One pure function maps every message shape to displayable content, a
//! canonical kind tag, and a kind-specific attachment payload. Total over
//! the union: unrecognized or degraded variants get a generic fallback
//! label instead of an error.

use serde_json::{json, Value};

use crate::payload::MessageVariant;

/// Canonical content extracted from one message event.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    pub content: String,
    pub kind: String,
    pub attachments: Option<Value>,
}

/// Map a message variant to canonical {content, kind, attachments}.
pub fn normalize(variant: &MessageVariant) -> NormalizedContent {
    let kind = variant.kind().to_string();
    let (content, attachments) = match variant {
        MessageVariant::Text(text) => (text.body.clone(), None),
        MessageVariant::Image(media) => (
            media.caption.clone().unwrap_or_else(|| "Image".to_string()),
            Some(media_attachment(media)),
        ),
        MessageVariant::Video(media) => (
            media.caption.clone().unwrap_or_else(|| "Video".to_string()),
            Some(media_attachment(media)),
        ),
        MessageVariant::Audio(media) => (
            "Audio message".to_string(),
            Some(json!({ "media_id": media.id })),
        ),
        MessageVariant::Document(media) => (
            media
                .caption
                .clone()
                .or_else(|| media.filename.clone())
                .unwrap_or_else(|| "Document".to_string()),
            Some(media_attachment(media)),
        ),
        MessageVariant::Sticker(media) => {
            ("Sticker".to_string(), Some(media_attachment(media)))
        }
        MessageVariant::Location(location) => (
            location.name.clone().unwrap_or_else(|| "Location".to_string()),
            Some(json!({
                "location": {
                    "lat": location.latitude,
                    "lon": location.longitude,
                    "name": location.name,
                    "address": location.address,
                }
            })),
        ),
        MessageVariant::Contacts(cards) => {
            let content = cards
                .first()
                .and_then(|card| card.name.as_ref())
                .and_then(|name| name.formatted_name.clone().or_else(|| name.first_name.clone()))
                .map(|name| format!("Contact: {name}"))
                .unwrap_or_else(|| "Contact".to_string());
            (content, Some(json!({ "contacts": cards })))
        }
        MessageVariant::Interactive(interactive) => {
            let reply = interactive
                .button_reply
                .as_ref()
                .or(interactive.list_reply.as_ref());
            let content = reply
                .and_then(|r| r.title.clone())
                .unwrap_or_else(|| "Interactive message".to_string());
            (content, Some(json!({ "raw": interactive })))
        }
        MessageVariant::Reaction(reaction) => (
            reaction.emoji.clone().unwrap_or_else(|| "Reaction".to_string()),
            Some(json!({
                "target_external_id": reaction.message_id,
                "emoji": reaction.emoji,
            })),
        ),
        MessageVariant::Unknown { kind } => (format!("{kind} message"), None),
    };
    NormalizedContent {
        content,
        kind,
        attachments,
    }
}

fn media_attachment(media: &crate::payload::MediaPayload) -> Value {
    json!({ "media_id": media.id, "raw": media })
}

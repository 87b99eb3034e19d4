// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider payload parsing at the ingestion boundary.
//!
//! The webhook blob is decoded into a closed tagged union before anything
//! downstream sees it. The entry/changes/value envelope is parsed with
//! serde; the per-item message and status events stay raw [`Value`]s inside
//! the envelope so one malformed element can be itemized without rejecting
//! its siblings, and are classified here per item.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use parley_core::types::MessageStatus;
use parley_core::ParleyError;

/// Top-level webhook body: a list of entries, each carrying changes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

/// One change's worth of events plus the channel/contact context they
/// arrived with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<ChannelMetadata>,
    #[serde(default)]
    pub contacts: Vec<ContactHint>,
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub statuses: Vec<Value>,
}

/// The business/channel side of the delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMetadata {
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub display_phone_number: Option<String>,
}

/// Sender profile hints delivered alongside messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactHint {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// A fully parsed inbound message event.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub external_id: String,
    pub from: String,
    pub timestamp: Option<String>,
    pub variant: MessageVariant,
}

/// A fully parsed status transition event.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub external_message_id: String,
    pub status: MessageStatus,
    pub occurred_at: String,
    pub metadata: Option<String>,
}

// --- Per-kind message payloads ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactCard {
    #[serde(default)]
    pub name: Option<ContactName>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactName {
    #[serde(default)]
    pub formatted_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractivePayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub button_reply: Option<ReplyPayload>,
    #[serde(default)]
    pub list_reply: Option<ReplyPayload>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPayload {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Closed union over every message shape the provider sends.
///
/// A missing, unknown, or malformed kind-specific sub-object classifies as
/// [`MessageVariant::Unknown`] instead of failing, so the normalizer stays
/// total and one odd message never rejects a whole delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageVariant {
    Text(TextPayload),
    Image(MediaPayload),
    Video(MediaPayload),
    Audio(MediaPayload),
    Document(MediaPayload),
    Sticker(MediaPayload),
    Location(LocationPayload),
    Contacts(Vec<ContactCard>),
    Interactive(InteractivePayload),
    Reaction(ReactionPayload),
    Unknown { kind: String },
}

impl MessageVariant {
    /// Map a provider type tag and its sub-object into the closed union.
    pub fn classify(kind: &str, body: Option<&Value>) -> MessageVariant {
        fn typed<T: serde::de::DeserializeOwned>(body: Option<&Value>) -> Option<T> {
            body.and_then(|v| serde_json::from_value(v.clone()).ok())
        }
        let fallback = || MessageVariant::Unknown {
            kind: kind.to_string(),
        };
        match kind {
            "text" => typed(body).map(MessageVariant::Text).unwrap_or_else(fallback),
            "image" => typed(body).map(MessageVariant::Image).unwrap_or_else(fallback),
            "video" => typed(body).map(MessageVariant::Video).unwrap_or_else(fallback),
            "audio" => typed(body).map(MessageVariant::Audio).unwrap_or_else(fallback),
            "document" => typed(body)
                .map(MessageVariant::Document)
                .unwrap_or_else(fallback),
            "sticker" => typed(body)
                .map(MessageVariant::Sticker)
                .unwrap_or_else(fallback),
            "location" => typed(body)
                .map(MessageVariant::Location)
                .unwrap_or_else(fallback),
            "contacts" => typed::<Vec<ContactCard>>(body)
                .map(MessageVariant::Contacts)
                .unwrap_or_else(fallback),
            "interactive" => typed(body)
                .map(MessageVariant::Interactive)
                .unwrap_or_else(fallback),
            "reaction" => typed(body)
                .map(MessageVariant::Reaction)
                .unwrap_or_else(fallback),
            _ => fallback(),
        }
    }

    /// Canonical kind tag stored on the message record.
    pub fn kind(&self) -> &str {
        match self {
            MessageVariant::Text(_) => "text",
            MessageVariant::Image(_) => "image",
            MessageVariant::Video(_) => "video",
            MessageVariant::Audio(_) => "audio",
            MessageVariant::Document(_) => "document",
            MessageVariant::Sticker(_) => "sticker",
            MessageVariant::Location(_) => "location",
            MessageVariant::Contacts(_) => "contact",
            MessageVariant::Interactive(_) => "interactive",
            MessageVariant::Reaction(_) => "reaction",
            MessageVariant::Unknown { kind } => kind,
        }
    }
}

/// Parse one raw message event from a change's `messages` array.
///
/// Only the identity fields are hard requirements; the kind-specific body
/// degrades to [`MessageVariant::Unknown`] on any shape mismatch.
pub fn parse_message_event(raw: &Value) -> Result<MessageEvent, ParleyError> {
    let external_id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ParleyError::Payload("message event missing id".to_string()))?
        .to_string();
    let from = raw
        .get("from")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ParleyError::Payload(format!("message event {external_id} missing sender"))
        })?
        .to_string();
    let timestamp = raw.get("timestamp").and_then(timestamp_string);
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let variant = MessageVariant::classify(kind, raw.get(kind));
    Ok(MessageEvent {
        external_id,
        from,
        timestamp,
        variant,
    })
}

/// Parse one raw status event from a change's `statuses` array.
pub fn parse_status_event(raw: &Value) -> Result<StatusEvent, ParleyError> {
    let external_message_id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ParleyError::Payload("status event missing message id".to_string()))?
        .to_string();
    let status_str = raw.get("status").and_then(Value::as_str).ok_or_else(|| {
        ParleyError::Payload(format!(
            "status event for {external_message_id} missing status"
        ))
    })?;
    let status = MessageStatus::from_str(status_str).map_err(|_| {
        ParleyError::Payload(format!(
            "unrecognized status '{status_str}' for {external_message_id}"
        ))
    })?;
    let occurred_at = raw
        .get("timestamp")
        .and_then(timestamp_string)
        .map(provider_timestamp_to_iso)
        .unwrap_or_else(now_iso);

    // Carry pricing/conversation/error context verbatim into the audit row.
    let mut metadata = Map::new();
    for key in ["pricing", "conversation", "errors", "recipient_id"] {
        if let Some(v) = raw.get(key) {
            metadata.insert(key.to_string(), v.clone());
        }
    }
    let metadata = if metadata.is_empty() {
        None
    } else {
        Some(Value::Object(metadata).to_string())
    };

    Ok(StatusEvent {
        external_message_id,
        status,
        occurred_at,
        metadata,
    })
}

fn timestamp_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert a provider unix-seconds timestamp into ISO 8601. Non-numeric
/// values pass through untouched.
pub fn provider_timestamp_to_iso(raw: String) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or(raw)
}

/// Current time in the ISO 8601 millisecond format the store uses.
pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley sync service.

use thiserror::Error;

/// The primary error type used across the Parley pipeline and storage layer.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    /// Fatal to the delivery being processed: the delivery stays unprocessed
    /// so the caller can retry or reprocess.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed or unrecognized provider payload. Itemized per sub-event;
    /// never aborts sibling items in the same delivery.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// A referenced entity does not exist (e.g. a status event naming an
    /// unknown external message id). Itemized, not fatal.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A concurrent create raced a uniqueness constraint and the retried
    /// lookup still came back empty.
    #[error("uniqueness conflict on {key}")]
    Conflict { key: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ParleyError::Storage {
            source: source.into(),
        }
    }

    /// Construct a [`ParleyError::NotFound`] for the given entity and lookup key.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        ParleyError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Whether this error aborts the whole delivery rather than being
    /// itemized into the report alongside successful siblings.
    pub fn is_delivery_fatal(&self) -> bool {
        matches!(
            self,
            ParleyError::Storage { .. } | ParleyError::Config(_) | ParleyError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_delivery_fatal() {
        let err = ParleyError::storage(std::io::Error::other("disk gone"));
        assert!(err.is_delivery_fatal());
    }

    #[test]
    fn item_level_errors_are_not_fatal() {
        assert!(!ParleyError::Payload("bad sub-object".into()).is_delivery_fatal());
        assert!(!ParleyError::not_found("message", "wamid.X").is_delivery_fatal());
        assert!(!ParleyError::Conflict { key: "persons.external_id".into() }.is_delivery_fatal());
    }

    #[test]
    fn not_found_names_entity_and_key() {
        let err = ParleyError::not_found("message", "wamid.ABC");
        assert_eq!(err.to_string(), "message not found: wamid.ABC");
    }
}

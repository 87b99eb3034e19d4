// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley sync service.
//!
//! Provides the error taxonomy, the domain records for the five durable
//! collections, and the [`SyncStore`] trait the pipeline runs against.
//! Storage backends implement the trait; the pipeline crate consumes it.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use traits::SyncStore;
pub use types::{MessageStatus, PersonRole};

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin webhook receiver for the Parley sync service.
//!
//! Validates and ACKs provider webhooks, then hands deliveries to the
//! pipeline as background tasks so the upstream ACK deadline never depends
//! on processing time. No business logic lives here.

pub mod handlers;
pub mod server;
pub mod signature;

pub use server::{build_router, start_server, GatewayState};

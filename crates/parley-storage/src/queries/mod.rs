// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per durable collection.

pub mod conversations;
pub mod deliveries;
pub mod messages;
pub mod persons;
pub mod status_events;

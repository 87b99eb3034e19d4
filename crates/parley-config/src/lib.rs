// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Parley sync service.
//!
//! Layered TOML configuration with environment overrides, loaded through
//! Figment. The model rejects unknown keys so typos fail at startup rather
//! than being silently ignored.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ParleyConfig;

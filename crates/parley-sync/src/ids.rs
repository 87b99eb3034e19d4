// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Id and credential generation.

use rand::{distributions::Alphanumeric, Rng};

/// Fresh uuid-v4 record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generated non-login placeholder credential for synthesized identities.
pub(crate) fn placeholder_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn placeholder_tokens_are_long_and_unique() {
        let token = placeholder_token();
        assert_eq!(token.len(), 32);
        assert_ne!(token, placeholder_token());
    }
}

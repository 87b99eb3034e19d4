// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity resolution: find-or-create for persons and conversations.
//!
//! Resolution is lazy: the first reference to an external id synthesizes a
//! placeholder identity with a generated non-login credential. Conversation
//! lookup sorts the participant pair canonically, so both directions of a
//! thread land on the same row, and the channel-side path funnels into the
//! same pair lookup once the channel person is resolved.

use std::sync::Arc;

use parley_core::types::{Conversation, NewPerson, Person, PersonRole};
use parley_core::{ParleyError, SyncStore};

use crate::ids;
use crate::payload::ChangeValue;

/// Profile hints for contact resolution, pulled from the delivery's
/// `contacts` array.
#[derive(Debug, Clone, Default)]
pub struct ContactHints {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl ContactHints {
    /// Hints for one sender id from a change's contact list.
    pub fn for_sender(value: &ChangeValue, external_id: &str) -> Self {
        let name = value
            .contacts
            .iter()
            .find(|c| c.wa_id.as_deref() == Some(external_id))
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.clone());
        ContactHints {
            name,
            address: None,
        }
    }
}

/// Finds-or-creates Person and Conversation records from external identifiers.
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn SyncStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Resolve the end-user side of a message by provider id, creating a
    /// placeholder identity from hints on first reference.
    pub async fn resolve_contact(
        &self,
        external_id: &str,
        hints: &ContactHints,
    ) -> Result<Person, ParleyError> {
        let display_name = hints
            .name
            .clone()
            .unwrap_or_else(|| external_id.to_string());
        let contact_address = hints
            .address
            .clone()
            .unwrap_or_else(|| external_id.to_string());
        self.store
            .find_or_create_person(NewPerson {
                id: ids::new_id(),
                external_id: Some(external_id.to_string()),
                display_name,
                role: PersonRole::EndUser,
                contact_address: Some(contact_address),
                access_token: Some(ids::placeholder_token()),
            })
            .await
    }

    /// Resolve the business/channel side, matched on (display address,
    /// channel id).
    pub async fn resolve_channel(
        &self,
        channel_id: &str,
        display_address: &str,
    ) -> Result<Person, ParleyError> {
        if let Some(existing) = self
            .store
            .find_channel_person(channel_id, display_address)
            .await?
        {
            return Ok(existing);
        }
        self.store
            .find_or_create_person(NewPerson {
                id: ids::new_id(),
                external_id: Some(channel_id.to_string()),
                display_name: display_address.to_string(),
                role: PersonRole::Channel,
                contact_address: Some(display_address.to_string()),
                access_token: Some(ids::placeholder_token()),
            })
            .await
    }

    /// Find or create the conversation for an unordered person pair.
    ///
    /// The pair is sorted canonically before lookup, guaranteeing one
    /// conversation per pair regardless of direction.
    pub async fn find_or_create_conversation(
        &self,
        person_a: &str,
        person_b: &str,
        channel_id: Option<&str>,
    ) -> Result<Conversation, ParleyError> {
        let (low, high) = if person_a <= person_b {
            (person_a, person_b)
        } else {
            (person_b, person_a)
        };
        self.store
            .find_or_create_conversation(&ids::new_id(), low, high, channel_id)
            .await
    }
}

//! Registration endpoints
//!
//! A registration ties a partner company to the marketplace:
//! - Create a registration
//! - Get a registration by ID
//! - Update it with a merge patch
//! - Delete it

use crate::client::PartnerSellClient;
use crate::error::ApiResult;
use chrono::{DateTime, Utc};
use partnersell_patch::{Field, merge_patch};
use serde::{Deserialize, Serialize};

const BASE: &str = "registration";

/// Registrations API interface
#[derive(Clone, Debug)]
pub struct RegistrationsApi {
    client: PartnerSellClient,
}

impl RegistrationsApi {
    /// Create a new registrations API interface
    pub(crate) fn new(client: PartnerSellClient) -> Self {
        Self { client }
    }

    /// Create a registration
    ///
    /// POST /registration
    pub async fn create(&self, request: &CreateRegistrationRequest) -> ApiResult<Registration> {
        self.client.post(&[BASE], request).await
    }

    /// Get a registration by ID
    ///
    /// GET /registration/{id}
    pub async fn get(&self, id: &str) -> ApiResult<Registration> {
        self.client.get(&[BASE, id]).await
    }

    /// Apply a merge patch to a registration
    ///
    /// PATCH /registration/{id}
    ///
    /// Only the fields set on `patch` are sent. A field set to null is
    /// cleared on the server; unset fields are left as they are.
    pub async fn update(&self, id: &str, patch: &RegistrationPatch) -> ApiResult<Registration> {
        self.client.patch(&[BASE, id], patch).await
    }

    /// Delete a registration
    ///
    /// DELETE /registration/{id}
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete(&[BASE, id]).await
    }
}

/// Primary contact of a registered company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryContact {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
}

impl PrimaryContact {
    /// Create a contact
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A registration as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration ID
    pub id: String,
    /// Marketplace account the registration belongs to
    pub account_id: String,
    /// Company name
    pub name: String,
    /// Primary contact
    pub contact: PrimaryContact,
    /// Catalog new products are placed in
    #[serde(default)]
    pub default_catalog_id: Option<String>,
    /// IAM access group granted to the provider
    #[serde(default)]
    pub provider_access_group: Option<String>,
    /// Creation time, when the service reports it
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for creating a registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRegistrationRequest {
    /// Marketplace account to register under
    pub account_id: String,
    /// Company name
    pub name: String,
    /// Primary contact
    pub contact: PrimaryContact,
    /// Optional default catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_catalog_id: Option<String>,
    /// Optional provider access group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_access_group: Option<String>,
}

impl CreateRegistrationRequest {
    /// Create a request with the required fields
    pub fn new(
        account_id: impl Into<String>,
        name: impl Into<String>,
        contact: PrimaryContact,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            contact,
            default_catalog_id: None,
            provider_access_group: None,
        }
    }
}

merge_patch! {
    /// Changes to a registration
    ///
    /// Every field starts unset. Use the `with_*` methods to set values and
    /// the `clear_*` methods to null out optional ones.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct RegistrationPatch {
        /// Company name
        pub name: String,
        /// Primary contact, replaced as a whole
        pub contact: PrimaryContact,
        /// Catalog new products are placed in
        pub default_catalog_id: String,
        /// IAM access group granted to the provider
        pub provider_access_group: String,
    }
}

impl RegistrationPatch {
    /// Start an empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the company name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Field::Value(name.into());
        self
    }

    /// Replace the primary contact
    #[must_use]
    pub fn with_contact(mut self, contact: PrimaryContact) -> Self {
        self.contact = Field::Value(contact);
        self
    }

    /// Set the default catalog
    #[must_use]
    pub fn with_default_catalog_id(mut self, id: impl Into<String>) -> Self {
        self.default_catalog_id = Field::Value(id.into());
        self
    }

    /// Remove the default catalog
    #[must_use]
    pub fn clear_default_catalog_id(mut self) -> Self {
        self.default_catalog_id = Field::Null;
        self
    }

    /// Set the provider access group
    #[must_use]
    pub fn with_provider_access_group(mut self, group: impl Into<String>) -> Self {
        self.provider_access_group = Field::Value(group.into());
        self
    }

    /// Remove the provider access group
    #[must_use]
    pub fn clear_provider_access_group(mut self) -> Self {
        self.provider_access_group = Field::Null;
        self
    }

    /// Apply this patch to a local copy of a registration
    pub fn apply_to(&self, registration: &mut Registration) {
        if let Some(name) = self.name.as_value() {
            registration.name.clone_from(name);
        }
        if let Some(contact) = self.contact.as_value() {
            registration.contact.clone_from(contact);
        }
        self.default_catalog_id
            .clone()
            .apply_to(&mut registration.default_catalog_id);
        self.provider_access_group
            .clone()
            .apply_to(&mut registration.provider_access_group);
    }
}

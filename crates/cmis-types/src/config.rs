use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which protocol binding a session talks through.
///
/// The selection is an enum, not a class name: every supported flavor is a
/// compile-time known constructor in the binding crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingKind {
    /// Self-contained in-process repository, for tests and embedding.
    #[default]
    InMemory,
    /// JSON/Browser binding (external transport, not part of this crate set).
    Browser,
    /// AtomPub binding (external transport, not part of this crate set).
    AtomPub,
}

/// Credentials handed to the authentication provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    // Never print the password.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Construction-time session parameters.
///
/// Read-only after the session is built. Unknown settings go into `extras`
/// and are forwarded to the binding untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub repository_id: String,
    pub binding: BindingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Default page size for paged operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items_per_page: Option<u32>,
    /// Pass-through settings the core does not interpret.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl SessionConfig {
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            ..Self::default()
        }
    }

    pub fn with_binding(mut self, binding: BindingKind) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn with_max_items_per_page(mut self, max_items: u32) -> Self {
        self.max_items_per_page = Some(max_items);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// `true` when nothing at all has been configured.
    ///
    /// The typed equivalent of an empty parameter map: no repository id,
    /// no credentials, no service URL, no extras.
    pub fn is_empty(&self) -> bool {
        self.repository_id.is_empty()
            && self.credentials.is_none()
            && self.service_url.is_none()
            && self.max_items_per_page.is_none()
            && self.extras.is_empty()
    }
}

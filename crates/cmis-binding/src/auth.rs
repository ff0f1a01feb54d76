use std::collections::BTreeMap;

use cmis_types::Credentials;

/// Attaches credentials to outgoing request metadata.
///
/// Transport bindings call `apply` on every request they build. The core
/// never inspects what a provider writes; it only guarantees the provider
/// is consulted.
pub trait AuthenticationProvider: Send + Sync {
    /// Write authentication entries (headers, tokens) into the request
    /// metadata map.
    fn apply(&self, metadata: &mut BTreeMap<String, String>);
}

/// Provider that attaches nothing. Used when no credentials are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAuthenticationProvider;

impl AuthenticationProvider for NullAuthenticationProvider {
    fn apply(&self, _metadata: &mut BTreeMap<String, String>) {}
}

/// Standard user/password provider.
#[derive(Clone, Debug)]
pub struct StandardAuthenticationProvider {
    credentials: Credentials,
}

impl StandardAuthenticationProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl AuthenticationProvider for StandardAuthenticationProvider {
    fn apply(&self, metadata: &mut BTreeMap<String, String>) {
        metadata.insert("user".to_string(), self.credentials.user.clone());
        metadata.insert("password".to_string(), self.credentials.password.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_writes_nothing() {
        let mut metadata = BTreeMap::new();
        NullAuthenticationProvider.apply(&mut metadata);
        assert!(metadata.is_empty());
    }

    #[test]
    fn standard_provider_writes_credentials() {
        let provider =
            StandardAuthenticationProvider::new(Credentials::new("alice", "secret"));
        let mut metadata = BTreeMap::new();
        provider.apply(&mut metadata);
        assert_eq!(metadata.get("user").map(String::as_str), Some("alice"));
        assert_eq!(metadata.get("password").map(String::as_str), Some("secret"));
    }
}

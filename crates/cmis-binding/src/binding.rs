use std::sync::Arc;

use cmis_cache::Cache;
use cmis_types::{BindingKind, SessionConfig, TypeDefinition};

use crate::auth::{
    AuthenticationProvider, NullAuthenticationProvider, StandardAuthenticationProvider,
};
use crate::error::{BindingError, BindingResult};
use crate::memory::InMemoryBinding;
use crate::services::{
    AclService, DiscoveryService, ObjectService, PolicyService, RelationshipService,
    RepositoryService,
};

/// Shared cache of raw type definitions, keyed by type id.
///
/// The session hands this to the binding at construction so type lookups the
/// binding makes internally land in the same store the session reads.
pub type TypeDefinitionCache = Arc<dyn Cache<String, TypeDefinition>>;

/// A constructed protocol binding: one opaque capability provider exposing
/// the service façades.
///
/// The core never looks behind these accessors. Every service call is
/// synchronous and blocks until the round trip completes; cancellation and
/// timeouts, where available, are binding-internal concerns.
pub trait Binding: Send + Sync {
    fn repository_service(&self) -> &dyn RepositoryService;
    fn object_service(&self) -> &dyn ObjectService;
    fn acl_service(&self) -> &dyn AclService;
    fn policy_service(&self) -> &dyn PolicyService;
    fn relationship_service(&self) -> &dyn RelationshipService;
    fn discovery_service(&self) -> &dyn DiscoveryService;

    /// Drop any state the binding caches internally.
    fn clear_all_caches(&self) {}

    /// Release transport resources. Further calls may fail.
    fn close(&self) {}
}

/// Build the authentication provider for a configuration.
pub fn create_authentication_provider(
    config: &SessionConfig,
) -> Arc<dyn AuthenticationProvider> {
    match &config.credentials {
        Some(credentials) => Arc::new(StandardAuthenticationProvider::new(credentials.clone())),
        None => Arc::new(NullAuthenticationProvider),
    }
}

/// Construct the binding selected by `config.binding`.
///
/// The HTTP flavors are external collaborators; selecting one here reports
/// `NotSupported` rather than silently falling back to anything else.
pub fn create_binding(
    config: &SessionConfig,
    type_definition_cache: TypeDefinitionCache,
    _auth_provider: Arc<dyn AuthenticationProvider>,
) -> BindingResult<Arc<dyn Binding>> {
    match config.binding {
        BindingKind::InMemory => {
            let binding =
                InMemoryBinding::new(&config.repository_id).with_type_definition_cache(type_definition_cache);
            Ok(Arc::new(binding))
        }
        BindingKind::Browser => Err(BindingError::NotSupported(
            "browser binding requires an external transport implementation".to_string(),
        )),
        BindingKind::AtomPub => Err(BindingError::NotSupported(
            "atompub binding requires an external transport implementation".to_string(),
        )),
    }
}

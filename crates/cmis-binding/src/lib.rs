//! Protocol bindings: the seam between the session layer and a repository.
//!
//! A [`Binding`] bundles the six CMIS service façades behind one opaque
//! capability provider. The session layer calls services and interprets
//! results; bindings own transport, wire formats, and authentication. The
//! crate ships one complete binding, [`InMemoryBinding`], a self-contained
//! repository used for tests and embedding.
//!
//! # Key Types
//!
//! - [`Binding`] — constructed binding exposing the service façades
//! - [`RepositoryService`] / [`ObjectService`] / [`AclService`] /
//!   [`PolicyService`] / [`RelationshipService`] / [`DiscoveryService`] —
//!   the service seams, one trait per CMIS service group
//! - [`AuthenticationProvider`] — credential attachment seam
//! - [`BindingError`] — protocol-shaped fault taxonomy
//!
//! # Design Rules
//!
//! - Every service call is synchronous and blocks until the round trip
//!   completes.
//! - Absence is data: lookups return `Ok(None)` for missing objects and
//!   types; `Err` means the operation itself failed.
//! - Bindings never interpret object semantics. They move property bags and
//!   report repository faults unchanged.

pub mod auth;
pub mod binding;
pub mod error;
pub mod memory;
pub mod services;

pub use auth::{
    AuthenticationProvider, NullAuthenticationProvider, StandardAuthenticationProvider,
};
pub use binding::{
    create_authentication_provider, create_binding, Binding, TypeDefinitionCache,
};
pub use error::{BindingError, BindingResult};
pub use memory::{InMemoryBinding, ROOT_FOLDER_ID};
pub use services::{
    AclService, ChangeList, DiscoveryService, ObjectList, ObjectService, PolicyService,
    RelationshipService, RepositoryService,
};

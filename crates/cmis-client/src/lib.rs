//! High-level client for CMIS-style content repositories.
//!
//! A [`Session`] is the single entry point: it connects to one repository
//! through a protocol binding, converts raw protocol data into typed domain
//! objects, and caches what it fetched. Retrieval behavior is controlled per
//! call by an [`OperationContext`].
//!
//! ```no_run
//! use cmis_client::{OperationContext, Session};
//! use cmis_types::SessionConfig;
//!
//! # fn main() -> Result<(), cmis_client::ClientError> {
//! let session = Session::builder(SessionConfig::new("my-repo")).connect()?;
//! let root = session.get_root_folder()?;
//! let object = session.get_object(&session.create_object_id("obj-42"))?;
//! let uncached = OperationContext::default().with_cache_enabled(false);
//! let fresh = session.get_object_with_context(object.id(), &uncached)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Key Types
//!
//! - [`Session`] / [`SessionBuilder`] — connection to one repository
//! - [`OperationContext`] — per-call retrieval and caching directives
//! - [`CmisObject`] — typed domain object, one variant per base type
//! - [`ObjectFactory`] — raw-data-to-domain conversion seam
//! - [`ClientError`] — the session fault taxonomy
//!
//! # Design Rules
//!
//! - Every operation blocks until the repository answers; there is no
//!   background I/O and no retry.
//! - Caller input is validated before any binding call; repository faults
//!   pass through unchanged.
//! - Caches are transparent: they change latency, never results, except for
//!   the bounded staleness a cache-enabled context accepts.

pub mod context;
pub mod error;
pub mod factory;
pub mod object;
pub mod query;
pub mod session;

pub use context::OperationContext;
pub use error::{ClientError, ClientResult};
pub use factory::{ObjectFactory, ObjectTypeCache, StandardObjectFactory};
pub use object::{
    CmisObject, Document, Folder, Item, ObjectCore, ObjectType, Policy, Relationship,
};
pub use query::{ChangeEvent, ChangeEvents, QueryResult, QueryResults};
pub use session::{BindingFactory, ObjectCache, ObjectCacheEntry, Session, SessionBuilder};

//! Foundation types for the CMIS client stack.
//!
//! This crate provides the wire-shaped data model shared by the binding SPI
//! and the session layer. Every other `cmis-*` crate depends on `cmis-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Opaque repository object identifier, the universal cache key
//! - [`Properties`] / [`PropertyValue`] — Typed property bag of a repository object
//! - [`ObjectData`] — Raw protocol representation of an object as returned by a binding
//! - [`Acl`] / [`Ace`] — Access control list and entries
//! - [`RepositoryInfo`] — Repository identity and capability set, fetched once per session
//! - [`TypeDefinition`] — Content-type description with property definitions
//! - [`ContentStream`] — Document content payload (consumed, never closed, by the binding)
//! - [`SessionConfig`] — Construction-time session parameters

pub mod acl;
pub mod config;
pub mod content;
pub mod enums;
pub mod error;
pub mod object;
pub mod property;
pub mod repository;
pub mod typedef;

pub use acl::{Ace, Acl, AclPropagation};
pub use config::{BindingKind, Credentials, SessionConfig};
pub use content::ContentStream;
pub use enums::{IncludeRelationships, RelationshipDirection, UnfileObject, VersioningState};
pub use error::TypeError;
pub use object::{
    Action, AllowableActions, BaseTypeId, ChangeInfo, ChangeType, ObjectData, ObjectId,
};
pub use property::{
    Cardinality, Properties, PropertyDefinition, PropertyType, PropertyValue, Updatability,
};
pub use repository::{RepositoryCapabilities, RepositoryInfo};
pub use typedef::{TypeDefinition, TypeDefinitionTree};

/// Well-known CMIS property identifiers.
pub mod property_ids {
    pub const OBJECT_ID: &str = "cmis:objectId";
    pub const BASE_TYPE_ID: &str = "cmis:baseTypeId";
    pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
    pub const NAME: &str = "cmis:name";
    pub const CREATED_BY: &str = "cmis:createdBy";
    pub const CREATION_DATE: &str = "cmis:creationDate";
    pub const LAST_MODIFIED_BY: &str = "cmis:lastModifiedBy";
    pub const LAST_MODIFICATION_DATE: &str = "cmis:lastModificationDate";
    pub const CHANGE_TOKEN: &str = "cmis:changeToken";
    pub const PATH: &str = "cmis:path";
    pub const PARENT_ID: &str = "cmis:parentId";
    pub const SOURCE_ID: &str = "cmis:sourceId";
    pub const TARGET_ID: &str = "cmis:targetId";
    pub const CONTENT_STREAM_LENGTH: &str = "cmis:contentStreamLength";
    pub const CONTENT_STREAM_MIME_TYPE: &str = "cmis:contentStreamMimeType";
    pub const CONTENT_STREAM_FILE_NAME: &str = "cmis:contentStreamFileName";
    pub const IS_LATEST_VERSION: &str = "cmis:isLatestVersion";
    pub const IS_MAJOR_VERSION: &str = "cmis:isMajorVersion";
    pub const VERSION_LABEL: &str = "cmis:versionLabel";
    pub const VERSION_SERIES_ID: &str = "cmis:versionSeriesId";
}

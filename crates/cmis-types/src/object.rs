use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::acl::Acl;
use crate::error::TypeError;
use crate::property::Properties;
use crate::property_ids;

/// Opaque identifier of a repository object.
///
/// The repository assigns ids; the client never interprets them. Two ids are
/// equal exactly when their underlying strings are equal, which makes
/// `ObjectId` the universal cache key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a raw id string. Pure, never fails, performs no I/O.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the raw string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The five CMIS base types plus secondary types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseTypeId {
    Document,
    Folder,
    Relationship,
    Policy,
    Item,
    Secondary,
}

impl BaseTypeId {
    /// The wire-level type id (`cmis:document` etc.).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "cmis:document",
            Self::Folder => "cmis:folder",
            Self::Relationship => "cmis:relationship",
            Self::Policy => "cmis:policy",
            Self::Item => "cmis:item",
            Self::Secondary => "cmis:secondary",
        }
    }
}

impl fmt::Display for BaseTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BaseTypeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmis:document" => Ok(Self::Document),
            "cmis:folder" => Ok(Self::Folder),
            "cmis:relationship" => Ok(Self::Relationship),
            "cmis:policy" => Ok(Self::Policy),
            "cmis:item" => Ok(Self::Item),
            "cmis:secondary" => Ok(Self::Secondary),
            other => Err(TypeError::UnknownBaseType(other.to_string())),
        }
    }
}

/// One permitted operation on an object, as reported by the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    CanGetProperties,
    CanUpdateProperties,
    CanDeleteObject,
    CanGetContentStream,
    CanSetContentStream,
    CanDeleteContentStream,
    CanGetChildren,
    CanGetFolderParent,
    CanCreateDocument,
    CanCreateFolder,
    CanMoveObject,
    CanGetAcl,
    CanApplyAcl,
    CanApplyPolicy,
    CanRemovePolicy,
    CanGetObjectRelationships,
    CanCheckOut,
    CanCheckIn,
    CanCancelCheckOut,
}

/// The set of actions the caller may perform on an object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowableActions {
    pub actions: Vec<Action>,
}

impl AllowableActions {
    pub fn new(mut actions: Vec<Action>) -> Self {
        actions.sort_unstable();
        actions.dedup();
        Self { actions }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Kind of a change-log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
    Security,
}

/// Change-log entry metadata attached to an object or change event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    pub change_type: ChangeType,
    pub change_time: DateTime<Utc>,
}

/// Raw protocol representation of a repository object.
///
/// This is what a binding returns: a property bag plus whichever optional
/// substructures the request asked for. It is transient by design, consumed
/// immediately by the object factory and never cached directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowable_actions: Option<AllowableActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_exact_acl: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<ObjectData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_info: Option<ChangeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_segment: Option<String>,
}

impl ObjectData {
    pub fn with_properties(properties: Properties) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    /// The object id carried in the property bag, if any.
    pub fn id(&self) -> Option<ObjectId> {
        self.properties
            .get_string(property_ids::OBJECT_ID)
            .map(ObjectId::new)
    }

    /// The declared base type, if the property is present and well-formed.
    pub fn base_type_id(&self) -> Option<BaseTypeId> {
        self.properties
            .get_string(property_ids::BASE_TYPE_ID)
            .and_then(|s| s.parse().ok())
    }

    /// The object's type id property.
    pub fn object_type_id(&self) -> Option<&str> {
        self.properties.get_string(property_ids::OBJECT_TYPE_ID)
    }
}

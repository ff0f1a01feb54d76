use std::fmt;

use serde::{Deserialize, Serialize};

/// Versioning state assigned to a newly created document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersioningState {
    /// Non-versionable document.
    #[default]
    None,
    /// Created in the checked-out state.
    CheckedOut,
    /// Created as a major version.
    Major,
    /// Created as a minor version.
    Minor,
}

/// Which relationships to attach when fetching an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeRelationships {
    #[default]
    None,
    Source,
    Target,
    Both,
}

impl fmt::Display for IncludeRelationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Source => "source",
            Self::Target => "target",
            Self::Both => "both",
        };
        write!(f, "{s}")
    }
}

/// Direction filter for relationship retrieval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipDirection {
    #[default]
    Source,
    Target,
    Either,
}

/// What happens to a document's filing when its folder tree is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnfileObject {
    Unfile,
    DeleteSingleFiled,
    #[default]
    Delete,
}

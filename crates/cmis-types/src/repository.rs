use serde::{Deserialize, Serialize};

use crate::object::ObjectId;

/// Optional capability switches a repository may support.
///
/// Only the capabilities the session layer actually consults are modeled;
/// everything else a binding reports travels in `extensions`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryCapabilities {
    /// Documents may exist outside any folder.
    pub unfiling: bool,
    /// Documents may live in more than one folder.
    pub multifiling: bool,
    /// The repository answers `query` calls.
    pub query: bool,
    /// The repository maintains a change log.
    pub changes: bool,
    /// ACLs can be discovered and managed.
    pub acl_manageable: bool,
    /// Documents support version series.
    pub versioning: bool,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub extensions: std::collections::BTreeMap<String, String>,
}

/// Identity and capabilities of a repository.
///
/// Fetched exactly once at session construction and owned for the session's
/// lifetime; it is never silently refetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_version: String,
    pub root_folder_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_change_log_token: Option<String>,
    #[serde(default)]
    pub capabilities: RepositoryCapabilities,
}

impl RepositoryInfo {
    pub fn new(id: impl Into<String>, root_folder_id: ObjectId) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            vendor_name: String::new(),
            product_name: String::new(),
            product_version: String::new(),
            root_folder_id,
            latest_change_log_token: None,
            capabilities: RepositoryCapabilities::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_name_to_id() {
        let info = RepositoryInfo::new("repo-1", ObjectId::new("root"));
        assert_eq!(info.name, "repo-1");
        assert_eq!(info.root_folder_id, ObjectId::new("root"));
        assert!(!info.capabilities.unfiling);
    }

    #[test]
    fn serde_roundtrip() {
        let mut info = RepositoryInfo::new("repo-1", ObjectId::new("root"));
        info.capabilities.query = true;
        info.latest_change_log_token = Some("17".into());
        let json = serde_json::to_string(&info).unwrap();
        let parsed: RepositoryInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, parsed);
    }
}

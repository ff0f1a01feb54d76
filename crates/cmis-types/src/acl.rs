use serde::{Deserialize, Serialize};

/// A single access control entry: one principal, one or more permissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ace {
    pub principal_id: String,
    pub permissions: Vec<String>,
    /// Direct ACEs were set on the object itself; indirect ones are inherited.
    pub direct: bool,
}

impl Ace {
    pub fn new(principal_id: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            permissions,
            direct: true,
        }
    }
}

/// An access control list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    pub aces: Vec<Ace>,
    /// `true` if the list fully expresses the object's permissions.
    pub is_exact: bool,
}

impl Acl {
    pub fn new(aces: Vec<Ace>) -> Self {
        Self {
            aces,
            is_exact: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    /// All ACEs for the given principal.
    pub fn aces_for<'a>(&'a self, principal_id: &'a str) -> impl Iterator<Item = &'a Ace> + 'a {
        self.aces
            .iter()
            .filter(move |ace| ace.principal_id == principal_id)
    }
}

/// How an ACL change propagates to dependent objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AclPropagation {
    #[default]
    RepositoryDetermined,
    ObjectOnly,
    Propagate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aces_for_filters_by_principal() {
        let acl = Acl::new(vec![
            Ace::new("alice", vec!["cmis:read".into()]),
            Ace::new("bob", vec!["cmis:write".into()]),
            Ace::new("alice", vec!["cmis:write".into()]),
        ]);
        assert_eq!(acl.aces_for("alice").count(), 2);
        assert_eq!(acl.aces_for("carol").count(), 0);
    }

    #[test]
    fn aces_for_borrows_from_the_list() {
        let acl = Acl::new(vec![Ace::new("alice", vec!["cmis:read".into()])]);
        let matched: Vec<&Ace> = acl.aces_for("alice").collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].permissions, vec!["cmis:read".to_string()]);
    }

    #[test]
    fn default_propagation_is_repository_determined() {
        assert_eq!(
            AclPropagation::default(),
            AclPropagation::RepositoryDetermined
        );
    }
}

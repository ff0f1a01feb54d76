use cmis_types::{
    Ace, Acl, AclPropagation, ContentStream, IncludeRelationships, ObjectData, ObjectId,
    Properties, RelationshipDirection, RepositoryInfo, TypeDefinition, TypeDefinitionTree,
    VersioningState,
};

use crate::error::BindingResult;

/// A page of raw objects, as returned by list-shaped operations.
#[derive(Clone, Debug, Default)]
pub struct ObjectList {
    pub objects: Vec<ObjectData>,
    pub has_more_items: bool,
    /// Total match count if the repository reports one.
    pub num_items: Option<u64>,
}

/// A page of the repository change log.
#[derive(Clone, Debug, Default)]
pub struct ChangeList {
    pub objects: Vec<ObjectData>,
    pub latest_change_log_token: Option<String>,
    pub has_more_items: bool,
}

/// Repository-level operations: identity, capabilities, and the type system.
pub trait RepositoryService: Send + Sync {
    /// Identity and capabilities of a repository.
    fn repository_info(&self, repository_id: &str) -> BindingResult<RepositoryInfo>;

    /// A single type definition. `Ok(None)` when the type id is unknown.
    fn type_definition(
        &self,
        repository_id: &str,
        type_id: &str,
    ) -> BindingResult<Option<TypeDefinition>>;

    /// Direct child types of `type_id`, or the base types when `None`.
    fn type_children(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        include_property_definitions: bool,
        max_items: Option<u32>,
        skip_count: u32,
    ) -> BindingResult<Vec<TypeDefinition>>;

    /// Descendant type trees of `type_id`, or of the base types when `None`.
    /// `depth` must be positive or `-1` for unbounded.
    fn type_descendants(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        depth: i32,
        include_property_definitions: bool,
    ) -> BindingResult<Vec<TypeDefinitionTree>>;
}

/// Object CRUD and content retrieval.
///
/// Create operations return the raw id assigned by the repository; the
/// session wraps it. `get_object` returns `Ok(None)` when nothing is
/// addressed by the id, which the session surfaces as not-found.
#[allow(clippy::too_many_arguments)]
pub trait ObjectService: Send + Sync {
    fn create_document(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        content: Option<ContentStream>,
        versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn create_document_from_source(
        &self,
        repository_id: &str,
        source_id: &ObjectId,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn create_folder(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn create_item(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn create_policy(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn create_relationship(
        &self,
        repository_id: &str,
        properties: &Properties,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> BindingResult<ObjectId>;

    fn get_object(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>>;

    fn get_object_by_path(
        &self,
        repository_id: &str,
        path: &str,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>>;

    /// Latest (or latest major) version in the version series of `object_id`.
    fn get_object_of_latest_version(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        major: bool,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>>;

    /// Content stream of a document. `Ok(None)` when the document has none.
    fn content_stream(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        stream_id: Option<&str>,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> BindingResult<Option<ContentStream>>;

    /// Update properties; returns the (possibly changed) object id.
    fn update_properties(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        change_token: Option<&str>,
        properties: &Properties,
    ) -> BindingResult<ObjectId>;

    fn delete_object(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        all_versions: bool,
    ) -> BindingResult<()>;
}

/// ACL discovery and manipulation.
pub trait AclService: Send + Sync {
    fn acl(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        only_basic_permissions: bool,
    ) -> BindingResult<Acl>;

    /// Add and remove direct ACEs; returns the object's new ACL.
    fn apply_acl(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        add_aces: &[Ace],
        remove_aces: &[Ace],
        propagation: AclPropagation,
    ) -> BindingResult<Acl>;
}

/// Policy application and retrieval.
pub trait PolicyService: Send + Sync {
    fn apply_policy(
        &self,
        repository_id: &str,
        policy_id: &ObjectId,
        object_id: &ObjectId,
    ) -> BindingResult<()>;

    fn remove_policy(
        &self,
        repository_id: &str,
        policy_id: &ObjectId,
        object_id: &ObjectId,
    ) -> BindingResult<()>;

    fn applied_policies(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        filter: Option<&str>,
    ) -> BindingResult<Vec<ObjectData>>;
}

/// Relationship retrieval.
#[allow(clippy::too_many_arguments)]
pub trait RelationshipService: Send + Sync {
    fn object_relationships(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        include_sub_relationship_types: bool,
        direction: RelationshipDirection,
        type_id: Option<&str>,
        filter: Option<&str>,
        include_allowable_actions: bool,
        max_items: Option<u32>,
        skip_count: u32,
    ) -> BindingResult<ObjectList>;
}

/// Query execution and the change-log feed.
#[allow(clippy::too_many_arguments)]
pub trait DiscoveryService: Send + Sync {
    /// Execute a query statement. The statement is forwarded as-is; the
    /// binding (or the repository behind it) owns parsing.
    fn query(
        &self,
        repository_id: &str,
        statement: &str,
        search_all_versions: bool,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        rendition_filter: &str,
        max_items: Option<u32>,
        skip_count: u32,
    ) -> BindingResult<ObjectList>;

    /// Change-log events after `change_log_token`, or from the first
    /// available event when `None`.
    fn content_changes(
        &self,
        repository_id: &str,
        change_log_token: Option<&str>,
        include_properties: bool,
        include_policy_ids: bool,
        include_acl: bool,
        max_items: Option<u32>,
    ) -> BindingResult<ChangeList>;
}

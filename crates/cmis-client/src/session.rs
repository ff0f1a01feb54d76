use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cmis_binding::{
    create_authentication_provider, create_binding, AuthenticationProvider, Binding,
    BindingResult, TypeDefinitionCache,
};
use cmis_cache::{Cache, InMemoryCache};
use cmis_types::{
    Ace, Acl, AclPropagation, ContentStream, ObjectId, Properties, RelationshipDirection,
    RepositoryInfo, SessionConfig, TypeDefinitionTree, VersioningState,
};
use tracing::{debug, info};

use crate::context::OperationContext;
use crate::error::{ClientError, ClientResult};
use crate::factory::{ObjectFactory, ObjectTypeCache, StandardObjectFactory};
use crate::object::{CmisObject, Document, Folder, ObjectType, Relationship};
use crate::query::{ChangeEvent, ChangeEvents, QueryResults};

/// Cached conversions of one object, keyed by the retrieval shape
/// ([`OperationContext::cache_key`]) that produced each of them.
pub type ObjectCacheEntry = HashMap<String, CmisObject>;

/// Shared cache of converted domain objects, keyed by object id.
///
/// Each entry is partitioned per retrieval shape, so a context that asks
/// for ACLs is never served a conversion that was fetched without them.
/// Invalidation works on the whole entry.
pub type ObjectCache = Arc<dyn Cache<ObjectId, ObjectCacheEntry>>;

/// Replaceable binding constructor, for callers that provide their own
/// transport or need to observe the binding a session talks through.
pub type BindingFactory = Arc<
    dyn Fn(
            &SessionConfig,
            TypeDefinitionCache,
            Arc<dyn AuthenticationProvider>,
        ) -> BindingResult<Arc<dyn Binding>>
        + Send
        + Sync,
>;

/// Builder for [`Session`].
///
/// Every collaborator has a default; overrides exist for tests and for
/// embedders that share caches across sessions.
pub struct SessionBuilder {
    config: SessionConfig,
    object_factory: Option<Arc<dyn ObjectFactory>>,
    object_cache: Option<ObjectCache>,
    type_definition_cache: Option<TypeDefinitionCache>,
    object_type_cache: Option<ObjectTypeCache>,
    binding_factory: Option<BindingFactory>,
    default_context: Option<OperationContext>,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            object_factory: None,
            object_cache: None,
            type_definition_cache: None,
            object_type_cache: None,
            binding_factory: None,
            default_context: None,
        }
    }

    pub fn with_object_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.object_factory = Some(factory);
        self
    }

    pub fn with_object_cache(mut self, cache: ObjectCache) -> Self {
        self.object_cache = Some(cache);
        self
    }

    pub fn with_type_definition_cache(mut self, cache: TypeDefinitionCache) -> Self {
        self.type_definition_cache = Some(cache);
        self
    }

    pub fn with_object_type_cache(mut self, cache: ObjectTypeCache) -> Self {
        self.object_type_cache = Some(cache);
        self
    }

    pub fn with_binding_factory(mut self, factory: BindingFactory) -> Self {
        self.binding_factory = Some(factory);
        self
    }

    pub fn with_default_context(mut self, context: OperationContext) -> Self {
        self.default_context = Some(context);
        self
    }

    /// Build the session and connect to the repository.
    ///
    /// Construction is fail-fast: an empty configuration, a blank repository
    /// id, a binding that cannot be built, or a failed repository-info fetch
    /// abort construction. Nothing is retried.
    pub fn connect(self) -> ClientResult<Session> {
        if self.config.is_empty() {
            return Err(ClientError::invalid("session configuration is empty"));
        }

        let object_type_cache = self
            .object_type_cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        let object_factory = self.object_factory.unwrap_or_else(|| {
            Arc::new(StandardObjectFactory::new(Arc::clone(&object_type_cache)))
        });
        let object_cache: ObjectCache = self
            .object_cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        let type_definition_cache: TypeDefinitionCache = self
            .type_definition_cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::new()));
        let default_context = Arc::new(self.default_context.unwrap_or_default());

        let auth_provider = create_authentication_provider(&self.config);
        let binding = match &self.binding_factory {
            Some(factory) => factory(
                &self.config,
                Arc::clone(&type_definition_cache),
                auth_provider,
            )?,
            None => create_binding(
                &self.config,
                Arc::clone(&type_definition_cache),
                auth_provider,
            )?,
        };

        if self.config.repository_id.trim().is_empty() {
            return Err(ClientError::illegal_state(
                "session configuration has no repository id",
            ));
        }

        // Fetched once, owned for the session's lifetime.
        let repository_info = binding
            .repository_service()
            .repository_info(&self.config.repository_id)?;

        info!(repository_id = %repository_info.id, "session connected");
        Ok(Session {
            config: self.config,
            binding,
            object_factory,
            object_cache,
            type_definition_cache,
            object_type_cache,
            repository_info,
            default_context: RwLock::new(default_context),
        })
    }
}

/// A connection to one repository.
///
/// The session orchestrates the binding, the object factory, and the
/// client-side caches; it holds no transaction state and is safe to share
/// across threads behind an `Arc`. Calls block until the repository
/// answers.
pub struct Session {
    config: SessionConfig,
    binding: Arc<dyn Binding>,
    object_factory: Arc<dyn ObjectFactory>,
    object_cache: ObjectCache,
    type_definition_cache: TypeDefinitionCache,
    object_type_cache: ObjectTypeCache,
    repository_info: RepositoryInfo,
    default_context: RwLock<Arc<OperationContext>>,
}

impl Session {
    /// Start building a session for the given configuration.
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn repository_id(&self) -> &str {
        &self.config.repository_id
    }

    /// Repository identity and capabilities, as fetched at construction.
    pub fn repository_info(&self) -> &RepositoryInfo {
        &self.repository_info
    }

    pub fn binding(&self) -> Arc<dyn Binding> {
        Arc::clone(&self.binding)
    }

    pub fn object_factory(&self) -> Arc<dyn ObjectFactory> {
        Arc::clone(&self.object_factory)
    }

    /// The current default operation context.
    pub fn default_context(&self) -> Arc<OperationContext> {
        Arc::clone(&self.default_context.read().expect("lock poisoned"))
    }

    /// Swap the default context. Calls already in flight keep the context
    /// they captured; only subsequent calls observe the new one.
    pub fn set_default_context(&self, context: OperationContext) {
        *self.default_context.write().expect("lock poisoned") = Arc::new(context);
    }

    /// A detached copy of the current default context, ready for builder
    /// adjustments.
    pub fn create_operation_context(&self) -> OperationContext {
        self.default_context().as_ref().clone()
    }

    /// Wrap a raw id string. Pure: no validation, no repository round trip.
    pub fn create_object_id(&self, id: impl Into<String>) -> ObjectId {
        ObjectId::new(id)
    }

    // -----------------------------------------------------------------------
    // Cache control
    // -----------------------------------------------------------------------

    /// Drop one object from the session cache. The next read goes to the
    /// repository.
    pub fn remove_object_from_cache(&self, object_id: &ObjectId) {
        self.object_cache.remove(object_id);
    }

    /// Re-fetch an object from the repository under the default context,
    /// replacing whatever the cache held for it.
    pub fn refresh(&self, object_id: &ObjectId) -> ClientResult<CmisObject> {
        self.object_cache.remove(object_id);
        let context = self.default_context();
        self.get_object_with_context(object_id, &context)
    }

    /// Drop all session caches and whatever the binding caches internally.
    pub fn clear(&self) {
        self.object_cache.clear();
        self.type_definition_cache.clear();
        self.object_type_cache.clear();
        self.binding.clear_all_caches();
    }

    // -----------------------------------------------------------------------
    // Create operations
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn create_document(
        &self,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        content: Option<ContentStream>,
        versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        if folder_id.is_none() && !self.repository_info.capabilities.unfiling {
            return Err(ClientError::invalid(
                "repository does not support unfiled documents; a parent folder is required",
            ));
        }
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_document(
            self.repository_id(),
            &properties,
            folder_id,
            content,
            versioning_state,
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_document_from_source(
        &self,
        source_id: &ObjectId,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_document_from_source(
            self.repository_id(),
            source_id,
            &properties,
            folder_id,
            versioning_state,
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    pub fn create_folder(
        &self,
        properties: &Properties,
        folder_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_folder(
            self.repository_id(),
            &properties,
            folder_id,
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    pub fn create_item(
        &self,
        properties: &Properties,
        folder_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_item(
            self.repository_id(),
            &properties,
            Some(folder_id),
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    pub fn create_policy(
        &self,
        properties: &Properties,
        folder_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_policy(
            self.repository_id(),
            &properties,
            Some(folder_id),
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    pub fn create_relationship(
        &self,
        properties: &Properties,
        policies: &[String],
        add_aces: &[Ace],
        remove_aces: &[Ace],
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let policies = self.object_factory.convert_policies(policies)?;
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let id = self.binding.object_service().create_relationship(
            self.repository_id(),
            &properties,
            &policies,
            &add_aces,
            &remove_aces,
        )?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    /// Fetch an object under the session default context.
    pub fn get_object(&self, object_id: &ObjectId) -> ClientResult<CmisObject> {
        let context = self.default_context();
        self.get_object_with_context(object_id, &context)
    }

    /// Fetch an object under an explicit context.
    ///
    /// Cache contract: a cache-enabled context reads the object cache first,
    /// but a hit is only served when it was stored under the same retrieval
    /// shape, so a context that asks for ACLs never gets a conversion fetched
    /// without them. A fresh result is stored only when the context requests
    /// no property subset, so a filtered read never leaves a partial object
    /// behind.
    pub fn get_object_with_context(
        &self,
        object_id: &ObjectId,
        context: &OperationContext,
    ) -> ClientResult<CmisObject> {
        if context.cache_enabled() {
            if let Some(entry) = self.object_cache.get(object_id) {
                if let Some(cached) = entry.get(&context.cache_key()) {
                    debug!(object_id = %object_id, "object cache hit");
                    return Ok(cached.clone());
                }
            }
        }

        let data = self
            .binding
            .object_service()
            .get_object(
                self.repository_id(),
                object_id,
                context.filter_string().as_deref(),
                context.include_allowable_actions(),
                context.include_relationships(),
                &context.rendition_filter_string(),
                context.include_policies(),
                context.include_acls(),
            )?
            .ok_or_else(|| ClientError::not_found(object_id.as_str()))?;
        let object = self.object_factory.convert_object(data, context)?;
        self.cache_object(&object, context);
        Ok(object)
    }

    /// Fetch an object by its folder path under the default context.
    pub fn get_object_by_path(&self, path: &str) -> ClientResult<CmisObject> {
        let context = self.default_context();
        self.get_object_by_path_with_context(path, &context)
    }

    pub fn get_object_by_path_with_context(
        &self,
        path: &str,
        context: &OperationContext,
    ) -> ClientResult<CmisObject> {
        if path.is_empty() {
            return Err(ClientError::invalid("path must not be empty"));
        }
        let data = self
            .binding
            .object_service()
            .get_object_by_path(
                self.repository_id(),
                path,
                context.filter_string().as_deref(),
                context.include_allowable_actions(),
                context.include_relationships(),
                &context.rendition_filter_string(),
                context.include_policies(),
                context.include_acls(),
            )?
            .ok_or_else(|| ClientError::not_found(path))?;
        let object = self.object_factory.convert_object(data, context)?;
        self.cache_object(&object, context);
        Ok(object)
    }

    /// The repository root folder.
    pub fn get_root_folder(&self) -> ClientResult<Folder> {
        let root_id = self.repository_info.root_folder_id.clone();
        let object = self.get_object(&root_id)?;
        object
            .into_folder()
            .ok_or_else(|| ClientError::runtime("repository root object is not a folder"))
    }

    /// The latest (or latest major) version of a document's version series.
    pub fn get_latest_document_version(
        &self,
        object_id: &ObjectId,
        major: bool,
        context: &OperationContext,
    ) -> ClientResult<Document> {
        let data = self
            .binding
            .object_service()
            .get_object_of_latest_version(
                self.repository_id(),
                object_id,
                major,
                context.filter_string().as_deref(),
                context.include_allowable_actions(),
                context.include_relationships(),
                &context.rendition_filter_string(),
                context.include_policies(),
                context.include_acls(),
            )?
            .ok_or_else(|| ClientError::not_found(object_id.as_str()))?;
        let object = self.object_factory.convert_object(data, context)?;
        object
            .into_document()
            .ok_or_else(|| ClientError::runtime("latest version is not a document"))
    }

    /// Content stream of a document; `Ok(None)` when the document has none.
    pub fn get_content_stream(
        &self,
        object_id: &ObjectId,
        stream_id: Option<&str>,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> ClientResult<Option<ContentStream>> {
        let stream = self.binding.object_service().content_stream(
            self.repository_id(),
            object_id,
            stream_id,
            offset,
            length,
        )?;
        Ok(stream)
    }

    // -----------------------------------------------------------------------
    // Type system
    // -----------------------------------------------------------------------

    /// Resolve a type definition.
    ///
    /// With `use_cache` the type-definition cache is consulted first;
    /// without it the binding is always asked, and the fresh definition
    /// still replaces the cached one. Conversion goes through the
    /// object-type cache either way, so the returned `Arc` is identity
    /// stable per type id.
    pub fn get_type_definition(
        &self,
        type_id: &str,
        use_cache: bool,
    ) -> ClientResult<Arc<ObjectType>> {
        if use_cache {
            if let Some(definition) = self.type_definition_cache.get(&type_id.to_string()) {
                debug!(type_id = %type_id, "type definition cache hit");
                return Ok(self.object_factory.convert_type_definition(definition));
            }
        }
        let definition = self
            .binding
            .repository_service()
            .type_definition(self.repository_id(), type_id)?
            .ok_or_else(|| ClientError::not_found(format!("type: {type_id}")))?;
        self.type_definition_cache
            .put(type_id.to_string(), definition.clone());
        Ok(self.object_factory.convert_type_definition(definition))
    }

    /// Direct children of a type, or the base types when `None`.
    pub fn get_type_children(
        &self,
        type_id: Option<&str>,
        include_property_definitions: bool,
    ) -> ClientResult<Vec<Arc<ObjectType>>> {
        let definitions = self.binding.repository_service().type_children(
            self.repository_id(),
            type_id,
            include_property_definitions,
            None,
            0,
        )?;
        Ok(definitions
            .into_iter()
            .map(|d| self.object_factory.convert_type_definition(d))
            .collect())
    }

    /// Descendant trees of a type, or of the base types when `None`.
    /// `depth` must be positive or `-1` for unbounded.
    pub fn get_type_descendants(
        &self,
        type_id: Option<&str>,
        depth: i32,
        include_property_definitions: bool,
    ) -> ClientResult<Vec<TypeDefinitionTree>> {
        let trees = self.binding.repository_service().type_descendants(
            self.repository_id(),
            type_id,
            depth,
            include_property_definitions,
        )?;
        Ok(trees)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Update an object's properties. Returns the object's id, which a
    /// repository may change. The cache entry is invalidated either way.
    pub fn update_properties(
        &self,
        object_id: &ObjectId,
        change_token: Option<&str>,
        properties: &Properties,
    ) -> ClientResult<ObjectId> {
        let properties = self.require_properties(properties)?;
        let new_id = self.binding.object_service().update_properties(
            self.repository_id(),
            object_id,
            change_token,
            &properties,
        )?;
        self.object_cache.remove(object_id);
        if new_id != *object_id {
            self.object_cache.remove(&new_id);
        }
        Ok(new_id)
    }

    /// Delete an object and drop it from the cache.
    pub fn delete(&self, object_id: &ObjectId, all_versions: bool) -> ClientResult<()> {
        self.binding
            .object_service()
            .delete_object(self.repository_id(), object_id, all_versions)?;
        self.object_cache.remove(object_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // ACLs
    // -----------------------------------------------------------------------

    pub fn get_acl(
        &self,
        object_id: &ObjectId,
        only_basic_permissions: bool,
    ) -> ClientResult<Acl> {
        let acl = self.binding.acl_service().acl(
            self.repository_id(),
            object_id,
            only_basic_permissions,
        )?;
        Ok(acl)
    }

    /// Add and remove ACEs. Invalidates the object's cache entry.
    pub fn apply_acl(
        &self,
        object_id: &ObjectId,
        add_aces: &[Ace],
        remove_aces: &[Ace],
        propagation: AclPropagation,
    ) -> ClientResult<Acl> {
        let add_aces = self.object_factory.convert_aces(add_aces)?;
        let remove_aces = self.object_factory.convert_aces(remove_aces)?;
        let acl = self.binding.acl_service().apply_acl(
            self.repository_id(),
            object_id,
            &add_aces,
            &remove_aces,
            propagation,
        )?;
        self.object_cache.remove(object_id);
        Ok(acl)
    }

    /// Replace an object's ACL with exactly `aces`, computed as a diff
    /// against the current ACL.
    pub fn set_acl(&self, object_id: &ObjectId, aces: &[Ace]) -> ClientResult<Acl> {
        let aces = self.object_factory.convert_aces(aces)?;
        let current = self.get_acl(object_id, false)?;
        let add: Vec<Ace> = aces
            .iter()
            .filter(|ace| !current.aces.contains(ace))
            .cloned()
            .collect();
        let remove: Vec<Ace> = current
            .aces
            .iter()
            .filter(|ace| !aces.contains(ace))
            .cloned()
            .collect();
        self.apply_acl(object_id, &add, &remove, AclPropagation::ObjectOnly)
    }

    // -----------------------------------------------------------------------
    // Policies
    // -----------------------------------------------------------------------

    pub fn apply_policies(
        &self,
        object_id: &ObjectId,
        policy_ids: &[String],
    ) -> ClientResult<()> {
        let policy_ids = self.object_factory.convert_policies(policy_ids)?;
        if policy_ids.is_empty() {
            return Err(ClientError::invalid("at least one policy id is required"));
        }
        for policy_id in &policy_ids {
            let applied = self.binding.policy_service().apply_policy(
                self.repository_id(),
                &ObjectId::new(policy_id.clone()),
                object_id,
            );
            if let Err(err) = applied {
                // A prefix of the list may already have landed.
                self.object_cache.remove(object_id);
                return Err(err.into());
            }
        }
        self.object_cache.remove(object_id);
        Ok(())
    }

    pub fn remove_policies(
        &self,
        object_id: &ObjectId,
        policy_ids: &[String],
    ) -> ClientResult<()> {
        let policy_ids = self.object_factory.convert_policies(policy_ids)?;
        if policy_ids.is_empty() {
            return Err(ClientError::invalid("at least one policy id is required"));
        }
        for policy_id in &policy_ids {
            let removed = self.binding.policy_service().remove_policy(
                self.repository_id(),
                &ObjectId::new(policy_id.clone()),
                object_id,
            );
            if let Err(err) = removed {
                // A prefix of the list may already have landed.
                self.object_cache.remove(object_id);
                return Err(err.into());
            }
        }
        self.object_cache.remove(object_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Relationships in which `object_id` participates.
    pub fn get_relationships(
        &self,
        object_id: &ObjectId,
        include_sub_relationship_types: bool,
        direction: RelationshipDirection,
        type_id: Option<&str>,
        context: &OperationContext,
    ) -> ClientResult<Vec<Relationship>> {
        let page = self.binding.relationship_service().object_relationships(
            self.repository_id(),
            object_id,
            include_sub_relationship_types,
            direction,
            type_id,
            context.filter_string().as_deref(),
            context.include_allowable_actions(),
            Some(context.max_items_per_page()),
            0,
        )?;
        let mut relationships = Vec::with_capacity(page.objects.len());
        for data in page.objects {
            let object = self.object_factory.convert_object(data, context)?;
            match object {
                CmisObject::Relationship(rel) => relationships.push(rel),
                other => {
                    return Err(ClientError::runtime(format!(
                        "relationship list contains a {:?} object",
                        other.base_type_id()
                    )))
                }
            }
        }
        Ok(relationships)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Execute a query statement and return raw result rows.
    pub fn query(
        &self,
        statement: &str,
        search_all_versions: bool,
        context: &OperationContext,
    ) -> ClientResult<QueryResults> {
        if statement.trim().is_empty() {
            return Err(ClientError::invalid("query statement must not be empty"));
        }
        let page = self.binding.discovery_service().query(
            self.repository_id(),
            statement,
            search_all_versions,
            context.include_allowable_actions(),
            context.include_relationships(),
            &context.rendition_filter_string(),
            Some(context.max_items_per_page()),
            0,
        )?;
        Ok(QueryResults {
            results: page
                .objects
                .into_iter()
                .map(|data| self.object_factory.convert_query_result(data))
                .collect(),
            has_more_items: page.has_more_items,
            num_items: page.num_items,
        })
    }

    /// Query all objects of a type (and its subtypes), converted to domain
    /// objects. Query results never touch the object cache.
    pub fn query_objects(
        &self,
        type_id: &str,
        where_clause: Option<&str>,
        search_all_versions: bool,
        context: &OperationContext,
    ) -> ClientResult<Vec<CmisObject>> {
        let object_type = self.get_type_definition(type_id, true)?;
        let statement = match where_clause {
            Some(clause) if !clause.trim().is_empty() => {
                format!("SELECT * FROM {} WHERE {clause}", object_type.query_name())
            }
            _ => format!("SELECT * FROM {}", object_type.query_name()),
        };
        let page = self.binding.discovery_service().query(
            self.repository_id(),
            &statement,
            search_all_versions,
            context.include_allowable_actions(),
            context.include_relationships(),
            &context.rendition_filter_string(),
            Some(context.max_items_per_page()),
            0,
        )?;
        page.objects
            .into_iter()
            .map(|data| self.object_factory.convert_object(data, context))
            .collect()
    }

    /// Change-log events after `change_log_token`, or from the start of the
    /// log when `None`.
    pub fn get_content_changes(
        &self,
        change_log_token: Option<&str>,
        include_properties: bool,
        include_policy_ids: bool,
        include_acl: bool,
        max_items: Option<u32>,
    ) -> ClientResult<ChangeEvents> {
        let page = self.binding.discovery_service().content_changes(
            self.repository_id(),
            change_log_token,
            include_properties,
            include_policy_ids,
            include_acl,
            max_items,
        )?;
        let mut events = Vec::with_capacity(page.objects.len());
        for data in page.objects {
            let object_id = data
                .id()
                .ok_or_else(|| ClientError::runtime("change event carries no object id"))?;
            let info = data
                .change_info
                .ok_or_else(|| ClientError::runtime("change event carries no change info"))?;
            events.push(ChangeEvent {
                object_id,
                change_type: info.change_type,
                change_time: info.change_time,
                properties: data.properties,
                policy_ids: data.policy_ids,
                acl: data.acl,
            });
        }
        Ok(ChangeEvents {
            events,
            latest_change_log_token: page.latest_change_log_token,
            has_more_items: page.has_more_items,
        })
    }

    /// The repository's current change-log position. Always a fresh fetch;
    /// the token held in [`Session::repository_info`] is construction-time
    /// state and goes stale.
    pub fn get_latest_change_log_token(&self) -> ClientResult<Option<String>> {
        let info = self
            .binding
            .repository_service()
            .repository_info(self.repository_id())?;
        Ok(info.latest_change_log_token)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Store a fetched conversion under the context's retrieval shape.
    ///
    /// Only complete objects are stored: a context that requested a property
    /// subset bypasses the write so no partial conversion is ever cached.
    fn cache_object(&self, object: &CmisObject, context: &OperationContext) {
        if !context.cache_enabled() || !context.is_unfiltered() {
            return;
        }
        let object_id = object.id().clone();
        let mut entry = self.object_cache.get(&object_id).unwrap_or_default();
        entry.insert(context.cache_key(), object.clone());
        self.object_cache.put(object_id, entry);
    }

    fn require_properties(&self, properties: &Properties) -> ClientResult<Properties> {
        if properties.is_empty() {
            return Err(ClientError::invalid("properties must not be empty"));
        }
        self.object_factory.convert_properties(properties)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("repository_id", &self.config.repository_id)
            .field("binding", &self.config.binding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmis_binding::{
        AclService, BindingError, DiscoveryService, InMemoryBinding, ObjectService,
        PolicyService, RelationshipService, RepositoryService, ROOT_FOLDER_ID,
    };
    use cmis_types::{property_ids, ChangeType, IncludeRelationships, PropertyValue};

    const REPO: &str = "test-repo";

    fn doc_properties(name: &str) -> Properties {
        let mut props = Properties::new();
        props.put(property_ids::NAME, PropertyValue::String(name.into()));
        props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:document".into()),
        );
        props
    }

    fn folder_properties(name: &str) -> Properties {
        let mut props = Properties::new();
        props.put(property_ids::NAME, PropertyValue::String(name.into()));
        props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:folder".into()),
        );
        props
    }

    fn root() -> ObjectId {
        ObjectId::new(ROOT_FOLDER_ID)
    }

    /// A session wired to a shared in-memory binding whose call counters
    /// the test can read.
    fn session_with_binding() -> (Session, Arc<InMemoryBinding>) {
        let binding = Arc::new(InMemoryBinding::new(REPO));
        let shared = Arc::clone(&binding);
        let session = Session::builder(SessionConfig::new(REPO))
            .with_binding_factory(Arc::new(move |_, _, _| {
                Ok(Arc::clone(&shared) as Arc<dyn Binding>)
            }))
            .connect()
            .unwrap();
        (session, binding)
    }

    fn session() -> Session {
        session_with_binding().0
    }

    fn create_doc(session: &Session, name: &str) -> ObjectId {
        session
            .create_document(
                &doc_properties(name),
                Some(&root()),
                None,
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn connect_happy_path() {
        let session = Session::builder(SessionConfig::new(REPO)).connect().unwrap();
        assert_eq!(session.repository_id(), REPO);
        assert_eq!(session.repository_info().id, REPO);
        assert_eq!(session.repository_info().root_folder_id, root());
    }

    #[test]
    fn empty_configuration_is_rejected() {
        let err = Session::builder(SessionConfig::default()).connect().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn blank_repository_id_is_illegal_state() {
        let config = SessionConfig::default().with_extra("custom", "x");
        let err = Session::builder(config).connect().unwrap_err();
        assert!(matches!(err, ClientError::IllegalState(_)));
    }

    #[test]
    fn repository_info_failure_is_fatal() {
        // The binding serves a different repository than the config names.
        let binding = Arc::new(InMemoryBinding::new("other-repo"));
        let err = Session::builder(SessionConfig::new(REPO))
            .with_binding_factory(Arc::new(move |_, _, _| {
                Ok(Arc::clone(&binding) as Arc<dyn Binding>)
            }))
            .connect()
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Binding(BindingError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn unsupported_binding_kind_fails_construction() {
        let config = SessionConfig::new(REPO).with_binding(cmis_types::BindingKind::Browser);
        let err = Session::builder(config).connect().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Binding(BindingError::NotSupported(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Create operations
    // -----------------------------------------------------------------------

    #[test]
    fn create_document_rejects_empty_properties_before_binding_call() {
        let (session, binding) = session_with_binding();
        let before = binding.object_count();
        let err = session
            .create_document(
                &Properties::new(),
                Some(&root()),
                None,
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(binding.object_count(), before);
    }

    #[test]
    fn create_document_without_folder_needs_unfiling() {
        let (session, binding) = session_with_binding();
        let err = session
            .create_document(
                &doc_properties("floating"),
                None,
                None,
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        // The capability is read from construction-time repository info, so
        // a new session must observe the toggle.
        binding.set_unfiling(true);
        let shared = Arc::clone(&binding);
        let session = Session::builder(SessionConfig::new(REPO))
            .with_binding_factory(Arc::new(move |_, _, _| {
                Ok(Arc::clone(&shared) as Arc<dyn Binding>)
            }))
            .connect()
            .unwrap();
        session
            .create_document(
                &doc_properties("floating"),
                None,
                None,
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap();
    }

    #[test]
    fn create_folder_and_fetch_by_path() {
        let session = session();
        let folder_id = session
            .create_folder(&folder_properties("docs"), &root(), &[], &[], &[])
            .unwrap();
        let fetched = session.get_object_by_path("/docs").unwrap();
        assert_eq!(fetched.id(), &folder_id);
        assert!(fetched.is_folder());
    }

    #[test]
    fn create_relationship_and_list() {
        let session = session();
        let a = create_doc(&session, "a");
        let b = create_doc(&session, "b");
        let mut props = Properties::new();
        props.put(property_ids::NAME, PropertyValue::String("rel".into()));
        props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:relationship".into()),
        );
        props.put(property_ids::SOURCE_ID, PropertyValue::Id(a.as_str().into()));
        props.put(property_ids::TARGET_ID, PropertyValue::Id(b.as_str().into()));
        session.create_relationship(&props, &[], &[], &[]).unwrap();

        let rels = session
            .get_relationships(
                &a,
                false,
                RelationshipDirection::Source,
                None,
                &OperationContext::default(),
            )
            .unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source_id(), Some(a));
        assert_eq!(rels[0].target_id(), Some(b));
    }

    // -----------------------------------------------------------------------
    // Object cache contract
    // -----------------------------------------------------------------------

    #[test]
    fn second_get_is_served_from_cache() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "cached");
        session.get_object(&id).unwrap();
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 1);
    }

    #[test]
    fn remove_object_from_cache_forces_one_refetch() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "evicted");
        session.get_object(&id).unwrap();
        session.remove_object_from_cache(&id);
        session.get_object(&id).unwrap();
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 2);
    }

    #[test]
    fn refresh_bypasses_and_repopulates_the_cache() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "stale");
        session.get_object(&id).unwrap();

        let mut changes = Properties::new();
        changes.put(property_ids::NAME, PropertyValue::String("fresh".into()));
        binding
            .update_properties(REPO, &id, None, &changes)
            .unwrap();

        // The out-of-band change is invisible until refresh.
        assert_eq!(session.get_object(&id).unwrap().name(), Some("stale"));
        let refreshed = session.refresh(&id).unwrap();
        assert_eq!(refreshed.name(), Some("fresh"));
        // And the refreshed copy is now the cached one.
        assert_eq!(session.get_object(&id).unwrap().name(), Some("fresh"));
    }

    #[test]
    fn clear_drops_all_cached_objects() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "cleared");
        session.get_object(&id).unwrap();
        session.clear();
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 2);
    }

    #[test]
    fn cache_disabled_context_always_hits_the_binding() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "uncached");
        let ctx = OperationContext::default().with_cache_enabled(false);
        session.get_object_with_context(&id, &ctx).unwrap();
        session.get_object_with_context(&id, &ctx).unwrap();
        assert_eq!(binding.get_object_calls(), 2);
        // The bypassing context did not populate the cache either.
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 3);
    }

    #[test]
    fn filtered_context_never_writes_the_cache() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "partial");
        let filtered = OperationContext::default().with_filter(["cmis:name"]);
        let partial = session.get_object_with_context(&id, &filtered).unwrap();
        assert!(!partial.properties().contains(property_ids::CREATION_DATE));

        // A full read must not be served from a partial entry.
        let full = session.get_object(&id).unwrap();
        assert!(full.properties().contains(property_ids::CREATION_DATE));
        assert_eq!(binding.get_object_calls(), 2);
    }

    #[test]
    fn cache_hit_requires_matching_retrieval_shape() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "shaped");
        session
            .apply_acl(
                &id,
                &[Ace::new("alice", vec!["cmis:read".into()])],
                &[],
                AclPropagation::RepositoryDetermined,
            )
            .unwrap();

        session.get_object(&id).unwrap();
        let with_acls = OperationContext::default().with_include_acls(true);
        let secured = session.get_object_with_context(&id, &with_acls).unwrap();
        // The default-shape entry must not satisfy the ACL-requesting read.
        assert_eq!(binding.get_object_calls(), 2);
        assert_eq!(secured.acl().unwrap().aces.len(), 1);

        // Both shapes are now cached side by side.
        session.get_object(&id).unwrap();
        session.get_object_with_context(&id, &with_acls).unwrap();
        assert_eq!(binding.get_object_calls(), 2);
    }

    #[test]
    fn invalidation_drops_every_cached_shape() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "reshaped");
        let with_acls = OperationContext::default().with_include_acls(true);
        session.get_object(&id).unwrap();
        session.get_object_with_context(&id, &with_acls).unwrap();
        assert_eq!(binding.get_object_calls(), 2);

        let mut changes = Properties::new();
        changes.put(property_ids::NAME, PropertyValue::String("renamed".into()));
        session.update_properties(&id, None, &changes).unwrap();

        session.get_object(&id).unwrap();
        session.get_object_with_context(&id, &with_acls).unwrap();
        assert_eq!(binding.get_object_calls(), 4);
    }

    #[test]
    fn missing_object_is_not_found() {
        let session = session();
        let err = session.get_object(&ObjectId::new("ghost")).unwrap_err();
        assert!(matches!(err, ClientError::ObjectNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Default context
    // -----------------------------------------------------------------------

    #[test]
    fn default_context_swap_affects_subsequent_calls_only() {
        let (session, binding) = session_with_binding();
        let id = create_doc(&session, "ctx");

        let captured = session.default_context();
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 1);

        session.set_default_context(OperationContext::default().with_cache_enabled(false));
        session.get_object(&id).unwrap();
        assert_eq!(binding.get_object_calls(), 2);

        // The context captured before the swap still has caching on.
        assert!(captured.cache_enabled());
        session.get_object_with_context(&id, &captured).unwrap();
        assert_eq!(binding.get_object_calls(), 2);
    }

    #[test]
    fn create_operation_context_copies_the_current_default() {
        let session = session();
        assert!(session.create_operation_context().cache_enabled());
        session.set_default_context(
            OperationContext::default()
                .with_include_acls(true)
                .with_cache_enabled(false),
        );
        let ctx = session.create_operation_context();
        assert!(ctx.include_acls());
        assert!(!ctx.cache_enabled());
    }

    #[test]
    fn create_object_id_is_pure() {
        let (session, binding) = session_with_binding();
        let calls_before = binding.get_object_calls();
        let id = session.create_object_id("anything");
        assert_eq!(id, ObjectId::new("anything"));
        assert_eq!(binding.get_object_calls(), calls_before);
    }

    // -----------------------------------------------------------------------
    // Root folder
    // -----------------------------------------------------------------------

    #[test]
    fn root_folder_is_a_folder() {
        let session = session();
        let folder = session.get_root_folder().unwrap();
        assert!(folder.is_root());
        assert_eq!(folder.path(), Some("/"));
    }

    /// Delegates everything to an inner binding but reports a repository
    /// info whose root folder id points at an arbitrary object.
    struct BrokenRootBinding {
        inner: Arc<InMemoryBinding>,
        root_id: ObjectId,
    }

    impl RepositoryService for BrokenRootBinding {
        fn repository_info(
            &self,
            repository_id: &str,
        ) -> cmis_binding::BindingResult<RepositoryInfo> {
            let mut info = self.inner.repository_info(repository_id)?;
            info.root_folder_id = self.root_id.clone();
            Ok(info)
        }

        fn type_definition(
            &self,
            repository_id: &str,
            type_id: &str,
        ) -> cmis_binding::BindingResult<Option<cmis_types::TypeDefinition>> {
            self.inner.type_definition(repository_id, type_id)
        }

        fn type_children(
            &self,
            repository_id: &str,
            type_id: Option<&str>,
            include_property_definitions: bool,
            max_items: Option<u32>,
            skip_count: u32,
        ) -> cmis_binding::BindingResult<Vec<cmis_types::TypeDefinition>> {
            self.inner.type_children(
                repository_id,
                type_id,
                include_property_definitions,
                max_items,
                skip_count,
            )
        }

        fn type_descendants(
            &self,
            repository_id: &str,
            type_id: Option<&str>,
            depth: i32,
            include_property_definitions: bool,
        ) -> cmis_binding::BindingResult<Vec<TypeDefinitionTree>> {
            self.inner
                .type_descendants(repository_id, type_id, depth, include_property_definitions)
        }
    }

    impl Binding for BrokenRootBinding {
        fn repository_service(&self) -> &dyn RepositoryService {
            self
        }

        fn object_service(&self) -> &dyn ObjectService {
            self.inner.object_service()
        }

        fn acl_service(&self) -> &dyn AclService {
            self.inner.acl_service()
        }

        fn policy_service(&self) -> &dyn PolicyService {
            self.inner.policy_service()
        }

        fn relationship_service(&self) -> &dyn RelationshipService {
            self.inner.relationship_service()
        }

        fn discovery_service(&self) -> &dyn DiscoveryService {
            self.inner.discovery_service()
        }
    }

    #[test]
    fn non_folder_root_is_a_runtime_error() {
        let inner = Arc::new(InMemoryBinding::new(REPO));
        let doc_id = inner
            .create_document(
                REPO,
                &doc_properties("impostor"),
                Some(&root()),
                None,
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap();
        let broken = Arc::new(BrokenRootBinding {
            inner,
            root_id: doc_id,
        });
        let session = Session::builder(SessionConfig::new(REPO))
            .with_binding_factory(Arc::new(move |_, _, _| {
                Ok(Arc::clone(&broken) as Arc<dyn Binding>)
            }))
            .connect()
            .unwrap();
        let err = session.get_root_folder().unwrap_err();
        assert!(matches!(err, ClientError::Runtime(_)));
    }

    // -----------------------------------------------------------------------
    // Type system
    // -----------------------------------------------------------------------

    #[test]
    fn type_definition_is_cached() {
        let (session, binding) = session_with_binding();
        let a = session.get_type_definition("cmis:document", true).unwrap();
        let b = session.get_type_definition("cmis:document", true).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(binding.type_definition_calls(), 1);
    }

    #[test]
    fn use_cache_false_always_asks_the_binding() {
        let (session, binding) = session_with_binding();
        session.get_type_definition("cmis:folder", false).unwrap();
        session.get_type_definition("cmis:folder", false).unwrap();
        assert_eq!(binding.type_definition_calls(), 2);
        // The forced refresh still stored the definition.
        session.get_type_definition("cmis:folder", true).unwrap();
        assert_eq!(binding.type_definition_calls(), 2);
    }

    #[test]
    fn unknown_type_is_not_found() {
        let session = session();
        let err = session.get_type_definition("x:missing", true).unwrap_err();
        assert!(matches!(err, ClientError::ObjectNotFound(_)));
    }

    #[test]
    fn type_children_and_descendants() {
        let session = session();
        let bases = session.get_type_children(None, true).unwrap();
        assert_eq!(bases.len(), 5);

        let trees = session.get_type_descendants(None, -1, false).unwrap();
        assert_eq!(trees.len(), 5);
        assert!(matches!(
            session.get_type_descendants(None, 0, false).unwrap_err(),
            ClientError::Binding(BindingError::InvalidArgument(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Mutation and invalidation
    // -----------------------------------------------------------------------

    #[test]
    fn update_properties_invalidates_the_cache_entry() {
        let session = session();
        let id = create_doc(&session, "before");
        session.get_object(&id).unwrap();

        let mut changes = Properties::new();
        changes.put(property_ids::NAME, PropertyValue::String("after".into()));
        session.update_properties(&id, None, &changes).unwrap();

        let fresh = session.get_object(&id).unwrap();
        assert_eq!(fresh.name(), Some("after"));
    }

    #[test]
    fn delete_invalidates_the_cache_entry() {
        let session = session();
        let id = create_doc(&session, "doomed");
        session.get_object(&id).unwrap();
        session.delete(&id, true).unwrap();
        let err = session.get_object(&id).unwrap_err();
        assert!(matches!(err, ClientError::ObjectNotFound(_)));
    }

    #[test]
    fn content_stream_roundtrip() {
        let session = session();
        let content =
            ContentStream::from_bytes(Some("a.txt".into()), "text/plain", b"payload".to_vec());
        let id = session
            .create_document(
                &doc_properties("a.txt"),
                Some(&root()),
                Some(content),
                VersioningState::None,
                &[],
                &[],
                &[],
            )
            .unwrap();
        let stream = session
            .get_content_stream(&id, None, None, None)
            .unwrap()
            .unwrap();
        assert_eq!(stream.read_all().unwrap(), b"payload");

        let empty = create_doc(&session, "empty");
        assert!(session
            .get_content_stream(&empty, None, None, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn latest_document_version_is_the_document() {
        let session = session();
        let id = create_doc(&session, "versioned");
        let doc = session
            .get_latest_document_version(&id, false, &OperationContext::default())
            .unwrap();
        assert_eq!(doc.core.id, id);
    }

    // -----------------------------------------------------------------------
    // ACLs and policies
    // -----------------------------------------------------------------------

    #[test]
    fn acl_apply_and_invalidate() {
        let session = session();
        let id = create_doc(&session, "secured");
        let ctx = OperationContext::default().with_include_acls(true);
        let before = session.get_object_with_context(&id, &ctx).unwrap();
        assert!(before.acl().unwrap().is_empty());

        session
            .apply_acl(
                &id,
                &[Ace::new("alice", vec!["cmis:read".into()])],
                &[],
                AclPropagation::RepositoryDetermined,
            )
            .unwrap();

        let after = session.get_object_with_context(&id, &ctx).unwrap();
        assert_eq!(after.acl().unwrap().aces.len(), 1);
        assert_eq!(session.get_acl(&id, false).unwrap().aces.len(), 1);
    }

    #[test]
    fn set_acl_replaces_the_whole_list() {
        let session = session();
        let id = create_doc(&session, "replaced");
        session
            .apply_acl(
                &id,
                &[
                    Ace::new("alice", vec!["cmis:read".into()]),
                    Ace::new("bob", vec!["cmis:write".into()]),
                ],
                &[],
                AclPropagation::RepositoryDetermined,
            )
            .unwrap();

        let acl = session
            .set_acl(&id, &[Ace::new("carol", vec!["cmis:all".into()])])
            .unwrap();
        assert_eq!(acl.aces.len(), 1);
        assert_eq!(acl.aces[0].principal_id, "carol");
    }

    #[test]
    fn policies_apply_and_remove() {
        let session = session();
        let mut policy_props = Properties::new();
        policy_props.put(property_ids::NAME, PropertyValue::String("retention".into()));
        policy_props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:policy".into()),
        );
        let policy_id = session
            .create_policy(&policy_props, &root(), &[], &[], &[])
            .unwrap();
        let doc = create_doc(&session, "governed");

        session
            .apply_policies(&doc, &[policy_id.as_str().to_string()])
            .unwrap();
        let ctx = OperationContext::default().with_include_policies(true);
        let governed = session.get_object_with_context(&doc, &ctx).unwrap();
        assert_eq!(governed.core().policy_ids, vec![policy_id.as_str().to_string()]);

        session
            .remove_policies(&doc, &[policy_id.as_str().to_string()])
            .unwrap();
        let released = session.get_object_with_context(&doc, &ctx).unwrap();
        assert!(released.core().policy_ids.is_empty());

        assert!(matches!(
            session.apply_policies(&doc, &[]).unwrap_err(),
            ClientError::InvalidArgument(_)
        ));
    }

    #[test]
    fn failed_policy_apply_still_invalidates_the_cache_entry() {
        let session = session();
        let mut policy_props = Properties::new();
        policy_props.put(property_ids::NAME, PropertyValue::String("retention".into()));
        policy_props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:policy".into()),
        );
        let policy_id = session
            .create_policy(&policy_props, &root(), &[], &[], &[])
            .unwrap();
        let doc = create_doc(&session, "half-governed");

        let ctx = OperationContext::default().with_include_policies(true);
        session.get_object_with_context(&doc, &ctx).unwrap();

        let err = session
            .apply_policies(&doc, &[policy_id.as_str().to_string(), "ghost".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Binding(BindingError::ObjectNotFound(_))
        ));

        // The first policy landed; the cached copy must not hide it.
        let seen = session.get_object_with_context(&doc, &ctx).unwrap();
        assert_eq!(seen.core().policy_ids, vec![policy_id.as_str().to_string()]);
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    #[test]
    fn query_returns_rows() {
        let session = session();
        create_doc(&session, "one");
        create_doc(&session, "two");
        let results = session
            .query(
                "SELECT * FROM cmis:document",
                false,
                &OperationContext::default(),
            )
            .unwrap();
        assert_eq!(results.num_items, Some(2));
        assert!(results.iter().all(|row| row.object_id().is_some()));
    }

    #[test]
    fn query_rejects_empty_statement() {
        let session = session();
        assert!(matches!(
            session
                .query("  ", false, &OperationContext::default())
                .unwrap_err(),
            ClientError::InvalidArgument(_)
        ));
    }

    #[test]
    fn query_objects_converts_rows() {
        let session = session();
        create_doc(&session, "converted");
        let objects = session
            .query_objects("cmis:document", None, false, &OperationContext::default())
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].is_document());
    }

    #[test]
    fn content_changes_and_latest_token() {
        let session = session();
        let id = create_doc(&session, "tracked");
        session.delete(&id, true).unwrap();

        let changes = session
            .get_content_changes(None, true, false, false, None)
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.events[0].change_type, ChangeType::Created);
        assert_eq!(changes.events[1].change_type, ChangeType::Deleted);
        assert_eq!(changes.events[1].object_id, id);

        let token = session.get_latest_change_log_token().unwrap();
        assert_eq!(token, changes.latest_change_log_token);
        // Construction-time info does not track the log.
        assert_eq!(session.repository_info().latest_change_log_token, None);
    }

    #[test]
    fn relationship_fetch_honors_include_flag() {
        let session = session();
        let a = create_doc(&session, "a");
        let b = create_doc(&session, "b");
        let mut props = Properties::new();
        props.put(property_ids::NAME, PropertyValue::String("rel".into()));
        props.put(
            property_ids::OBJECT_TYPE_ID,
            PropertyValue::Id("cmis:relationship".into()),
        );
        props.put(property_ids::SOURCE_ID, PropertyValue::Id(a.as_str().into()));
        props.put(property_ids::TARGET_ID, PropertyValue::Id(b.as_str().into()));
        session.create_relationship(&props, &[], &[], &[]).unwrap();

        let ctx = OperationContext::default()
            .with_include_relationships(IncludeRelationships::Both)
            .with_cache_enabled(false);
        let with_rels = session.get_object_with_context(&a, &ctx).unwrap();
        assert_eq!(with_rels.core().relationships.len(), 1);

        let without = session.get_object(&a).unwrap();
        assert!(without.core().relationships.is_empty());
    }
}

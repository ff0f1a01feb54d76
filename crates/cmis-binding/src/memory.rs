use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use cmis_types::{
    property_ids, Ace, Acl, AclPropagation, Action, AllowableActions, BaseTypeId, ChangeInfo,
    ChangeType, ContentStream, IncludeRelationships, ObjectData, ObjectId, Properties,
    PropertyDefinition, PropertyType, PropertyValue, RelationshipDirection, RepositoryInfo,
    TypeDefinition, TypeDefinitionTree, VersioningState,
};

use crate::binding::{Binding, TypeDefinitionCache};
use crate::error::{BindingError, BindingResult};
use crate::services::{
    AclService, ChangeList, DiscoveryService, ObjectList, ObjectService, PolicyService,
    RelationshipService, RepositoryService,
};

/// Fixed id of the root folder in an in-memory repository.
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Clone)]
struct StoredContent {
    file_name: Option<String>,
    mime_type: String,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct Entry {
    data: ObjectData,
    parent_id: Option<String>,
    content: Option<StoredContent>,
}

struct ChangeRecord {
    seq: u64,
    change_type: ChangeType,
    object_id: String,
    time: DateTime<Utc>,
    properties: Properties,
}

struct RepoState {
    info: RepositoryInfo,
    types: BTreeMap<String, TypeDefinition>,
    entries: HashMap<String, Entry>,
    change_log: Vec<ChangeRecord>,
    next_change_seq: u64,
}

/// Self-contained single-repository binding, entirely in process.
///
/// Implements all six service façades over `RwLock` state. Intended for
/// tests and embedding: it enforces the same fault taxonomy a transport
/// binding surfaces (not-found, constraint, invalid-argument), keeps a
/// change log, and counts `get_object`/`type_definition` calls so cache
/// behavior can be asserted from the outside.
pub struct InMemoryBinding {
    repository_id: String,
    state: RwLock<RepoState>,
    type_definition_cache: Option<TypeDefinitionCache>,
    get_object_calls: AtomicU64,
    type_definition_calls: AtomicU64,
}

impl InMemoryBinding {
    /// Create a repository seeded with the five base types and a root folder.
    pub fn new(repository_id: &str) -> Self {
        let mut types = BTreeMap::new();
        for def in [
            document_type(),
            folder_type(),
            relationship_type(),
            TypeDefinition::base(BaseTypeId::Policy),
            TypeDefinition::base(BaseTypeId::Item),
        ] {
            types.insert(def.id.clone(), def);
        }

        let mut info = RepositoryInfo::new(repository_id, ObjectId::new(ROOT_FOLDER_ID));
        info.product_name = "cmis-binding in-memory repository".to_string();
        info.capabilities.query = true;
        info.capabilities.changes = true;
        info.capabilities.acl_manageable = true;

        let mut entries = HashMap::new();
        entries.insert(ROOT_FOLDER_ID.to_string(), root_folder_entry());

        Self {
            repository_id: repository_id.to_string(),
            state: RwLock::new(RepoState {
                info,
                types,
                entries,
                change_log: Vec::new(),
                next_change_seq: 1,
            }),
            type_definition_cache: None,
            get_object_calls: AtomicU64::new(0),
            type_definition_calls: AtomicU64::new(0),
        }
    }

    /// Attach the shared type-definition cache the session hands to the
    /// binding at construction. Internal type lookups populate it.
    pub fn with_type_definition_cache(mut self, cache: TypeDefinitionCache) -> Self {
        self.type_definition_cache = Some(cache);
        self
    }

    /// Register a custom type. The parent type must already exist.
    pub fn register_type(&self, definition: TypeDefinition) -> BindingResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(parent) = &definition.parent_type_id {
            if !state.types.contains_key(parent) {
                return Err(BindingError::invalid(format!(
                    "parent type does not exist: {parent}"
                )));
            }
        }
        state.types.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Toggle the unfiling capability (documents outside any folder).
    pub fn set_unfiling(&self, unfiling: bool) {
        let mut state = self.state.write().expect("lock poisoned");
        state.info.capabilities.unfiling = unfiling;
    }

    /// Number of `ObjectService::get_object` calls answered so far.
    pub fn get_object_calls(&self) -> u64 {
        self.get_object_calls.load(Ordering::Relaxed)
    }

    /// Number of `RepositoryService::type_definition` calls answered so far.
    pub fn type_definition_calls(&self) -> u64 {
        self.type_definition_calls.load(Ordering::Relaxed)
    }

    /// Number of objects currently stored, root folder included.
    pub fn object_count(&self) -> usize {
        self.state.read().expect("lock poisoned").entries.len()
    }

    fn check_repository(&self, repository_id: &str) -> BindingResult<()> {
        if repository_id == self.repository_id {
            Ok(())
        } else {
            Err(BindingError::not_found(format!(
                "repository: {repository_id}"
            )))
        }
    }

    fn create_entry(
        &self,
        properties: &Properties,
        expected_base: BaseTypeId,
        folder_id: Option<&ObjectId>,
        content: Option<StoredContent>,
    ) -> BindingResult<ObjectId> {
        let mut state = self.state.write().expect("lock poisoned");

        let type_id = properties
            .get_string(property_ids::OBJECT_TYPE_ID)
            .ok_or_else(|| BindingError::invalid("cmis:objectTypeId is required"))?
            .to_string();
        let type_def = state
            .types
            .get(&type_id)
            .ok_or_else(|| BindingError::invalid(format!("unknown type: {type_id}")))?
            .clone();
        if type_def.base_type_id != expected_base {
            return Err(BindingError::constraint(format!(
                "type {type_id} has base {}, expected {}",
                type_def.base_type_id, expected_base
            )));
        }
        if !type_def.creatable {
            return Err(BindingError::constraint(format!(
                "type is not creatable: {type_id}"
            )));
        }

        let name = properties
            .get_string(property_ids::NAME)
            .ok_or_else(|| BindingError::invalid("cmis:name is required"))?
            .to_string();

        let parent_id = match folder_id {
            Some(folder) => {
                let parent = state
                    .entries
                    .get(folder.as_str())
                    .ok_or_else(|| BindingError::not_found(folder.as_str()))?;
                if parent.data.base_type_id() != Some(BaseTypeId::Folder) {
                    return Err(BindingError::invalid(format!(
                        "parent is not a folder: {folder}"
                    )));
                }
                if !type_def.fileable {
                    return Err(BindingError::constraint(format!(
                        "type is not fileable: {type_id}"
                    )));
                }
                Some(folder.as_str().to_string())
            }
            None => {
                // Relationships are never filed; everything else needs the
                // unfiling capability to float free.
                if expected_base != BaseTypeId::Relationship
                    && !state.info.capabilities.unfiling
                {
                    return Err(BindingError::constraint(
                        "repository does not support unfiled objects",
                    ));
                }
                None
            }
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut full = properties.clone();
        full.put(property_ids::OBJECT_ID, PropertyValue::Id(id.clone()));
        full.put(
            property_ids::BASE_TYPE_ID,
            PropertyValue::Id(expected_base.as_str().to_string()),
        );
        full.put(property_ids::CREATION_DATE, PropertyValue::DateTime(now));
        full.put(
            property_ids::LAST_MODIFICATION_DATE,
            PropertyValue::DateTime(now),
        );
        full.put(property_ids::CHANGE_TOKEN, PropertyValue::String("0".into()));
        if expected_base == BaseTypeId::Folder {
            let parent_path = parent_id
                .as_deref()
                .and_then(|p| state.entries.get(p))
                .and_then(|e| e.data.properties.get_string(property_ids::PATH))
                .unwrap_or("/")
                .to_string();
            let path = if parent_path == "/" {
                format!("/{name}")
            } else {
                format!("{parent_path}/{name}")
            };
            full.put(property_ids::PATH, PropertyValue::String(path));
            if let Some(parent) = &parent_id {
                full.put(property_ids::PARENT_ID, PropertyValue::Id(parent.clone()));
            }
        }
        if let Some(stored) = &content {
            full.put(
                property_ids::CONTENT_STREAM_LENGTH,
                PropertyValue::Integer(stored.bytes.len() as i64),
            );
            full.put(
                property_ids::CONTENT_STREAM_MIME_TYPE,
                PropertyValue::String(stored.mime_type.clone()),
            );
            if let Some(file_name) = &stored.file_name {
                full.put(
                    property_ids::CONTENT_STREAM_FILE_NAME,
                    PropertyValue::String(file_name.clone()),
                );
            }
        }

        let data = ObjectData {
            properties: full.clone(),
            acl: Some(Acl::default()),
            ..ObjectData::default()
        };
        state.entries.insert(
            id.clone(),
            Entry {
                data,
                parent_id,
                content,
            },
        );
        log_change(&mut state, ChangeType::Created, &id, full);
        debug!(object_id = %id, type_id = %type_id, "object created");
        Ok(ObjectId::new(id))
    }

    fn project(
        state: &RepoState,
        entry: &Entry,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> ObjectData {
        let id = entry
            .data
            .properties
            .get_string(property_ids::OBJECT_ID)
            .unwrap_or_default()
            .to_string();

        let properties = match filter {
            None | Some("*") => entry.data.properties.clone(),
            Some(list) => {
                let wanted: Vec<&str> = list.split(',').map(str::trim).collect();
                entry
                    .data
                    .properties
                    .iter()
                    .filter(|(pid, _)| {
                        wanted.contains(&pid.as_str()) || is_identity_property(pid)
                    })
                    .map(|(pid, value)| (pid.clone(), value.clone()))
                    .collect()
            }
        };

        let relationships = match include_relationships {
            IncludeRelationships::None => Vec::new(),
            direction => state
                .entries
                .values()
                .filter(|candidate| {
                    candidate.data.base_type_id() == Some(BaseTypeId::Relationship)
                        && relationship_matches(candidate, &id, direction)
                })
                .map(|rel| ObjectData::with_properties(rel.data.properties.clone()))
                .collect(),
        };

        ObjectData {
            properties,
            allowable_actions: include_allowable_actions
                .then(|| compute_allowable_actions(entry)),
            acl: include_acl.then(|| entry.data.acl.clone().unwrap_or_default()),
            is_exact_acl: include_acl.then_some(true),
            policy_ids: if include_policy_ids {
                entry.data.policy_ids.clone()
            } else {
                Vec::new()
            },
            relationships,
            change_info: None,
            path_segment: entry
                .data
                .properties
                .get_string(property_ids::NAME)
                .map(str::to_string),
        }
    }

    fn resolve_path(state: &RepoState, path: &str) -> Option<String> {
        if !path.starts_with('/') {
            return None;
        }
        let mut current = ROOT_FOLDER_ID.to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let child = state.entries.iter().find(|(_, entry)| {
                entry.parent_id.as_deref() == Some(current.as_str())
                    && entry.data.properties.get_string(property_ids::NAME) == Some(segment)
            })?;
            current = child.0.clone();
        }
        Some(current)
    }

    /// All type ids with `type_id` in their ancestry, `type_id` included.
    fn subtype_ids(state: &RepoState, type_id: &str) -> Vec<String> {
        let mut result = vec![type_id.to_string()];
        let mut frontier = vec![type_id.to_string()];
        while let Some(current) = frontier.pop() {
            for def in state.types.values() {
                if def.parent_type_id.as_deref() == Some(current.as_str()) {
                    result.push(def.id.clone());
                    frontier.push(def.id.clone());
                }
            }
        }
        result
    }
}

fn is_identity_property(id: &str) -> bool {
    id == property_ids::OBJECT_ID
        || id == property_ids::BASE_TYPE_ID
        || id == property_ids::OBJECT_TYPE_ID
}

fn relationship_matches(entry: &Entry, object_id: &str, direction: IncludeRelationships) -> bool {
    let source = entry.data.properties.get_string(property_ids::SOURCE_ID);
    let target = entry.data.properties.get_string(property_ids::TARGET_ID);
    match direction {
        IncludeRelationships::None => false,
        IncludeRelationships::Source => source == Some(object_id),
        IncludeRelationships::Target => target == Some(object_id),
        IncludeRelationships::Both => source == Some(object_id) || target == Some(object_id),
    }
}

fn compute_allowable_actions(entry: &Entry) -> AllowableActions {
    let mut actions = vec![
        Action::CanGetProperties,
        Action::CanUpdateProperties,
        Action::CanDeleteObject,
        Action::CanGetAcl,
        Action::CanApplyAcl,
        Action::CanApplyPolicy,
        Action::CanRemovePolicy,
        Action::CanGetObjectRelationships,
    ];
    match entry.data.base_type_id() {
        Some(BaseTypeId::Document) => {
            actions.push(Action::CanSetContentStream);
            if entry.content.is_some() {
                actions.push(Action::CanGetContentStream);
                actions.push(Action::CanDeleteContentStream);
            }
        }
        Some(BaseTypeId::Folder) => {
            actions.push(Action::CanGetChildren);
            actions.push(Action::CanCreateDocument);
            actions.push(Action::CanCreateFolder);
            if entry.parent_id.is_some() {
                actions.push(Action::CanGetFolderParent);
            }
        }
        _ => {}
    }
    AllowableActions::new(actions)
}

fn log_change(state: &mut RepoState, change_type: ChangeType, object_id: &str, properties: Properties) {
    let seq = state.next_change_seq;
    state.next_change_seq += 1;
    state.change_log.push(ChangeRecord {
        seq,
        change_type,
        object_id: object_id.to_string(),
        time: Utc::now(),
        properties,
    });
    state.info.latest_change_log_token = Some(state.next_change_seq.to_string());
}

fn root_folder_entry() -> Entry {
    let mut props = Properties::new();
    props.put(property_ids::OBJECT_ID, PropertyValue::Id(ROOT_FOLDER_ID.into()));
    props.put(
        property_ids::BASE_TYPE_ID,
        PropertyValue::Id(BaseTypeId::Folder.as_str().into()),
    );
    props.put(
        property_ids::OBJECT_TYPE_ID,
        PropertyValue::Id(BaseTypeId::Folder.as_str().into()),
    );
    props.put(property_ids::NAME, PropertyValue::String(String::new()));
    props.put(property_ids::PATH, PropertyValue::String("/".into()));
    props.put(property_ids::CREATION_DATE, PropertyValue::DateTime(Utc::now()));
    props.put(property_ids::CHANGE_TOKEN, PropertyValue::String("0".into()));
    Entry {
        data: ObjectData {
            properties: props,
            acl: Some(Acl::default()),
            ..ObjectData::default()
        },
        parent_id: None,
        content: None,
    }
}

fn document_type() -> TypeDefinition {
    let mut def = TypeDefinition::base(BaseTypeId::Document);
    for (id, ptype) in [
        (property_ids::CONTENT_STREAM_LENGTH, PropertyType::Integer),
        (property_ids::CONTENT_STREAM_MIME_TYPE, PropertyType::String),
        (property_ids::CONTENT_STREAM_FILE_NAME, PropertyType::String),
        (property_ids::VERSION_LABEL, PropertyType::String),
        (property_ids::VERSION_SERIES_ID, PropertyType::Id),
    ] {
        def.add_property_definition(PropertyDefinition::new(id, ptype).read_only());
    }
    def
}

fn folder_type() -> TypeDefinition {
    let mut def = TypeDefinition::base(BaseTypeId::Folder);
    def.add_property_definition(
        PropertyDefinition::new(property_ids::PARENT_ID, PropertyType::Id).read_only(),
    );
    def.add_property_definition(
        PropertyDefinition::new(property_ids::PATH, PropertyType::String).read_only(),
    );
    def
}

fn relationship_type() -> TypeDefinition {
    let mut def = TypeDefinition::base(BaseTypeId::Relationship);
    def.add_property_definition(
        PropertyDefinition::new(property_ids::SOURCE_ID, PropertyType::Id).required(),
    );
    def.add_property_definition(
        PropertyDefinition::new(property_ids::TARGET_ID, PropertyType::Id).required(),
    );
    def
}

impl Binding for InMemoryBinding {
    fn repository_service(&self) -> &dyn RepositoryService {
        self
    }

    fn object_service(&self) -> &dyn ObjectService {
        self
    }

    fn acl_service(&self) -> &dyn AclService {
        self
    }

    fn policy_service(&self) -> &dyn PolicyService {
        self
    }

    fn relationship_service(&self) -> &dyn RelationshipService {
        self
    }

    fn discovery_service(&self) -> &dyn DiscoveryService {
        self
    }

    fn clear_all_caches(&self) {
        if let Some(cache) = &self.type_definition_cache {
            cache.clear();
        }
    }
}

impl RepositoryService for InMemoryBinding {
    fn repository_info(&self, repository_id: &str) -> BindingResult<RepositoryInfo> {
        self.check_repository(repository_id)?;
        Ok(self.state.read().expect("lock poisoned").info.clone())
    }

    fn type_definition(
        &self,
        repository_id: &str,
        type_id: &str,
    ) -> BindingResult<Option<TypeDefinition>> {
        self.check_repository(repository_id)?;
        self.type_definition_calls.fetch_add(1, Ordering::Relaxed);
        let definition = self
            .state
            .read()
            .expect("lock poisoned")
            .types
            .get(type_id)
            .cloned();
        // Internal lookups feed the cache the session shares with us.
        if let (Some(cache), Some(def)) = (&self.type_definition_cache, &definition) {
            cache.put(type_id.to_string(), def.clone());
        }
        Ok(definition)
    }

    fn type_children(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        include_property_definitions: bool,
        max_items: Option<u32>,
        skip_count: u32,
    ) -> BindingResult<Vec<TypeDefinition>> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        if let Some(parent) = type_id {
            if !state.types.contains_key(parent) {
                return Err(BindingError::not_found(format!("type: {parent}")));
            }
        }
        let mut children: Vec<TypeDefinition> = state
            .types
            .values()
            .filter(|def| def.parent_type_id.as_deref() == type_id)
            .cloned()
            .collect();
        children = children
            .into_iter()
            .skip(skip_count as usize)
            .take(max_items.map(|m| m as usize).unwrap_or(usize::MAX))
            .collect();
        if !include_property_definitions {
            for def in &mut children {
                def.property_definitions.clear();
            }
        }
        Ok(children)
    }

    fn type_descendants(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        depth: i32,
        include_property_definitions: bool,
    ) -> BindingResult<Vec<TypeDefinitionTree>> {
        self.check_repository(repository_id)?;
        if depth == 0 || depth < -1 {
            return Err(BindingError::invalid(
                "depth must be positive or -1 for unbounded",
            ));
        }
        let state = self.state.read().expect("lock poisoned");
        if let Some(root) = type_id {
            if !state.types.contains_key(root) {
                return Err(BindingError::not_found(format!("type: {root}")));
            }
        }

        fn build(
            state: &RepoState,
            parent: Option<&str>,
            depth: i32,
            include_defs: bool,
        ) -> Vec<TypeDefinitionTree> {
            if depth == 0 {
                return Vec::new();
            }
            let next_depth = if depth == -1 { -1 } else { depth - 1 };
            state
                .types
                .values()
                .filter(|def| def.parent_type_id.as_deref() == parent)
                .map(|def| {
                    let mut definition = def.clone();
                    if !include_defs {
                        definition.property_definitions.clear();
                    }
                    TypeDefinitionTree {
                        children: build(state, Some(&def.id), next_depth, include_defs),
                        definition,
                    }
                })
                .collect()
        }

        Ok(build(&state, type_id, depth, include_property_definitions))
    }
}

impl ObjectService for InMemoryBinding {
    fn create_document(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        content: Option<ContentStream>,
        _versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let stored = match content {
            Some(stream) => {
                let file_name = stream.file_name.clone();
                let mime_type = stream.mime_type.clone();
                let bytes = stream
                    .read_all()
                    .map_err(|e| BindingError::Storage(e.to_string()))?;
                Some(StoredContent {
                    file_name,
                    mime_type,
                    bytes,
                })
            }
            None => None,
        };
        let id = self.create_entry(properties, BaseTypeId::Document, folder_id, stored)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn create_document_from_source(
        &self,
        repository_id: &str,
        source_id: &ObjectId,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        _versioning_state: VersioningState,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let (mut merged, content) = {
            let state = self.state.read().expect("lock poisoned");
            let source = state
                .entries
                .get(source_id.as_str())
                .ok_or_else(|| BindingError::not_found(source_id.as_str()))?;
            if source.data.base_type_id() != Some(BaseTypeId::Document) {
                return Err(BindingError::invalid(format!(
                    "source is not a document: {source_id}"
                )));
            }
            (source.data.properties.clone(), source.content.clone())
        };
        for (pid, value) in properties.iter() {
            merged.put(pid.clone(), value.clone());
        }
        merged.remove(property_ids::OBJECT_ID);
        let id = self.create_entry(&merged, BaseTypeId::Document, folder_id, content)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn create_folder(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let id = self.create_entry(properties, BaseTypeId::Folder, Some(folder_id), None)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn create_item(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let id = self.create_entry(properties, BaseTypeId::Item, folder_id, None)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn create_policy(
        &self,
        repository_id: &str,
        properties: &Properties,
        folder_id: Option<&ObjectId>,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let id = self.create_entry(properties, BaseTypeId::Policy, folder_id, None)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn create_relationship(
        &self,
        repository_id: &str,
        properties: &Properties,
        policies: &[String],
        add_aces: &[Ace],
        _remove_aces: &[Ace],
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        for required in [property_ids::SOURCE_ID, property_ids::TARGET_ID] {
            if properties.get_string(required).is_none() {
                return Err(BindingError::invalid(format!("{required} is required")));
            }
        }
        let id = self.create_entry(properties, BaseTypeId::Relationship, None, None)?;
        self.attach_initial_state(&id, policies, add_aces)?;
        Ok(id)
    }

    fn get_object(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        _rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>> {
        self.check_repository(repository_id)?;
        self.get_object_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read().expect("lock poisoned");
        Ok(state.entries.get(object_id.as_str()).map(|entry| {
            Self::project(
                &state,
                entry,
                filter,
                include_allowable_actions,
                include_relationships,
                include_policy_ids,
                include_acl,
            )
        }))
    }

    fn get_object_by_path(
        &self,
        repository_id: &str,
        path: &str,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        _rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        let Some(id) = Self::resolve_path(&state, path) else {
            return Ok(None);
        };
        Ok(state.entries.get(&id).map(|entry| {
            Self::project(
                &state,
                entry,
                filter,
                include_allowable_actions,
                include_relationships,
                include_policy_ids,
                include_acl,
            )
        }))
    }

    fn get_object_of_latest_version(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        _major: bool,
        filter: Option<&str>,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        rendition_filter: &str,
        include_policy_ids: bool,
        include_acl: bool,
    ) -> BindingResult<Option<ObjectData>> {
        // No version series in the in-memory backend: every document is its
        // own latest (and latest major) version.
        self.get_object(
            repository_id,
            object_id,
            filter,
            include_allowable_actions,
            include_relationships,
            rendition_filter,
            include_policy_ids,
            include_acl,
        )
    }

    fn content_stream(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        _stream_id: Option<&str>,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> BindingResult<Option<ContentStream>> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        let entry = state
            .entries
            .get(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        let Some(stored) = &entry.content else {
            return Ok(None);
        };
        let start = offset.unwrap_or(0).min(stored.bytes.len() as u64) as usize;
        let end = match length {
            Some(len) => (start + len as usize).min(stored.bytes.len()),
            None => stored.bytes.len(),
        };
        Ok(Some(ContentStream::from_bytes(
            stored.file_name.clone(),
            stored.mime_type.clone(),
            stored.bytes[start..end].to_vec(),
        )))
    }

    fn update_properties(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        change_token: Option<&str>,
        properties: &Properties,
    ) -> BindingResult<ObjectId> {
        self.check_repository(repository_id)?;
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state
            .entries
            .get_mut(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;

        let current_token = entry
            .data
            .properties
            .get_string(property_ids::CHANGE_TOKEN)
            .unwrap_or("0")
            .to_string();
        if let Some(token) = change_token {
            if token != current_token {
                return Err(BindingError::constraint(format!(
                    "change token mismatch for {object_id}"
                )));
            }
        }

        for (pid, value) in properties.iter() {
            if is_identity_property(pid) {
                return Err(BindingError::invalid(format!(
                    "property is read-only: {pid}"
                )));
            }
            entry.data.properties.put(pid.clone(), value.clone());
        }
        let next_token = current_token.parse::<u64>().unwrap_or(0) + 1;
        entry.data.properties.put(
            property_ids::CHANGE_TOKEN,
            PropertyValue::String(next_token.to_string()),
        );
        entry.data.properties.put(
            property_ids::LAST_MODIFICATION_DATE,
            PropertyValue::DateTime(Utc::now()),
        );
        let snapshot = entry.data.properties.clone();
        log_change(&mut state, ChangeType::Updated, object_id.as_str(), snapshot);
        Ok(object_id.clone())
    }

    fn delete_object(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        _all_versions: bool,
    ) -> BindingResult<()> {
        self.check_repository(repository_id)?;
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state
            .entries
            .get(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        if entry.data.base_type_id() == Some(BaseTypeId::Folder) {
            if object_id.as_str() == ROOT_FOLDER_ID {
                return Err(BindingError::constraint("cannot delete the root folder"));
            }
            let has_children = state
                .entries
                .values()
                .any(|e| e.parent_id.as_deref() == Some(object_id.as_str()));
            if has_children {
                return Err(BindingError::constraint(format!(
                    "folder is not empty: {object_id}"
                )));
            }
        }
        let removed = state.entries.remove(object_id.as_str());
        if let Some(entry) = removed {
            let snapshot = entry.data.properties;
            log_change(&mut state, ChangeType::Deleted, object_id.as_str(), snapshot);
        }
        Ok(())
    }
}

impl InMemoryBinding {
    fn attach_initial_state(
        &self,
        object_id: &ObjectId,
        policies: &[String],
        add_aces: &[Ace],
    ) -> BindingResult<()> {
        if policies.is_empty() && add_aces.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state
            .entries
            .get_mut(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        for policy in policies {
            if !entry.data.policy_ids.contains(policy) {
                entry.data.policy_ids.push(policy.clone());
            }
        }
        if !add_aces.is_empty() {
            let acl = entry.data.acl.get_or_insert_with(Acl::default);
            acl.aces.extend(add_aces.iter().cloned());
            acl.is_exact = true;
        }
        Ok(())
    }
}

impl AclService for InMemoryBinding {
    fn acl(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        _only_basic_permissions: bool,
    ) -> BindingResult<Acl> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        let entry = state
            .entries
            .get(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        Ok(entry.data.acl.clone().unwrap_or_default())
    }

    fn apply_acl(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        add_aces: &[Ace],
        remove_aces: &[Ace],
        _propagation: AclPropagation,
    ) -> BindingResult<Acl> {
        self.check_repository(repository_id)?;
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state
            .entries
            .get_mut(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        let acl = entry.data.acl.get_or_insert_with(Acl::default);
        acl.aces.retain(|ace| {
            !remove_aces.iter().any(|removed| {
                removed.principal_id == ace.principal_id && removed.permissions == ace.permissions
            })
        });
        acl.aces.extend(add_aces.iter().cloned());
        let result = acl.clone();
        let snapshot = entry.data.properties.clone();
        log_change(&mut state, ChangeType::Security, object_id.as_str(), snapshot);
        Ok(result)
    }
}

impl PolicyService for InMemoryBinding {
    fn apply_policy(
        &self,
        repository_id: &str,
        policy_id: &ObjectId,
        object_id: &ObjectId,
    ) -> BindingResult<()> {
        self.check_repository(repository_id)?;
        let mut state = self.state.write().expect("lock poisoned");
        let policy_base = state
            .entries
            .get(policy_id.as_str())
            .ok_or_else(|| BindingError::not_found(policy_id.as_str()))?
            .data
            .base_type_id();
        if policy_base != Some(BaseTypeId::Policy) {
            return Err(BindingError::invalid(format!(
                "not a policy: {policy_id}"
            )));
        }
        let entry = state
            .entries
            .get_mut(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        let id = policy_id.as_str().to_string();
        if !entry.data.policy_ids.contains(&id) {
            entry.data.policy_ids.push(id);
        }
        Ok(())
    }

    fn remove_policy(
        &self,
        repository_id: &str,
        policy_id: &ObjectId,
        object_id: &ObjectId,
    ) -> BindingResult<()> {
        self.check_repository(repository_id)?;
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state
            .entries
            .get_mut(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        entry.data.policy_ids.retain(|id| id != policy_id.as_str());
        Ok(())
    }

    fn applied_policies(
        &self,
        repository_id: &str,
        object_id: &ObjectId,
        filter: Option<&str>,
    ) -> BindingResult<Vec<ObjectData>> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        let entry = state
            .entries
            .get(object_id.as_str())
            .ok_or_else(|| BindingError::not_found(object_id.as_str()))?;
        Ok(entry
            .data
            .policy_ids
            .iter()
            .filter_map(|policy_id| state.entries.get(policy_id))
            .map(|policy| {
                Self::project(
                    &state,
                    policy,
                    filter,
                    false,
                    IncludeRelationships::None,
                    false,
                    false,
                )
            })
            .collect())
    }
}

impl RelationshipService for InMemoryBinding {
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
    ) -> BindingResult<ObjectList> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        if !state.entries.contains_key(object_id.as_str()) {
            return Err(BindingError::not_found(object_id.as_str()));
        }
        let accepted_types: Option<Vec<String>> = type_id.map(|tid| {
            if include_sub_relationship_types {
                Self::subtype_ids(&state, tid)
            } else {
                vec![tid.to_string()]
            }
        });
        let wanted_direction = match direction {
            RelationshipDirection::Source => IncludeRelationships::Source,
            RelationshipDirection::Target => IncludeRelationships::Target,
            RelationshipDirection::Either => IncludeRelationships::Both,
        };

        let matches: Vec<&Entry> = state
            .entries
            .values()
            .filter(|entry| {
                entry.data.base_type_id() == Some(BaseTypeId::Relationship)
                    && relationship_matches(entry, object_id.as_str(), wanted_direction)
                    && accepted_types.as_ref().map_or(true, |types| {
                        entry
                            .data
                            .object_type_id()
                            .map(|tid| types.iter().any(|t| t == tid))
                            .unwrap_or(false)
                    })
            })
            .collect();

        let total = matches.len() as u64;
        let page: Vec<ObjectData> = matches
            .into_iter()
            .skip(skip_count as usize)
            .take(max_items.map(|m| m as usize).unwrap_or(usize::MAX))
            .map(|entry| {
                Self::project(
                    &state,
                    entry,
                    filter,
                    include_allowable_actions,
                    IncludeRelationships::None,
                    false,
                    false,
                )
            })
            .collect();
        let has_more = (skip_count as u64 + page.len() as u64) < total;
        Ok(ObjectList {
            objects: page,
            has_more_items: has_more,
            num_items: Some(total),
        })
    }
}

impl DiscoveryService for InMemoryBinding {
    fn query(
        &self,
        repository_id: &str,
        statement: &str,
        _search_all_versions: bool,
        include_allowable_actions: bool,
        include_relationships: IncludeRelationships,
        _rendition_filter: &str,
        max_items: Option<u32>,
        skip_count: u32,
    ) -> BindingResult<ObjectList> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");

        // Minimal statement support: `SELECT <anything> FROM <queryName>`.
        // Real query planning belongs to a real repository.
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let from_pos = tokens
            .iter()
            .position(|t| t.eq_ignore_ascii_case("from"))
            .ok_or_else(|| BindingError::invalid("statement has no FROM clause"))?;
        let query_name = tokens
            .get(from_pos + 1)
            .ok_or_else(|| BindingError::invalid("FROM clause names no type"))?;
        let type_def = state
            .types
            .values()
            .find(|def| def.query_name == *query_name || def.id == *query_name)
            .ok_or_else(|| BindingError::invalid(format!("unknown query type: {query_name}")))?;
        if !type_def.queryable {
            return Err(BindingError::invalid(format!(
                "type is not queryable: {}",
                type_def.id
            )));
        }
        let accepted = Self::subtype_ids(&state, &type_def.id);

        let matches: Vec<&Entry> = state
            .entries
            .values()
            .filter(|entry| {
                entry
                    .data
                    .object_type_id()
                    .map(|tid| accepted.iter().any(|t| t == tid))
                    .unwrap_or(false)
            })
            .collect();
        let total = matches.len() as u64;
        let page: Vec<ObjectData> = matches
            .into_iter()
            .skip(skip_count as usize)
            .take(max_items.map(|m| m as usize).unwrap_or(usize::MAX))
            .map(|entry| {
                Self::project(
                    &state,
                    entry,
                    None,
                    include_allowable_actions,
                    include_relationships,
                    false,
                    false,
                )
            })
            .collect();
        let has_more = (skip_count as u64 + page.len() as u64) < total;
        Ok(ObjectList {
            objects: page,
            has_more_items: has_more,
            num_items: Some(total),
        })
    }

    fn content_changes(
        &self,
        repository_id: &str,
        change_log_token: Option<&str>,
        include_properties: bool,
        include_policy_ids: bool,
        include_acl: bool,
        max_items: Option<u32>,
    ) -> BindingResult<ChangeList> {
        self.check_repository(repository_id)?;
        let state = self.state.read().expect("lock poisoned");
        let from_seq: u64 = match change_log_token {
            Some(token) => token
                .parse()
                .map_err(|_| BindingError::invalid(format!("bad change log token: {token}")))?,
            None => 0,
        };

        let pending: Vec<&ChangeRecord> = state
            .change_log
            .iter()
            .filter(|record| record.seq >= from_seq)
            .collect();
        let limit = max_items.map(|m| m as usize).unwrap_or(usize::MAX);
        let page = &pending[..pending.len().min(limit)];

        let objects = page
            .iter()
            .map(|record| {
                let mut properties = Properties::new();
                if include_properties {
                    properties = record.properties.clone();
                } else {
                    properties.put(
                        property_ids::OBJECT_ID,
                        PropertyValue::Id(record.object_id.clone()),
                    );
                }
                let entry = state.entries.get(&record.object_id);
                ObjectData {
                    properties,
                    change_info: Some(ChangeInfo {
                        change_type: record.change_type,
                        change_time: record.time,
                    }),
                    acl: if include_acl {
                        entry.and_then(|e| e.data.acl.clone())
                    } else {
                        None
                    },
                    policy_ids: if include_policy_ids {
                        entry.map(|e| e.data.policy_ids.clone()).unwrap_or_default()
                    } else {
                        Vec::new()
                    },
                    ..ObjectData::default()
                }
            })
            .collect::<Vec<_>>();

        let latest = page
            .last()
            .map(|record| (record.seq + 1).to_string())
            .or_else(|| Some(from_seq.to_string()));
        Ok(ChangeList {
            objects,
            latest_change_log_token: latest,
            has_more_items: pending.len() > limit,
        })
    }
}

impl std::fmt::Debug for InMemoryBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBinding")
            .field("repository_id", &self.repository_id)
            .field("object_count", &self.object_count())
            .finish()
    }
}

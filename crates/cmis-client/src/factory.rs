use std::sync::Arc;

use cmis_cache::Cache;
use cmis_types::{
    Ace, BaseTypeId, IncludeRelationships, ObjectData, Properties, TypeDefinition,
};
use tracing::debug;

use crate::context::OperationContext;
use crate::error::{ClientError, ClientResult};
use crate::object::{
    CmisObject, Document, Folder, Item, ObjectCore, ObjectType, Policy, Relationship,
};
use crate::query::QueryResult;

/// Shared cache of converted object types, keyed by type id.
pub type ObjectTypeCache = Arc<dyn Cache<String, Arc<ObjectType>>>;

/// Converts between raw protocol data and the domain model.
///
/// The factory is the only place raw `ObjectData` becomes a typed object,
/// and the only writer of the object-type cache. Implementations are
/// stateless apart from that cache and safe to share across threads.
pub trait ObjectFactory: Send + Sync {
    /// Validate a caller-supplied property bag before it is sent.
    fn convert_properties(&self, properties: &Properties) -> ClientResult<Properties>;

    /// Validate a list of policy ids for a create or apply call.
    fn convert_policies(&self, policy_ids: &[String]) -> ClientResult<Vec<String>>;

    /// Validate caller-supplied ACEs.
    fn convert_aces(&self, aces: &[Ace]) -> ClientResult<Vec<Ace>>;

    /// Build the domain object for raw data fetched under `context`.
    ///
    /// The context gates which optional substructures are attached, so an
    /// object converted under a narrow context never pretends to carry data
    /// that was not requested.
    fn convert_object(
        &self,
        data: ObjectData,
        context: &OperationContext,
    ) -> ClientResult<CmisObject>;

    /// Convert a raw type definition into the shared domain type.
    ///
    /// Two calls with the same type id return the identical `Arc`, so type
    /// equality degenerates to pointer equality.
    fn convert_type_definition(&self, definition: TypeDefinition) -> Arc<ObjectType>;

    /// Build a query row from raw data. Rows are plain property bags and
    /// are never subject to identity validation.
    fn convert_query_result(&self, data: ObjectData) -> QueryResult;
}

/// The default factory implementation.
pub struct StandardObjectFactory {
    object_type_cache: ObjectTypeCache,
}

impl StandardObjectFactory {
    pub fn new(object_type_cache: ObjectTypeCache) -> Self {
        Self { object_type_cache }
    }

    fn convert_core(data: ObjectData, context: &OperationContext) -> ClientResult<ObjectCore> {
        let id = data
            .id()
            .ok_or_else(|| ClientError::runtime("object data carries no cmis:objectId"))?;
        let base_type_id = data
            .base_type_id()
            .ok_or_else(|| ClientError::runtime("object data carries no valid cmis:baseTypeId"))?;
        let type_id = data
            .object_type_id()
            .ok_or_else(|| ClientError::runtime("object data carries no cmis:objectTypeId"))?
            .to_string();

        // Nested relationship data that is malformed is dropped, not fatal:
        // the primary object is still usable without it.
        let relationships = if context.include_relationships() == IncludeRelationships::None {
            Vec::new()
        } else {
            data.relationships
                .into_iter()
                .filter_map(|raw| match Self::convert_core(raw, &OperationContext::default()) {
                    Ok(core) if core.base_type_id == BaseTypeId::Relationship => {
                        Some(Relationship { core })
                    }
                    Ok(core) => {
                        debug!(object_id = %core.id, "dropping non-relationship in relationship list");
                        None
                    }
                    Err(err) => {
                        debug!(error = %err, "dropping malformed relationship data");
                        None
                    }
                })
                .collect()
        };

        Ok(ObjectCore {
            id,
            type_id,
            base_type_id,
            properties: data.properties,
            allowable_actions: if context.include_allowable_actions() {
                data.allowable_actions
            } else {
                None
            },
            acl: if context.include_acls() { data.acl } else { None },
            policy_ids: if context.include_policies() {
                data.policy_ids
            } else {
                Vec::new()
            },
            relationships,
            change_info: data.change_info,
            path_segment: if context.include_path_segments() {
                data.path_segment
            } else {
                None
            },
        })
    }
}

impl ObjectFactory for StandardObjectFactory {
    fn convert_properties(&self, properties: &Properties) -> ClientResult<Properties> {
        for (id, _) in properties.iter() {
            if id.trim().is_empty() {
                return Err(ClientError::invalid("property id must not be blank"));
            }
        }
        Ok(properties.clone())
    }

    fn convert_policies(&self, policy_ids: &[String]) -> ClientResult<Vec<String>> {
        for id in policy_ids {
            if id.trim().is_empty() {
                return Err(ClientError::invalid("policy id must not be blank"));
            }
        }
        Ok(policy_ids.to_vec())
    }

    fn convert_aces(&self, aces: &[Ace]) -> ClientResult<Vec<Ace>> {
        for ace in aces {
            if ace.principal_id.trim().is_empty() {
                return Err(ClientError::invalid("ACE principal must not be blank"));
            }
        }
        Ok(aces.to_vec())
    }

    fn convert_object(
        &self,
        data: ObjectData,
        context: &OperationContext,
    ) -> ClientResult<CmisObject> {
        let core = Self::convert_core(data, context)?;
        let object = match core.base_type_id {
            BaseTypeId::Document => CmisObject::Document(Document { core }),
            BaseTypeId::Folder => CmisObject::Folder(Folder { core }),
            BaseTypeId::Relationship => CmisObject::Relationship(Relationship { core }),
            BaseTypeId::Policy => CmisObject::Policy(Policy { core }),
            BaseTypeId::Item => CmisObject::Item(Item { core }),
            BaseTypeId::Secondary => {
                return Err(ClientError::runtime(
                    "secondary types are not instantiable as objects",
                ))
            }
        };
        Ok(object)
    }

    fn convert_type_definition(&self, definition: TypeDefinition) -> Arc<ObjectType> {
        if let Some(cached) = self.object_type_cache.get(&definition.id) {
            debug!(type_id = %definition.id, "object type cache hit");
            return cached;
        }
        let converted = Arc::new(ObjectType::new(definition));
        self.object_type_cache
            .put(converted.id().to_string(), Arc::clone(&converted));
        converted
    }

    fn convert_query_result(&self, data: ObjectData) -> QueryResult {
        QueryResult {
            properties: data.properties,
            allowable_actions: data.allowable_actions,
        }
    }
}

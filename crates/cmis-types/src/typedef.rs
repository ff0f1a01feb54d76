use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::object::BaseTypeId;
use crate::property::{PropertyDefinition, PropertyType};
use crate::property_ids;

/// Wire-level description of a content type.
///
/// Type definitions change far less often than objects, which is why the
/// session keeps them in their own cache keyed by type id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub id: String,
    pub local_name: String,
    pub display_name: String,
    pub query_name: String,
    #[serde(default)]
    pub description: String,
    pub base_type_id: BaseTypeId,
    /// Parent type id; `None` for the base types themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type_id: Option<String>,
    pub creatable: bool,
    pub fileable: bool,
    pub queryable: bool,
    pub property_definitions: BTreeMap<String, PropertyDefinition>,
}

impl TypeDefinition {
    /// A minimal definition for the given id and base type, carrying the
    /// property definitions every CMIS object has.
    pub fn new(id: impl Into<String>, base_type_id: BaseTypeId) -> Self {
        let id = id.into();
        let mut def = Self {
            local_name: id.clone(),
            display_name: id.clone(),
            query_name: id.clone(),
            id,
            description: String::new(),
            base_type_id,
            parent_type_id: None,
            creatable: true,
            fileable: base_type_id != BaseTypeId::Relationship,
            queryable: true,
            property_definitions: BTreeMap::new(),
        };
        for (pid, ptype) in [
            (property_ids::OBJECT_ID, PropertyType::Id),
            (property_ids::BASE_TYPE_ID, PropertyType::Id),
            (property_ids::OBJECT_TYPE_ID, PropertyType::Id),
            (property_ids::NAME, PropertyType::String),
        ] {
            def.add_property_definition(PropertyDefinition::new(pid, ptype));
        }
        def
    }

    /// The definition of one of the five base types.
    pub fn base(base_type_id: BaseTypeId) -> Self {
        Self::new(base_type_id.as_str(), base_type_id)
    }

    pub fn add_property_definition(&mut self, definition: PropertyDefinition) {
        self.property_definitions
            .insert(definition.id.clone(), definition);
    }

    pub fn property_definition(&self, id: &str) -> Option<&PropertyDefinition> {
        self.property_definitions.get(id)
    }

    /// `true` when this definition is one of the base types.
    pub fn is_base_type(&self) -> bool {
        self.parent_type_id.is_none()
    }
}

/// A type definition plus its descendants, as returned by descendant walks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinitionTree {
    pub definition: TypeDefinition,
    pub children: Vec<TypeDefinitionTree>,
}

impl TypeDefinitionTree {
    pub fn leaf(definition: TypeDefinition) -> Self {
        Self {
            definition,
            children: Vec::new(),
        }
    }

    /// Total number of definitions in the tree, this node included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TypeDefinitionTree::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_carries_standard_property_definitions() {
        let def = TypeDefinition::new("my:doc", BaseTypeId::Document);
        assert!(def.property_definition(property_ids::OBJECT_ID).is_some());
        assert!(def.property_definition(property_ids::NAME).is_some());
        assert!(def.is_base_type());
    }

    #[test]
    fn base_definition_uses_wire_id() {
        let def = TypeDefinition::base(BaseTypeId::Folder);
        assert_eq!(def.id, "cmis:folder");
        assert_eq!(def.base_type_id, BaseTypeId::Folder);
    }

    #[test]
    fn relationships_are_not_fileable() {
        let def = TypeDefinition::base(BaseTypeId::Relationship);
        assert!(!def.fileable);
    }

    #[test]
    fn tree_len_counts_all_nodes() {
        let tree = TypeDefinitionTree {
            definition: TypeDefinition::base(BaseTypeId::Document),
            children: vec![
                TypeDefinitionTree::leaf(TypeDefinition::new("a", BaseTypeId::Document)),
                TypeDefinitionTree::leaf(TypeDefinition::new("b", BaseTypeId::Document)),
            ],
        };
        assert_eq!(tree.len(), 3);
    }
}

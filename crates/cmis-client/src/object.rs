use chrono::{DateTime, Utc};
use cmis_types::{
    property_ids, Acl, AllowableActions, BaseTypeId, ChangeInfo, ObjectId, Properties,
    TypeDefinition,
};

/// State shared by every domain object variant.
///
/// Built by the object factory from raw `ObjectData`; which optional
/// substructures are populated depends on the operation context the object
/// was fetched under.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectCore {
    pub id: ObjectId,
    pub type_id: String,
    pub base_type_id: BaseTypeId,
    pub properties: Properties,
    pub allowable_actions: Option<AllowableActions>,
    pub acl: Option<Acl>,
    pub policy_ids: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub change_info: Option<ChangeInfo>,
    pub path_segment: Option<String>,
}

impl ObjectCore {
    pub fn name(&self) -> Option<&str> {
        self.properties.get_string(property_ids::NAME)
    }

    pub fn created_by(&self) -> Option<&str> {
        self.properties.get_string(property_ids::CREATED_BY)
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.properties.get_datetime(property_ids::CREATION_DATE)
    }

    pub fn last_modification_date(&self) -> Option<DateTime<Utc>> {
        self.properties
            .get_datetime(property_ids::LAST_MODIFICATION_DATE)
    }

    pub fn change_token(&self) -> Option<&str> {
        self.properties.get_string(property_ids::CHANGE_TOKEN)
    }
}

/// A document: content-bearing, optionally versioned.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub core: ObjectCore,
}

impl Document {
    pub fn content_stream_length(&self) -> Option<i64> {
        self.core
            .properties
            .get_integer(property_ids::CONTENT_STREAM_LENGTH)
    }

    pub fn content_stream_mime_type(&self) -> Option<&str> {
        self.core
            .properties
            .get_string(property_ids::CONTENT_STREAM_MIME_TYPE)
    }

    pub fn content_stream_file_name(&self) -> Option<&str> {
        self.core
            .properties
            .get_string(property_ids::CONTENT_STREAM_FILE_NAME)
    }

    pub fn version_label(&self) -> Option<&str> {
        self.core.properties.get_string(property_ids::VERSION_LABEL)
    }

    pub fn version_series_id(&self) -> Option<&str> {
        self.core
            .properties
            .get_string(property_ids::VERSION_SERIES_ID)
    }

    pub fn is_latest_version(&self) -> Option<bool> {
        self.core
            .properties
            .get_boolean(property_ids::IS_LATEST_VERSION)
    }

    pub fn is_major_version(&self) -> Option<bool> {
        self.core
            .properties
            .get_boolean(property_ids::IS_MAJOR_VERSION)
    }
}

/// A folder: the filing hierarchy node.
#[derive(Clone, Debug, PartialEq)]
pub struct Folder {
    pub core: ObjectCore,
}

impl Folder {
    pub fn parent_id(&self) -> Option<ObjectId> {
        self.core
            .properties
            .get_string(property_ids::PARENT_ID)
            .map(ObjectId::new)
    }

    pub fn path(&self) -> Option<&str> {
        self.core.properties.get_string(property_ids::PATH)
    }

    /// `true` for the repository root, which has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}

/// A relationship between a source and a target object.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub core: ObjectCore,
}

impl Relationship {
    pub fn source_id(&self) -> Option<ObjectId> {
        self.core
            .properties
            .get_string(property_ids::SOURCE_ID)
            .map(ObjectId::new)
    }

    pub fn target_id(&self) -> Option<ObjectId> {
        self.core
            .properties
            .get_string(property_ids::TARGET_ID)
            .map(ObjectId::new)
    }
}

/// An applied-governance policy object.
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    pub core: ObjectCore,
}

/// A plain item: fileable, no content, no versioning.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub core: ObjectCore,
}

/// A typed repository object, one variant per base type.
///
/// Secondary types never appear here: they decorate other objects and are
/// not instantiable on their own.
#[derive(Clone, Debug, PartialEq)]
pub enum CmisObject {
    Document(Document),
    Folder(Folder),
    Relationship(Relationship),
    Policy(Policy),
    Item(Item),
}

impl CmisObject {
    pub fn core(&self) -> &ObjectCore {
        match self {
            Self::Document(d) => &d.core,
            Self::Folder(f) => &f.core,
            Self::Relationship(r) => &r.core,
            Self::Policy(p) => &p.core,
            Self::Item(i) => &i.core,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.core().id
    }

    pub fn type_id(&self) -> &str {
        &self.core().type_id
    }

    pub fn base_type_id(&self) -> BaseTypeId {
        self.core().base_type_id
    }

    pub fn properties(&self) -> &Properties {
        &self.core().properties
    }

    pub fn name(&self) -> Option<&str> {
        self.core().name()
    }

    pub fn acl(&self) -> Option<&Acl> {
        self.core().acl.as_ref()
    }

    pub fn allowable_actions(&self) -> Option<&AllowableActions> {
        self.core().allowable_actions.as_ref()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Self::Folder(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Self::Relationship(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_folder(self) -> Option<Folder> {
        match self {
            Self::Folder(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }
}

/// Domain view of a type definition.
///
/// Instances are shared via `Arc` through the object-type cache: converting
/// the same type id twice yields the same allocation, so type identity can
/// be checked by pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectType {
    definition: TypeDefinition,
}

impl ObjectType {
    pub fn new(definition: TypeDefinition) -> Self {
        Self { definition }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn display_name(&self) -> &str {
        &self.definition.display_name
    }

    pub fn query_name(&self) -> &str {
        &self.definition.query_name
    }

    pub fn base_type_id(&self) -> BaseTypeId {
        self.definition.base_type_id
    }

    pub fn parent_type_id(&self) -> Option<&str> {
        self.definition.parent_type_id.as_deref()
    }

    pub fn is_base_type(&self) -> bool {
        self.definition.is_base_type()
    }

    pub fn is_creatable(&self) -> bool {
        self.definition.creatable
    }

    pub fn is_fileable(&self) -> bool {
        self.definition.fileable
    }

    pub fn is_queryable(&self) -> bool {
        self.definition.queryable
    }

    /// The raw definition backing this type.
    pub fn definition(&self) -> &TypeDefinition {
        &self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmis_types::PropertyValue;

    fn core(base: BaseTypeId) -> ObjectCore {
        let mut properties = Properties::new();
        properties.put(property_ids::OBJECT_ID, PropertyValue::Id("obj-1".into()));
        properties.put(property_ids::NAME, PropertyValue::String("thing".into()));
        ObjectCore {
            id: ObjectId::new("obj-1"),
            type_id: base.as_str().to_string(),
            base_type_id: base,
            properties,
            allowable_actions: None,
            acl: None,
            policy_ids: Vec::new(),
            relationships: Vec::new(),
            change_info: None,
            path_segment: None,
        }
    }

    #[test]
    fn enum_accessors_reach_the_core() {
        let obj = CmisObject::Document(Document {
            core: core(BaseTypeId::Document),
        });
        assert_eq!(obj.id(), &ObjectId::new("obj-1"));
        assert_eq!(obj.name(), Some("thing"));
        assert_eq!(obj.base_type_id(), BaseTypeId::Document);
        assert!(obj.is_document());
        assert!(!obj.is_folder());
        assert!(obj.as_folder().is_none());
    }

    #[test]
    fn folder_without_parent_is_root() {
        let folder = Folder {
            core: core(BaseTypeId::Folder),
        };
        assert!(folder.is_root());

        let mut filed = folder.clone();
        filed
            .core
            .properties
            .put(property_ids::PARENT_ID, PropertyValue::Id("root".into()));
        assert!(!filed.is_root());
        assert_eq!(filed.parent_id(), Some(ObjectId::new("root")));
    }

    #[test]
    fn relationship_endpoints_read_properties() {
        let mut rel = Relationship {
            core: core(BaseTypeId::Relationship),
        };
        rel.core
            .properties
            .put(property_ids::SOURCE_ID, PropertyValue::Id("a".into()));
        rel.core
            .properties
            .put(property_ids::TARGET_ID, PropertyValue::Id("b".into()));
        assert_eq!(rel.source_id(), Some(ObjectId::new("a")));
        assert_eq!(rel.target_id(), Some(ObjectId::new("b")));
    }

    #[test]
    fn document_content_accessors() {
        let mut doc = Document {
            core: core(BaseTypeId::Document),
        };
        doc.core.properties.put(
            property_ids::CONTENT_STREAM_MIME_TYPE,
            PropertyValue::String("text/plain".into()),
        );
        doc.core.properties.put(
            property_ids::CONTENT_STREAM_LENGTH,
            PropertyValue::Integer(42),
        );
        assert_eq!(doc.content_stream_mime_type(), Some("text/plain"));
        assert_eq!(doc.content_stream_length(), Some(42));
        assert_eq!(doc.version_label(), None);
    }

    #[test]
    fn object_type_exposes_definition() {
        let def = TypeDefinition::base(BaseTypeId::Folder);
        let ty = ObjectType::new(def);
        assert_eq!(ty.id(), "cmis:folder");
        assert!(ty.is_base_type());
        assert!(ty.is_fileable());
        assert_eq!(ty.parent_type_id(), None);
    }
}

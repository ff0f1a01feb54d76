use chrono::{DateTime, Utc};
use cmis_types::{Acl, AllowableActions, ChangeType, ObjectId, Properties, PropertyValue};

/// One row of a query result set.
///
/// Query rows are property bags, not objects: a statement may project a
/// subset of columns or join across types, so rows are never cached and
/// never carry an object identity requirement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub properties: Properties,
    pub allowable_actions: Option<AllowableActions>,
}

impl QueryResult {
    pub fn property(&self, query_name: &str) -> Option<&PropertyValue> {
        self.properties.get(query_name)
    }

    pub fn property_string(&self, query_name: &str) -> Option<&str> {
        self.properties.get_string(query_name)
    }

    /// The row's object id column, when projected.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.properties
            .get_string(cmis_types::property_ids::OBJECT_ID)
            .map(ObjectId::new)
    }
}

/// A page of query results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResults {
    pub results: Vec<QueryResult>,
    pub has_more_items: bool,
    /// Total match count if the repository reports one.
    pub num_items: Option<u64>,
}

impl QueryResults {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryResult> {
        self.results.iter()
    }
}

/// One entry of the repository change log.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub object_id: ObjectId,
    pub change_type: ChangeType,
    pub change_time: DateTime<Utc>,
    /// Object properties at event time, when requested.
    pub properties: Properties,
    pub policy_ids: Vec<String>,
    pub acl: Option<Acl>,
}

/// A page of change events plus the token to resume from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeEvents {
    pub events: Vec<ChangeEvent>,
    /// Token addressing the position after the last returned event.
    pub latest_change_log_token: Option<String>,
    pub has_more_items: bool,
}

impl ChangeEvents {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmis_types::property_ids;

    #[test]
    fn query_result_reads_projected_columns() {
        let mut properties = Properties::new();
        properties.put(property_ids::OBJECT_ID, PropertyValue::Id("row-1".into()));
        properties.put(property_ids::NAME, PropertyValue::String("report".into()));
        let row = QueryResult {
            properties,
            allowable_actions: None,
        };
        assert_eq!(row.object_id(), Some(ObjectId::new("row-1")));
        assert_eq!(row.property_string(property_ids::NAME), Some("report"));
        assert!(row.property("missing").is_none());
    }

    #[test]
    fn query_result_without_id_column() {
        let row = QueryResult::default();
        assert_eq!(row.object_id(), None);
    }

    #[test]
    fn results_page_len() {
        let page = QueryResults {
            results: vec![QueryResult::default(), QueryResult::default()],
            has_more_items: true,
            num_items: Some(10),
        };
        assert_eq!(page.len(), 2);
        assert!(!page.is_empty());
        assert_eq!(page.iter().count(), 2);
    }
}

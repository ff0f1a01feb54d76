use cmis_types::{property_ids, IncludeRelationships};

/// Per-call retrieval and caching directives.
///
/// An `OperationContext` is an immutable value: builders return a new
/// context, and a context captured by one call is unaffected by later
/// changes to the session default. Contexts carry no repository state and
/// are freely shared across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationContext {
    /// Property query names to retrieve. Empty means repository default;
    /// a single `*` means all properties.
    filter: Vec<String>,
    include_acls: bool,
    include_allowable_actions: bool,
    include_policies: bool,
    include_relationships: IncludeRelationships,
    rendition_filter: Vec<String>,
    include_path_segments: bool,
    order_by: Option<String>,
    /// Whether results of calls made under this context may be served
    /// from and stored into the session object cache.
    cache_enabled: bool,
    max_items_per_page: u32,
}

impl Default for OperationContext {
    /// The session default: caching on, allowable actions on, no
    /// relationships, page size 100.
    fn default() -> Self {
        Self {
            filter: Vec::new(),
            include_acls: false,
            include_allowable_actions: true,
            include_policies: false,
            include_relationships: IncludeRelationships::None,
            rendition_filter: Vec::new(),
            include_path_segments: false,
            order_by: None,
            cache_enabled: true,
            max_items_per_page: 100,
        }
    }
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.filter = filter.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_acls(mut self, include: bool) -> Self {
        self.include_acls = include;
        self
    }

    pub fn with_include_allowable_actions(mut self, include: bool) -> Self {
        self.include_allowable_actions = include;
        self
    }

    pub fn with_include_policies(mut self, include: bool) -> Self {
        self.include_policies = include;
        self
    }

    pub fn with_include_relationships(mut self, include: IncludeRelationships) -> Self {
        self.include_relationships = include;
        self
    }

    pub fn with_rendition_filter(
        mut self,
        filter: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.rendition_filter = filter.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_path_segments(mut self, include: bool) -> Self {
        self.include_path_segments = include;
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_max_items_per_page(mut self, max_items: u32) -> Self {
        self.max_items_per_page = max_items;
        self
    }

    pub fn include_acls(&self) -> bool {
        self.include_acls
    }

    pub fn include_allowable_actions(&self) -> bool {
        self.include_allowable_actions
    }

    pub fn include_policies(&self) -> bool {
        self.include_policies
    }

    pub fn include_relationships(&self) -> IncludeRelationships {
        self.include_relationships
    }

    pub fn include_path_segments(&self) -> bool {
        self.include_path_segments
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn max_items_per_page(&self) -> u32 {
        self.max_items_per_page
    }

    /// `true` when the context requests no property subset, so a result
    /// retrieved under it is a complete object.
    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_empty() || self.filter.iter().any(|f| f == "*")
    }

    /// The property filter in wire form.
    ///
    /// `None` for an empty filter (repository default), `Some("*")` when all
    /// properties are requested. Otherwise the comma-joined list, with the
    /// identity properties appended so every result can be typed and cached.
    pub fn filter_string(&self) -> Option<String> {
        if self.filter.is_empty() {
            return None;
        }
        if self.filter.iter().any(|f| f == "*") {
            return Some("*".to_string());
        }
        let mut parts = self.filter.clone();
        for required in [
            property_ids::OBJECT_ID,
            property_ids::OBJECT_TYPE_ID,
            property_ids::BASE_TYPE_ID,
        ] {
            if !parts.iter().any(|p| p == required) {
                parts.push(required.to_string());
            }
        }
        Some(parts.join(","))
    }

    /// The rendition filter in wire form; `cmis:none` when unset.
    pub fn rendition_filter_string(&self) -> String {
        if self.rendition_filter.is_empty() {
            "cmis:none".to_string()
        } else {
            self.rendition_filter.join(",")
        }
    }

    /// Stable key describing the retrieval shape, usable for partitioning a
    /// cache by context.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}{}{}{}|{:?}|{}",
            self.filter_string().unwrap_or_default(),
            u8::from(self.include_acls),
            u8::from(self.include_allowable_actions),
            u8::from(self.include_policies),
            u8::from(self.include_path_segments),
            self.include_relationships,
            self.rendition_filter_string(),
        )
    }
}

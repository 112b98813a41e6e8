//! Schema accumulator for merging sample structure into a single tree

use ahash::{AHashMap, AHashSet};
use lapscope_core::path::{child_path, element_path};
use lapscope_core::{truncate_chars, KindSet, ScanLimits, ValueKind, WILDCARD_INDEX};
use serde_json::Value;
use smallvec::SmallVec;

/// Stable handle of a node in the schema arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Handle of the root node
    pub const ROOT: NodeId = NodeId(0);
}

/// Name of the root node
pub const ROOT_NAME: &str = "(root)";

/// Name of the child that holds session metadata
pub const SESSION_FIELD: &str = "session";

/// One node per distinct field path (plus the root and merged array elements).
#[derive(Debug, Clone)]
pub struct SchemaNode {
    name: String,
    path: String,
    kinds: KindSet,
    sample_values: SmallVec<[String; 5]>,
    distinct_values: AHashSet<String>,
    distinct_capped: bool,
    min_value: Option<f64>,
    max_value: Option<f64>,
    min_array_length: Option<usize>,
    max_array_length: Option<usize>,
    occurrence_count: u64,
    first_seen_sample: u64,
    children: Vec<NodeId>,
    child_index: AHashMap<String, NodeId>,
    element: Option<NodeId>,
}

impl SchemaNode {
    fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kinds: KindSet::new(),
            sample_values: SmallVec::new(),
            distinct_values: AHashSet::new(),
            distinct_capped: false,
            min_value: None,
            max_value: None,
            min_array_length: None,
            max_array_length: None,
            occurrence_count: 0,
            first_seen_sample: 0,
            children: Vec::new(),
            child_index: AHashMap::new(),
            element: None,
        }
    }

    /// Property name, `(root)` or `[*]`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted path with `[*]` for merged array elements; empty for the root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Every kind ever observed at this path
    pub fn kinds(&self) -> KindSet {
        self.kinds
    }

    /// `unknown`, `T`, `T?` or `T|U`
    pub fn type_description(&self) -> String {
        self.kinds.describe()
    }

    /// First raw values seen, in arrival order
    pub fn sample_values(&self) -> &[String] {
        &self.sample_values
    }

    /// Distinct raw values, sorted
    pub fn distinct_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.distinct_values.iter().map(String::as_str).collect();
        values.sort_unstable();
        values
    }

    /// Number of distinct values kept
    pub fn distinct_count(&self) -> usize {
        self.distinct_values.len()
    }

    /// Whether the distinct set stopped accepting values
    pub fn distinct_capped(&self) -> bool {
        self.distinct_capped
    }

    /// Numeric range, if any number was observed
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        self.min_value.zip(self.max_value)
    }

    /// Array length range, if any array was observed
    pub fn array_length_range(&self) -> Option<(usize, usize)> {
        self.min_array_length.zip(self.max_array_length)
    }

    /// Number of times a value was merged into this node
    pub fn occurrence_count(&self) -> u64 {
        self.occurrence_count
    }

    /// Sample index of the first occurrence
    pub fn first_seen_sample(&self) -> u64 {
        self.first_seen_sample
    }

    /// Child handles in first-seen order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Shared element schema for array nodes
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// Terminal node: no children and no element schema
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.element.is_none()
    }

    /// Whether this is a merged array-element node
    pub fn is_element(&self) -> bool {
        self.name == WILDCARD_INDEX
    }

    fn add_sample_value(&mut self, value: String, limits: &ScanLimits) {
        if !self.distinct_capped && !self.distinct_values.contains(&value) {
            if self.distinct_values.len() >= limits.max_distinct_values {
                self.distinct_capped = true;
            } else {
                self.distinct_values.insert(value.clone());
            }
        }

        if self.sample_values.len() < limits.max_sample_values {
            self.sample_values.push(value);
        }
    }

    fn track_number(&mut self, value: f64) {
        self.min_value = Some(self.min_value.map_or(value, |min| min.min(value)));
        self.max_value = Some(self.max_value.map_or(value, |max| max.max(value)));
    }

    fn track_array_length(&mut self, len: usize) {
        self.min_array_length = Some(self.min_array_length.map_or(len, |min| min.min(len)));
        self.max_array_length = Some(self.max_array_length.map_or(len, |max| max.max(len)));
    }
}

/// Folds every sample into one running schema tree.
///
/// Nodes live in an arena owned by the accumulator and are addressed by
/// [`NodeId`]; there are no back-references.
#[derive(Debug, Clone)]
pub struct SchemaAccumulator {
    nodes: Vec<SchemaNode>,
    by_path: AHashMap<String, NodeId>,
    limits: ScanLimits,
    samples_merged: u64,
}

impl SchemaAccumulator {
    /// Create an accumulator holding only the root node
    pub fn new(limits: ScanLimits) -> Self {
        Self {
            nodes: vec![SchemaNode::new(ROOT_NAME, "")],
            by_path: AHashMap::new(),
            limits,
            samples_merged: 0,
        }
    }

    /// Merge one sample into the tree
    pub fn merge(&mut self, sample: &Value, sample_index: u64) {
        self.samples_merged += 1;
        self.walk(sample, NodeId::ROOT, sample_index);
    }

    /// Merge session metadata under the root's `session` child
    pub fn merge_session(&mut self, session: &Value) {
        let node = self.child(NodeId::ROOT, SESSION_FIELD);
        self.walk(session, node, 0);
    }

    /// Number of samples merged so far (session metadata excluded)
    pub fn samples_merged(&self) -> u64 {
        self.samples_merged
    }

    /// Root node
    pub fn root(&self) -> &SchemaNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Node by handle
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Node by schema path (e.g. `Vehicles[*].Speed`)
    pub fn find(&self, path: &str) -> Option<&SchemaNode> {
        if path.is_empty() {
            return Some(self.root());
        }
        self.by_path.get(path).map(|id| self.node(*id))
    }

    /// Every node in creation order, root first
    pub fn nodes(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }

    /// Total nodes in the arena, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Count of terminal nodes reachable from the root, matching `leaf_paths`.
    ///
    /// A pathless root is not a field, so a schema of bare scalars counts 0.
    pub fn leaf_count(&self) -> usize {
        self.count_leaves(NodeId::ROOT)
    }

    /// Paths of all terminal nodes in depth-first order
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_leaf_paths(NodeId::ROOT, &mut paths);
        paths
    }

    /// Nesting depth below the root: 0 for a leaf, else `1 + max(child depth)`
    pub fn max_depth(&self) -> usize {
        self.depth(NodeId::ROOT)
    }

    /// Depth of the subtree rooted at `id`
    pub fn depth(&self, id: NodeId) -> usize {
        let node = self.node(id);
        if node.is_leaf() {
            return 0;
        }
        let deepest = node
            .children
            .iter()
            .copied()
            .chain(node.element)
            .map(|child| self.depth(child))
            .max()
            .unwrap_or(0);
        1 + deepest
    }

    fn walk(&mut self, value: &Value, id: NodeId, sample_index: u64) {
        let limits = &self.limits;
        let node = &mut self.nodes[id.0];
        node.kinds.insert(ValueKind::of(value));
        node.occurrence_count += 1;
        if node.occurrence_count == 1 {
            node.first_seen_sample = sample_index;
        }

        match value {
            Value::Object(map) => {
                for (name, child_value) in map {
                    let child = self.child(id, name);
                    self.walk(child_value, child, sample_index);
                }
            }
            Value::Array(items) => {
                node.track_array_length(items.len());
                let sample = if items.len() <= limits.inline_array_sample_len {
                    value.to_string()
                } else {
                    format!("[array of {} elements]", items.len())
                };
                node.add_sample_value(sample, limits);

                if !items.is_empty() {
                    let element = self.element(id);
                    let cap = self.limits.max_elements_per_array;
                    for item in items.iter().take(cap) {
                        self.walk(item, element, sample_index);
                    }
                }
            }
            Value::Number(n) => {
                if let Some(number) = n.as_f64() {
                    node.track_number(number);
                }
                node.add_sample_value(n.to_string(), limits);
            }
            Value::String(s) => {
                let max = limits.max_string_sample_chars;
                let stored = if s.chars().count() > max {
                    format!("{}...", truncate_chars(s, max))
                } else {
                    s.clone()
                };
                node.add_sample_value(stored, limits);
            }
            Value::Bool(b) => node.add_sample_value(b.to_string(), limits),
            Value::Null => node.add_sample_value("null".to_string(), limits),
        }
    }

    fn child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(id) = self.nodes[parent.0].child_index.get(name) {
            return *id;
        }
        let path = child_path(&self.nodes[parent.0].path, name);
        let id = self.push_node(SchemaNode::new(name, path));
        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.child_index.insert(name.to_string(), id);
        id
    }

    fn element(&mut self, parent: NodeId) -> NodeId {
        if let Some(id) = self.nodes[parent.0].element {
            return id;
        }
        let path = element_path(&self.nodes[parent.0].path);
        let id = self.push_node(SchemaNode::new(WILDCARD_INDEX, path));
        self.nodes[parent.0].element = Some(id);
        id
    }

    fn push_node(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_path.insert(node.path.clone(), id);
        self.nodes.push(node);
        id
    }

    fn count_leaves(&self, id: NodeId) -> usize {
        let node = self.node(id);
        if node.is_leaf() {
            return usize::from(!node.path.is_empty());
        }
        node.children
            .iter()
            .copied()
            .chain(node.element)
            .map(|child| self.count_leaves(child))
            .sum()
    }

    fn collect_leaf_paths(&self, id: NodeId, paths: &mut Vec<String>) {
        let node = self.node(id);
        if node.is_leaf() {
            if !node.path.is_empty() {
                paths.push(node.path.clone());
            }
            return;
        }
        for child in node.children.iter().copied().chain(node.element) {
            self.collect_leaf_paths(child, paths);
        }
    }
}

impl Default for SchemaAccumulator {
    fn default() -> Self {
        Self::new(ScanLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_objects_and_tracks_ranges() {
        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!({"Speed": 10.5, "Gear": 3}), 0);
        schema.merge(&json!({"Speed": 80, "Gear": 4, "Pit": false}), 1);

        let speed = schema.find("Speed").expect("speed node");
        assert_eq!(speed.numeric_range(), Some((10.5, 80.0)));
        assert_eq!(speed.occurrence_count(), 2);
        assert_eq!(speed.type_description(), "number");

        let pit = schema.find("Pit").expect("pit node");
        assert_eq!(pit.first_seen_sample(), 1);
        assert_eq!(pit.sample_values(), &["false".to_string()]);

        assert_eq!(schema.leaf_count(), 3);
        assert_eq!(schema.leaf_paths(), vec!["Speed", "Gear", "Pit"]);
        assert_eq!(schema.max_depth(), 1);
        assert_eq!(schema.samples_merged(), 2);
    }

    #[test]
    fn arrays_share_one_element_schema() {
        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!({"Vehicles": [{"Id": 1}, {"Id": 2, "Name": "A"}]}), 0);
        schema.merge(&json!({"Vehicles": []}), 1);

        let vehicles = schema.find("Vehicles").expect("array node");
        assert_eq!(vehicles.array_length_range(), Some((0, 2)));
        assert_eq!(vehicles.type_description(), "array");
        assert_eq!(vehicles.sample_values()[0], r#"[{"Id":1},{"Id":2,"Name":"A"}]"#);

        let id = schema.find("Vehicles[*].Id").expect("element child");
        assert_eq!(id.occurrence_count(), 2);
        assert_eq!(schema.leaf_paths(), vec!["Vehicles[*].Id", "Vehicles[*].Name"]);
        assert_eq!(schema.max_depth(), 3);
    }

    #[test]
    fn empty_arrays_create_no_element_schema() {
        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!({"Empty": []}), 0);
        assert!(schema.find("Empty").expect("node").element().is_none());
        assert!(schema.find("Empty[*]").is_none());
        assert_eq!(schema.leaf_paths(), vec!["Empty"]);
    }

    #[test]
    fn large_arrays_store_placeholder_and_cap_elements() {
        let mut schema = SchemaAccumulator::default();
        let items: Vec<u32> = (0..120).collect();
        schema.merge(&json!({ "Trace": items }), 0);

        let trace = schema.find("Trace").expect("trace");
        assert_eq!(trace.sample_values(), &["[array of 120 elements]".to_string()]);
        let element = schema.find("Trace[*]").expect("element");
        assert_eq!(element.occurrence_count(), 50);
        assert_eq!(element.numeric_range(), Some((0.0, 49.0)));
    }

    #[test]
    fn nullable_and_polymorphic_types() {
        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!({"Driver": "Ana", "Lap": 1}), 0);
        schema.merge(&json!({"Driver": null, "Lap": "out"}), 1);
        assert_eq!(schema.find("Driver").unwrap().type_description(), "string?");
        assert_eq!(schema.find("Lap").unwrap().type_description(), "string|number");
    }

    #[test]
    fn long_strings_are_truncated_for_samples() {
        let limits = ScanLimits {
            max_string_sample_chars: 4,
            ..Default::default()
        };
        let mut schema = SchemaAccumulator::new(limits);
        schema.merge(&json!({"Note": "abcdefgh"}), 0);
        assert_eq!(schema.find("Note").unwrap().sample_values(), &["abcd...".to_string()]);
    }

    #[test]
    fn distinct_values_cap_is_one_way() {
        let limits = ScanLimits {
            max_distinct_values: 3,
            ..Default::default()
        };
        let mut schema = SchemaAccumulator::new(limits);
        for (i, value) in [1, 2, 3, 4, 1, 5].into_iter().enumerate() {
            schema.merge(&json!({ "x": value }), i as u64);
        }
        let node = schema.find("x").unwrap();
        assert!(node.distinct_capped());
        assert_eq!(node.distinct_values(), vec!["1", "2", "3"]);
        assert_eq!(node.sample_values().len(), 5);
    }

    #[test]
    fn session_merges_under_session_child() {
        let mut schema = SchemaAccumulator::default();
        schema.merge_session(&json!({"track": "Sebring", "cars": 40}));
        assert!(schema.find("session.track").is_some());
        assert_eq!(schema.samples_merged(), 0);
        assert_eq!(schema.leaf_paths(), vec!["session.track", "session.cars"]);
    }

    #[test]
    fn leaf_count_agrees_with_leaf_paths() {
        let empty = SchemaAccumulator::default();
        assert_eq!(empty.leaf_count(), 0);
        assert!(empty.leaf_paths().is_empty());

        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!({"a": 1, "b": {"c": [1, 2], "d": {}}}), 0);
        schema.merge(&json!(7), 1);
        assert_eq!(schema.leaf_count(), schema.leaf_paths().len());
    }

    #[test]
    fn root_scalar_sample_is_a_leaf_without_path() {
        let mut schema = SchemaAccumulator::default();
        schema.merge(&json!(42), 0);
        assert_eq!(schema.leaf_count(), 0);
        assert!(schema.leaf_paths().is_empty());
        assert_eq!(schema.max_depth(), 0);
        assert_eq!(schema.root().type_description(), "number");
    }
}

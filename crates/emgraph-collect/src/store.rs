//! In-memory graph of collected assets and relations.
//!
//! Nodes and relations live in dense vectors; string uuids map to indices for
//! O(1) lookup. A short-type index serves pattern type lookups and every node
//! keeps the indices of the relations touching it, in either direction.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use emgraph_core::{short_type, Node, Relation};

/// A set of absent endpoint uuids reported by relation insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingEntities(BTreeSet<String>);

impl MissingEntities {
    pub fn new(uuids: impl IntoIterator<Item = String>) -> Self {
        Self(uuids.into_iter().collect())
    }

    /// Union another set into this one.
    pub fn merge(&mut self, other: MissingEntities) {
        self.0.extend(other.0);
    }

    pub fn uuids(&self) -> &BTreeSet<String> {
        &self.0
    }

    pub fn into_uuids(self) -> BTreeSet<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for MissingEntities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{}", joined.join(", "))
    }
}

/// Data-integrity errors from store mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate entity: {uuid} is already stored")]
    DuplicateEntity { uuid: String },

    #[error("Missing entities: {0}")]
    MissingEntities(MissingEntities),
}

/// Direction constraint for a single traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedDirection {
    /// The relation must run from the start node.
    Outgoing,
    /// The relation must run into the start node.
    Incoming,
    Any,
}

/// Direction in which a relation was actually travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Travelled {
    Outgoing,
    Incoming,
}

impl AllowedDirection {
    /// Symmetric relation types satisfy every constraint.
    pub fn permits(self, travelled: Travelled, directional: bool) -> bool {
        if !directional {
            return true;
        }
        matches!(
            (self, travelled),
            (AllowedDirection::Any, _)
                | (AllowedDirection::Outgoing, Travelled::Outgoing)
                | (AllowedDirection::Incoming, Travelled::Incoming)
        )
    }
}

const NO_EDGES: &[usize] = &[];

/// Whether `short` is one of `types`, which may hold short or namespaced forms.
pub fn type_matches(types: &BTreeSet<String>, short: &str) -> bool {
    types.iter().any(|t| short_type(t) == short)
}

/// The authoritative in-memory multigraph for one collection session.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    relations: Vec<Relation>,
    /// Map from node uuid → dense index into `nodes`.
    node_index: HashMap<String, usize>,
    /// Map from relation uuid → dense index into `relations`.
    relation_index: HashMap<String, usize>,
    /// Short type → node indices, in insertion order.
    type_index: HashMap<String, Vec<usize>>,
    /// `adjacency[i]` = relations with node `i` as source or target.
    adjacency: Vec<Vec<usize>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a node or relation with this uuid is stored.
    pub fn contains(&self, uuid: &str) -> bool {
        self.node_index.contains_key(uuid) || self.relation_index.contains_key(uuid)
    }

    /// Insert a node. Node and relation uuids share one key space.
    pub fn add_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.contains(&node.uuid) {
            return Err(StoreError::DuplicateEntity { uuid: node.uuid });
        }

        let index = self.nodes.len();
        self.node_index.insert(node.uuid.clone(), index);
        self.type_index
            .entry(node.short_type.clone())
            .or_default()
            .push(index);
        self.adjacency.push(Vec::new());
        self.nodes.push(node);
        Ok(())
    }

    /// Insert a relation. Both endpoints must already be stored; otherwise
    /// the error carries every absent endpoint.
    pub fn add_relation(&mut self, relation: Relation) -> Result<(), StoreError> {
        if self.contains(&relation.uuid) {
            return Err(StoreError::DuplicateEntity {
                uuid: relation.uuid,
            });
        }

        let source = self.node_index.get(&relation.source_uuid).copied();
        let target = self.node_index.get(&relation.target_uuid).copied();
        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                let missing = [&relation.source_uuid, &relation.target_uuid]
                    .into_iter()
                    .filter(|uuid| !self.node_index.contains_key(uuid.as_str()))
                    .cloned();
                return Err(StoreError::MissingEntities(MissingEntities::new(missing)));
            }
        };

        let index = self.relations.len();
        self.relation_index.insert(relation.uuid.clone(), index);
        self.adjacency[source].push(index);
        if target != source {
            self.adjacency[target].push(index);
        }
        self.relations.push(relation);
        Ok(())
    }

    pub fn get_node_by_uuid(&self, uuid: &str) -> Option<&Node> {
        self.node_index.get(uuid).map(|&i| &self.nodes[i])
    }

    pub fn get_relation_by_uuid(&self, uuid: &str) -> Option<&Relation> {
        self.relation_index.get(uuid).map(|&i| &self.relations[i])
    }

    /// All nodes whose short type is in `types` (short or namespaced forms),
    /// in insertion order.
    pub fn get_nodes_by_types<I, S>(&self, types: I) -> Vec<&Node>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let shorts: BTreeSet<String> = types
            .into_iter()
            .map(|t| short_type(t.as_ref()).to_string())
            .collect();
        let mut indices: Vec<usize> = shorts
            .iter()
            .filter_map(|t| self.type_index.get(t))
            .flatten()
            .copied()
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| &self.nodes[i]).collect()
    }

    /// Neighbours of `start_uuid` one relation away.
    ///
    /// The returned iterator reads the store as it is now; call again to
    /// re-walk after further insertions. An unknown start yields nothing.
    pub fn traverse<'a>(
        &'a self,
        start_uuid: &str,
        relation_types: &'a BTreeSet<String>,
        allowed: AllowedDirection,
        target_types: &'a BTreeSet<String>,
    ) -> Traverse<'a> {
        let (start, edges) = match self.node_index.get(start_uuid) {
            Some(&i) => (i, self.adjacency[i].iter()),
            None => (usize::MAX, NO_EDGES.iter()),
        };
        Traverse {
            store: self,
            start,
            edges,
            relation_types,
            allowed,
            target_types,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

/// One traversal step: the relation followed and the node reached.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub relation: &'a Relation,
    pub node: &'a Node,
    pub travelled: Travelled,
}

/// Lazy iterator over the one-hop neighbourhood of a node.
pub struct Traverse<'a> {
    store: &'a GraphStore,
    start: usize,
    edges: std::slice::Iter<'a, usize>,
    relation_types: &'a BTreeSet<String>,
    allowed: AllowedDirection,
    target_types: &'a BTreeSet<String>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        let start_uuid = &store.nodes.get(self.start)?.uuid;

        for &edge in self.edges.by_ref() {
            let relation = &store.relations[edge];
            if !type_matches(self.relation_types, &relation.short_type) {
                continue;
            }

            let (travelled, far_uuid) = if &relation.source_uuid == start_uuid {
                (Travelled::Outgoing, &relation.target_uuid)
            } else {
                (Travelled::Incoming, &relation.source_uuid)
            };
            if !self.allowed.permits(travelled, relation.is_directional()) {
                continue;
            }

            let Some(node) = store.get_node_by_uuid(far_uuid) else {
                continue;
            };
            if !type_matches(self.target_types, &node.short_type) {
                continue;
            }

            return Some(Step {
                relation,
                node,
                travelled,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn make_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(Node::new("a", "installatie#MIVModule")).unwrap();
        store.add_node(Node::new("b", "onderdeel#Wegkantkast")).unwrap();
        store.add_node(Node::new("c", "onderdeel#Netwerkpoort")).unwrap();
        store.add_node(Node::new("d", "onderdeel#Stroomkring")).unwrap();
        store
            .add_relation(Relation::new("r-ab", "onderdeel#Bevestiging", "a", "b"))
            .unwrap();
        store
            .add_relation(Relation::new("r-ca", "onderdeel#Sturing", "c", "a"))
            .unwrap();
        store
            .add_relation(Relation::new("r-da", "onderdeel#Voedt", "d", "a"))
            .unwrap();
        store
    }

    #[test]
    fn test_add_node_duplicate() {
        let mut store = GraphStore::new();
        store.add_node(Node::new("a", "MIVModule")).unwrap();
        let err = store.add_node(Node::new("a", "Wegkantkast")).unwrap_err();
        assert_eq!(err, StoreError::DuplicateEntity { uuid: "a".to_string() });
        // First write wins.
        assert_eq!(store.get_node_by_uuid("a").unwrap().short_type, "MIVModule");
    }

    #[test]
    fn test_relation_uuid_collides_with_node() {
        let mut store = make_store();
        let err = store
            .add_relation(Relation::new("a", "onderdeel#Sturing", "b", "c"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_add_relation_reports_exactly_missing_endpoints() {
        let mut store = GraphStore::new();
        store.add_node(Node::new("a", "MIVModule")).unwrap();

        let err = store
            .add_relation(Relation::new("r1", "Bevestiging", "a", "x"))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::MissingEntities(MissingEntities::new(["x".to_string()]))
        );

        let err = store
            .add_relation(Relation::new("r2", "Bevestiging", "y", "z"))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::MissingEntities(MissingEntities::new(["y".to_string(), "z".to_string()]))
        );
        assert_eq!(store.relation_count(), 0);
    }

    #[test]
    fn test_missing_entities_merge() {
        let mut all = MissingEntities::new(["x".to_string()]);
        all.merge(MissingEntities::new(["y".to_string(), "x".to_string()]));
        assert_eq!(all.len(), 2);
        assert_eq!(all.to_string(), "x, y");
    }

    #[test]
    fn test_get_nodes_by_types_accepts_both_forms() {
        let store = make_store();
        let short = store.get_nodes_by_types(&["Wegkantkast"]);
        let long = store.get_nodes_by_types(&[
            "https://wegenenverkeer.data.vlaanderen.be/ns/onderdeel#Wegkantkast",
        ]);
        assert_eq!(short.len(), 1);
        assert_eq!(short, long);

        let both = store.get_nodes_by_types(&["onderdeel#Netwerkpoort", "installatie#MIVModule"]);
        let uuids: Vec<&str> = both.iter().map(|n| n.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "c"]);
        assert!(store.get_nodes_by_types(&["Onbekend"]).is_empty());
    }

    #[test]
    fn test_traverse_undirected_relation_ignores_direction() {
        let store = make_store();
        let rel = types(&["onderdeel#Sturing"]);
        let target = types(&["onderdeel#Netwerkpoort"]);

        // r-ca runs c → a, but Sturing is symmetric.
        let steps: Vec<_> = store
            .traverse("a", &rel, AllowedDirection::Outgoing, &target)
            .collect();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].node.uuid, "c");
        assert_eq!(steps[0].travelled, Travelled::Incoming);
    }

    #[test]
    fn test_traverse_directional_relation_respects_direction() {
        let store = make_store();
        let rel = types(&["Voedt"]);
        let target = types(&["Stroomkring"]);

        assert_eq!(
            store
                .traverse("a", &rel, AllowedDirection::Outgoing, &target)
                .count(),
            0
        );
        assert_eq!(
            store
                .traverse("a", &rel, AllowedDirection::Incoming, &target)
                .count(),
            1
        );
        assert_eq!(
            store.traverse("a", &rel, AllowedDirection::Any, &target).count(),
            1
        );
        assert_eq!(
            store
                .traverse("d", &rel, AllowedDirection::Outgoing, &types(&["MIVModule"]))
                .count(),
            1
        );
    }

    #[test]
    fn test_traverse_filters_target_type() {
        let store = make_store();
        let rel = types(&["Bevestiging"]);
        assert_eq!(
            store
                .traverse("a", &rel, AllowedDirection::Any, &types(&["Netwerkpoort"]))
                .count(),
            0
        );
    }

    #[test]
    fn test_traverse_is_restartable() {
        let mut store = make_store();
        let rel = types(&["Bevestiging"]);
        let target = types(&["Wegkantkast"]);
        assert_eq!(store.traverse("a", &rel, AllowedDirection::Any, &target).count(), 1);

        store.add_node(Node::new("b2", "Wegkantkast")).unwrap();
        store
            .add_relation(Relation::new("r-ab2", "Bevestiging", "a", "b2"))
            .unwrap();
        assert_eq!(store.traverse("a", &rel, AllowedDirection::Any, &target).count(), 2);
    }

    #[test]
    fn test_traverse_unknown_start_is_empty() {
        let store = make_store();
        let any = types(&["Bevestiging"]);
        assert_eq!(
            store.traverse("zzz", &any, AllowedDirection::Any, &any).count(),
            0
        );
    }

    #[test]
    fn test_counts() {
        let store = make_store();
        assert_eq!(store.node_count(), 4);
        assert_eq!(store.relation_count(), 3);
        assert!(store.get_relation_by_uuid("r-ab").is_some());
        assert!(store.contains("r-ab"));
        assert!(!store.contains("r-xx"));
    }
}

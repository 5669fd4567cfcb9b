//! Local replay of a pattern against a populated store.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use emgraph_core::{canonical_uuid, Node, Relation};
use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;
use crate::store::GraphStore;

/// A relation matched by the filter, keyed `"<from>-<type>-<to>"` in travel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRelation {
    pub key: String,
    pub relation: Relation,
}

/// Matched nodes in discovery order, followed by matched relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub nodes: Vec<Node>,
    pub relations: Vec<MatchedRelation>,
}

impl FilterResult {
    pub fn node_uuids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.uuid.as_str()).collect()
    }

    pub fn relation_keys(&self) -> BTreeSet<&str> {
        self.relations.iter().map(|r| r.key.as_str()).collect()
    }
}

/// Walk `pattern` over `store` from `seeds`, without touching the remote API.
///
/// Only seeds that are stored and carry one of the seed variable's types
/// start the walk. Each edge is consumed once, oriented from the first
/// frontier variable that reaches it.
pub fn filter<S: AsRef<str>>(
    store: &GraphStore,
    pattern: &Pattern,
    seeds: &[S],
    include_relations: bool,
) -> FilterResult {
    let seeds: BTreeSet<String> = seeds
        .iter()
        .map(|s| canonical_uuid(s.as_ref()).unwrap_or_else(|| s.as_ref().to_lowercase()))
        .collect();

    let mut result = FilterResult::default();
    let mut seen_nodes: HashSet<&str> = HashSet::new();
    let mut seen_relations: HashSet<&str> = HashSet::new();
    let mut matched: BTreeMap<String, Vec<&Node>> = BTreeMap::new();

    let seed_var = pattern.seed_var();
    if let Some(seed_types) = pattern.types_of(seed_var) {
        let seed_nodes: Vec<&Node> = store
            .get_nodes_by_types(seed_types)
            .into_iter()
            .filter(|n| seeds.contains(&n.uuid))
            .collect();
        for &node in &seed_nodes {
            if seen_nodes.insert(&node.uuid) {
                result.nodes.push(node.clone());
            }
        }
        matched.insert(seed_var.to_string(), seed_nodes);
    }

    let mut processed = vec![false; pattern.edges().len()];
    let mut frontier = BTreeSet::from([seed_var.to_string()]);

    while !frontier.is_empty() {
        let mut next = BTreeSet::new();

        for var in &frontier {
            for (i, edge) in pattern.edges().iter().enumerate() {
                if processed[i] {
                    continue;
                }
                let Some(edge) = edge.oriented_from(var) else {
                    continue;
                };
                processed[i] = true;
                next.insert(edge.to.clone());

                let (Some(relation_types), Some(to_types)) =
                    (pattern.types_of(&edge.relation), pattern.types_of(&edge.to))
                else {
                    continue;
                };
                let starts = matched.get(var).cloned().unwrap_or_default();

                for start in starts {
                    for step in store.traverse(
                        &start.uuid,
                        relation_types,
                        edge.direction.allowed(),
                        to_types,
                    ) {
                        let reached = matched.entry(edge.to.clone()).or_default();
                        if !reached.iter().any(|n| n.uuid == step.node.uuid) {
                            reached.push(step.node);
                        }
                        if seen_nodes.insert(&step.node.uuid) {
                            result.nodes.push(step.node.clone());
                        }
                        if include_relations && seen_relations.insert(&step.relation.uuid) {
                            result.relations.push(MatchedRelation {
                                key: format!(
                                    "{}-{}-{}",
                                    start.uuid, step.relation.short_type, step.node.uuid
                                ),
                                relation: step.relation.clone(),
                            });
                        }
                    }
                }
            }
        }
        frontier = next;
    }

    tracing::debug!(
        nodes = result.nodes.len(),
        relations = result.relations.len(),
        "Pattern filter complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const A: &str = "00000000-0000-4000-8000-00000000000a";
    const B: &str = "00000000-0000-4000-8000-00000000000b";
    const C: &str = "00000000-0000-4000-8000-00000000000c";
    const D: &str = "00000000-0000-4000-8000-00000000000d";

    fn make_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(Node::new(A, "installatie#MIVModule")).unwrap();
        store.add_node(Node::new(B, "onderdeel#Wegkantkast")).unwrap();
        store.add_node(Node::new(C, "onderdeel#Wegkantkast")).unwrap();
        store.add_node(Node::new(D, "onderdeel#Stroomkring")).unwrap();
        store
            .add_relation(Relation::new("rel-ab", "onderdeel#Bevestiging", A, B))
            .unwrap();
        store
            .add_relation(Relation::new("rel-ca", "onderdeel#Bevestiging", C, A))
            .unwrap();
        store
            .add_relation(Relation::new("rel-da", "onderdeel#Voedt", D, A))
            .unwrap();
        store
    }

    fn make_pattern() -> Pattern {
        Pattern::from_json(&json!([
            ["uuids", "of", "a"],
            ["a", "type_of", ["installatie#MIVModule"]],
            ["a", "-[r1]-", "b"],
            ["b", "type_of", ["onderdeel#Wegkantkast"]],
            ["r1", "type_of", ["onderdeel#Bevestiging"]]
        ]))
        .unwrap()
    }

    #[test]
    fn test_filter_matches_pattern_only() {
        let store = make_store();
        let result = filter(&store, &make_pattern(), &[A], true);

        assert_eq!(result.nodes[0].uuid, A);
        assert_eq!(result.node_uuids(), BTreeSet::from([A, B, C]));
        let ab = format!("{A}-Bevestiging-{B}");
        let ac = format!("{A}-Bevestiging-{C}");
        assert_eq!(
            result.relation_keys(),
            BTreeSet::from([ab.as_str(), ac.as_str()])
        );
    }

    #[test]
    fn test_filter_without_relations() {
        let store = make_store();
        let result = filter(&store, &make_pattern(), &[A], false);
        assert_eq!(result.nodes.len(), 3);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let store = make_store();
        let pattern = make_pattern();
        let first = filter(&store, &pattern, &[A], true);
        let second = filter(&store, &pattern, &[A], true);
        assert_eq!(first.node_uuids(), second.node_uuids());
        assert_eq!(first.relation_keys(), second.relation_keys());
    }

    #[test]
    fn test_unknown_or_mistyped_seed_matches_nothing() {
        let store = make_store();
        let pattern = make_pattern();
        assert!(filter(&store, &pattern, &[B], true).nodes.is_empty());
        assert!(filter(&store, &pattern, &["nope"], true).nodes.is_empty());
    }

    #[test]
    fn test_directional_marker_restricts_travel() {
        let store = make_store();
        let fed_by = Pattern::from_json(&json!([
            ["uuids", "of", "m"],
            ["m", "type_of", ["installatie#MIVModule"]],
            ["k", "type_of", ["onderdeel#Stroomkring"]],
            ["r1", "type_of", ["onderdeel#Voedt"]],
            ["m", "<-[r1]-", "k"]
        ]))
        .unwrap();
        let result = filter(&store, &fed_by, &[A], true);
        assert_eq!(result.node_uuids(), BTreeSet::from([A, D]));
        assert_eq!(result.relations[0].key, format!("{A}-Voedt-{D}"));

        let feeds = Pattern::from_json(&json!([
            ["uuids", "of", "m"],
            ["m", "type_of", ["installatie#MIVModule"]],
            ["k", "type_of", ["onderdeel#Stroomkring"]],
            ["r1", "type_of", ["onderdeel#Voedt"]],
            ["m", "-[r1]->", "k"]
        ]))
        .unwrap();
        assert_eq!(filter(&store, &feeds, &[A], true).nodes.len(), 1);
    }

    #[test]
    fn test_two_hop_chain() {
        let store = make_store();
        let chain = Pattern::from_json(&json!([
            ["uuids", "of", "k"],
            ["k", "type_of", ["onderdeel#Stroomkring"]],
            ["m", "type_of", ["installatie#MIVModule"]],
            ["w", "type_of", ["onderdeel#Wegkantkast"]],
            ["r1", "type_of", ["onderdeel#Voedt"]],
            ["r2", "type_of", ["onderdeel#Bevestiging"]],
            ["k", "-[r1]->", "m"],
            ["w", "-[r2]-", "m"]
        ]))
        .unwrap();
        let result = filter(&store, &chain, &[D], true);
        assert_eq!(result.node_uuids(), BTreeSet::from([A, B, C, D]));
        assert_eq!(result.relations.len(), 3);
    }
}

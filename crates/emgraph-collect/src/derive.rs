//! Pattern derivation from an example subgraph.
//!
//! Given raw asset and relation records (e.g. an export of one installation),
//! build the pattern that would collect a graph of the same shape: one node
//! variable per connected asset type, one relation variable per relation
//! type, one edge per distinct (source type, relation type, target type).

use std::collections::{BTreeSet, HashMap, HashSet};

use emgraph_client::adapter::{nodes_from_raw, relations_from_raw};
use emgraph_core::{is_directional_type, Node};
use serde_json::Value;

use crate::error::Result;
use crate::pattern::{EdgeDirection, EdgeStatement, Pattern, PatternError, Statement};

/// Derive a pattern from raw asset and relation records.
///
/// Assets that take part in no relation between listed assets are left out.
/// The seed variable is the type of the first connected asset.
pub fn derive_pattern(assets: &[Value], relations: &[Value]) -> Result<Pattern> {
    let nodes = nodes_from_raw(assets)?;
    let relations = relations_from_raw(relations)?;

    let by_uuid: HashMap<&str, &Node> = nodes.iter().map(|n| (n.uuid.as_str(), n)).collect();
    let connected: Vec<(&Node, &str, &Node)> = relations
        .iter()
        .filter_map(|r| {
            let source = by_uuid.get(r.source_uuid.as_str())?;
            let target = by_uuid.get(r.target_uuid.as_str())?;
            Some((*source, r.type_uri.as_str(), *target))
        })
        .collect();
    if connected.is_empty() {
        return Err(PatternError::NoEdgeStatements.into());
    }

    let connected_uuids: HashSet<&str> = connected
        .iter()
        .flat_map(|(s, _, t)| [s.uuid.as_str(), t.uuid.as_str()])
        .collect();

    let mut node_vars: Vec<(&str, String)> = Vec::new();
    for node in nodes.iter().filter(|n| connected_uuids.contains(n.uuid.as_str())) {
        if !node_vars.iter().any(|(t, _)| *t == node.type_uri) {
            let var = variable_name(node_vars.len());
            node_vars.push((node.type_uri.as_str(), var));
        }
    }
    let orphans = nodes.len().saturating_sub(connected_uuids.len());
    if orphans > 0 {
        tracing::debug!(orphans, "Unconnected assets left out of the derived pattern");
    }

    let mut relation_vars: Vec<(&str, String)> = Vec::new();
    let mut triples: BTreeSet<(String, String, String)> = BTreeSet::new();
    let mut edges = Vec::new();
    for (source, type_uri, target) in &connected {
        let relation = match relation_vars.iter().find(|(t, _)| t == type_uri) {
            Some((_, var)) => var.clone(),
            None => {
                let var = format!("r{}", relation_vars.len() + 1);
                relation_vars.push((*type_uri, var.clone()));
                var
            }
        };
        let from = var_of(&node_vars, &source.type_uri);
        let to = var_of(&node_vars, &target.type_uri);
        let directional = is_directional_type(type_uri);

        let mirrored = (to.clone(), relation.clone(), from.clone());
        if !directional && triples.contains(&mirrored) {
            continue;
        }
        if triples.insert((from.clone(), relation.clone(), to.clone())) {
            edges.push(EdgeStatement {
                from,
                relation,
                to,
                direction: if directional {
                    EdgeDirection::Forward
                } else {
                    EdgeDirection::Undirected
                },
            });
        }
    }

    let seed = node_vars
        .first()
        .map(|(_, var)| var.clone())
        .unwrap_or_default();
    let mut statements = vec![Statement::Seed { var: seed }];
    statements.extend(node_vars.iter().chain(&relation_vars).map(|(type_uri, var)| {
        Statement::Type {
            var: var.clone(),
            types: vec![type_uri.to_string()],
        }
    }));
    statements.extend(edges.into_iter().map(Statement::Edge));

    tracing::info!(
        node_types = node_vars.len(),
        relation_types = relation_vars.len(),
        "Derived pattern"
    );
    Ok(Pattern::from_statements(statements)?)
}

fn var_of(vars: &[(&str, String)], type_uri: &str) -> String {
    vars.iter()
        .find(|(t, _)| *t == type_uri)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

/// `a`..`z`, then `aa`, `ab`, ...
fn variable_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NS: &str = "https://wegenenverkeer.data.vlaanderen.be/ns/";
    const A: &str = "00000000-0000-4000-8000-00000000000a";
    const B: &str = "00000000-0000-4000-8000-00000000000b";
    const C: &str = "00000000-0000-4000-8000-00000000000c";
    const D: &str = "00000000-0000-4000-8000-00000000000d";
    const ORPHAN: &str = "00000000-0000-4000-8000-0000000000ff";

    fn make_asset(uuid: &str, short: &str) -> Value {
        json!({
            "@type": format!("{NS}{short}"),
            "assetId.identificator": format!("{uuid}-aW5zdGFsbGF0aWUj"),
        })
    }

    fn make_relation(uuid: &str, short: &str, source: &str, target: &str) -> Value {
        json!({
            "@type": format!("{NS}onderdeel#{short}"),
            "assetId.identificator": uuid,
            "bronAssetId.identificator": source,
            "doelAssetId.identificator": target,
        })
    }

    fn make_assets() -> Vec<Value> {
        vec![
            make_asset(ORPHAN, "onderdeel#Camera"),
            make_asset(A, "installatie#MIVModule"),
            make_asset(B, "onderdeel#Wegkantkast"),
            make_asset(C, "onderdeel#Wegkantkast"),
            make_asset(D, "onderdeel#Stroomkring"),
        ]
    }

    #[test]
    fn test_derive_excludes_orphan_assets() {
        let relations = vec![
            make_relation("10000000-0000-4000-8000-000000000001", "Bevestiging", A, B),
            make_relation("10000000-0000-4000-8000-000000000002", "Bevestiging", C, A),
        ];
        let pattern = derive_pattern(&make_assets(), &relations).unwrap();

        assert_eq!(pattern.seed_var(), "a");
        assert!(pattern.types_of("a").unwrap().contains("MIVModule"));
        assert!(pattern.types_of("b").unwrap().contains("Wegkantkast"));
        assert!(pattern.types_of("c").is_none());
        let all_types: BTreeSet<&String> = pattern
            .statements()
            .iter()
            .filter_map(|s| match s {
                Statement::Type { types, .. } => types.first(),
                _ => None,
            })
            .collect();
        assert!(!all_types.iter().any(|t| t.ends_with("Camera")));
    }

    #[test]
    fn test_mirrored_undirected_edges_collapse() {
        let relations = vec![
            make_relation("10000000-0000-4000-8000-000000000001", "Bevestiging", A, B),
            make_relation("10000000-0000-4000-8000-000000000002", "Bevestiging", C, A),
        ];
        let pattern = derive_pattern(&make_assets(), &relations).unwrap();
        assert_eq!(pattern.edges().len(), 1);
        assert_eq!(pattern.edges()[0].spec(), "-[r1]-");
    }

    #[test]
    fn test_directional_relation_keeps_direction() {
        let relations = vec![
            make_relation("10000000-0000-4000-8000-000000000001", "Bevestiging", A, B),
            make_relation("10000000-0000-4000-8000-000000000003", "Voedt", D, A),
        ];
        let pattern = derive_pattern(&make_assets(), &relations).unwrap();

        let feeds = pattern
            .edges()
            .iter()
            .find(|e| e.relation == "r2")
            .unwrap();
        assert_eq!(feeds.spec(), "-[r2]->");
        assert_eq!(feeds.from, "c");
        assert_eq!(feeds.to, "a");
    }

    #[test]
    fn test_no_connected_assets_is_an_error() {
        let relations = vec![make_relation(
            "10000000-0000-4000-8000-000000000001",
            "Bevestiging",
            A,
            "20000000-0000-4000-8000-000000000000",
        )];
        let err = derive_pattern(&make_assets(), &relations).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CollectError::Pattern(PatternError::NoEdgeStatements)
        ));
    }

    #[test]
    fn test_derived_pattern_round_trips_through_json() {
        let relations = vec![make_relation(
            "10000000-0000-4000-8000-000000000001",
            "Bevestiging",
            A,
            B,
        )];
        let pattern = derive_pattern(&make_assets(), &relations).unwrap();
        let reparsed = Pattern::from_json(&pattern.to_json()).unwrap();
        assert_eq!(reparsed.edges(), pattern.edges());
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(variable_name(0), "a");
        assert_eq!(variable_name(25), "z");
        assert_eq!(variable_name(26), "aa");
        assert_eq!(variable_name(27), "ab");
    }
}

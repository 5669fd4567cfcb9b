//! Pattern-driven, breadth-first collection from the remote data sources.
//!
//! Starting from the seed assets, every wave expands the edges of the current
//! frontier variables: relations are fetched for all stored nodes of the edge's
//! `from` types, filtered by relation type and direction, and inserted. Missing
//! far-end assets are gathered over the whole wave and fetched in one call
//! before the pending relations are retried, once.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;

use chrono::Utc;
use emgraph_core::config::CollectorConfig;
use emgraph_core::{canonical_uuid, Node, NodeSource, Relation, RelationSource};

use crate::error::{CollectError, Result};
use crate::pattern::{EdgeStatement, Pattern};
use crate::store::{
    type_matches, AllowedDirection, GraphStore, MissingEntities, StoreError, Travelled,
};
use crate::types::CollectionReport;

/// The outcome of one collection session.
#[derive(Debug)]
pub struct Collection {
    pub store: GraphStore,
    pub report: CollectionReport,
}

/// Mutable state of one collection run.
struct Session {
    store: GraphStore,
    report: CollectionReport,
}

/// A relation waiting for its far end, with the short types that far end
/// must have for the edge(s) the relation was reached over.
struct PendingRelation {
    relation: Relation,
    far: String,
    far_types: BTreeSet<String>,
}

/// Relation insertions that failed on missing endpoints during one wave.
#[derive(Default)]
struct Wave {
    /// Keyed by relation uuid so a relation reached over two edges is retried once.
    pending: BTreeMap<String, PendingRelation>,
    missing: MissingEntities,
}

/// Collects the subgraph a pattern describes through the data-source capabilities.
pub struct GraphCollector<'a, N: ?Sized, R: ?Sized> {
    nodes: &'a N,
    relations: &'a R,
    config: CollectorConfig,
}

impl<'a, N, R> GraphCollector<'a, N, R>
where
    N: NodeSource + ?Sized,
    R: RelationSource + ?Sized,
{
    /// Create a collector with the default configuration.
    pub fn new(nodes: &'a N, relations: &'a R) -> Self {
        Self {
            nodes,
            relations,
            config: CollectorConfig::default(),
        }
    }

    /// Set a custom collector configuration.
    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Collect the subgraph reachable from `seeds` along `pattern`.
    pub async fn collect<S: AsRef<str>>(
        &self,
        seeds: &[S],
        pattern: &Pattern,
    ) -> Result<Collection> {
        let start = Instant::now();
        let seeds = canonical_seeds(seeds)?;
        let mut session = Session {
            store: GraphStore::new(),
            report: CollectionReport::new(Utc::now()),
        };

        tracing::info!(
            seeds = seeds.len(),
            edges = pattern.edges().len(),
            seed_var = pattern.seed_var(),
            "Starting pattern collection"
        );

        if !seeds.is_empty() {
            for node in self.fetch_nodes(&seeds).await? {
                self.insert_node(&mut session, node)?;
            }
            let absent = seeds
                .iter()
                .filter(|uuid| session.store.get_node_by_uuid(uuid).is_none())
                .count();
            if absent > 0 {
                tracing::warn!(absent, "Seed uuids not returned by the asset source");
            }
        }

        let mut processed = vec![false; pattern.edges().len()];
        let mut frontier = BTreeSet::from([pattern.seed_var().to_string()]);

        while !frontier.is_empty() {
            let mut wave = Wave::default();
            let mut next = BTreeSet::new();
            let mut expanded = 0usize;

            for var in &frontier {
                for (i, edge) in pattern.edges().iter().enumerate() {
                    if processed[i] {
                        continue;
                    }
                    let Some(oriented) = edge.oriented_from(var) else {
                        continue;
                    };
                    processed[i] = true;
                    expanded += 1;
                    next.insert(oriented.to.clone());
                    self.expand_edge(&mut session, &mut wave, pattern, &oriented)
                        .await?;
                }
            }

            if expanded > 0 {
                session.report.waves += 1;
                tracing::debug!(
                    wave = session.report.waves,
                    frontier = ?frontier,
                    edges = expanded,
                    pending = wave.pending.len(),
                    "Wave expanded"
                );
            }

            if !wave.missing.is_empty() {
                self.remediate(&mut session, wave).await?;
            }
            frontier = next;
        }

        let Session { store, mut report } = session;
        report.nodes = store.node_count();
        report.relations = store.relation_count();
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            nodes = report.nodes,
            relations = report.relations,
            waves = report.waves,
            duration_ms = report.duration_ms,
            "Pattern collection complete"
        );
        Ok(Collection { store, report })
    }

    /// Fetch and insert the relations of one oriented edge.
    async fn expand_edge(
        &self,
        session: &mut Session,
        wave: &mut Wave,
        pattern: &Pattern,
        edge: &EdgeStatement,
    ) -> Result<()> {
        let (Some(from_types), Some(relation_types), Some(to_types)) = (
            pattern.types_of(&edge.from),
            pattern.types_of(&edge.relation),
            pattern.types_of(&edge.to),
        ) else {
            return Ok(());
        };

        let sources: BTreeSet<String> = session
            .store
            .get_nodes_by_types(from_types)
            .into_iter()
            .map(|n| n.uuid.clone())
            .collect();
        if sources.is_empty() {
            tracing::debug!(edge = %edge, "No stored nodes to expand from");
            return Ok(());
        }

        let fetched = self.fetch_relations(&sources).await?;
        let allowed = edge.direction.allowed();
        let mut inserted = 0usize;

        for relation in fetched {
            if !type_matches(relation_types, &relation.short_type) {
                continue;
            }
            let Some(far) = far_end(&relation, &sources, allowed) else {
                continue;
            };
            if let Some(node) = session.store.get_node_by_uuid(far) {
                if !type_matches(to_types, &node.short_type) {
                    continue;
                }
            }
            let far = far.to_string();

            match session.store.add_relation(relation.clone()) {
                Ok(()) => inserted += 1,
                Err(StoreError::DuplicateEntity { uuid }) if self.config.ignore_duplicates => {
                    tracing::trace!(uuid = %uuid, "Relation already stored");
                    session.report.duplicates_skipped += 1;
                }
                Err(StoreError::MissingEntities(missing)) => {
                    wave.missing.merge(missing);
                    wave.pending
                        .entry(relation.uuid.clone())
                        .or_insert_with(|| PendingRelation {
                            relation,
                            far,
                            far_types: BTreeSet::new(),
                        })
                        .far_types
                        .extend(to_types.iter().cloned());
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(
            edge = %edge,
            sources = sources.len(),
            inserted,
            "Edge expanded"
        );
        Ok(())
    }

    /// Fetch the wave's missing endpoints in one go and retry its pending relations.
    ///
    /// A fetched node is stored when at least one pending relation accepts its
    /// type. Each relation is then checked against its own far-end types, so
    /// a node stored for one edge never lets another edge's relation in.
    async fn remediate(&self, session: &mut Session, wave: Wave) -> Result<()> {
        let Wave { pending, missing } = wave;

        tracing::info!(
            missing = missing.len(),
            pending = pending.len(),
            "Fetching missing relation endpoints"
        );
        let fetched = self.fetch_nodes(missing.uuids()).await?;
        session.report.remediation_fetches += 1;

        let accepted = |node: &Node| {
            pending
                .values()
                .any(|p| p.far == node.uuid && type_matches(&p.far_types, &node.short_type))
        };
        let mut off_pattern = BTreeSet::new();
        for node in fetched {
            if !missing.uuids().contains(&node.uuid) {
                continue;
            }
            if accepted(&node) {
                self.insert_node(session, node)?;
            } else {
                off_pattern.insert(node.uuid);
            }
        }

        let mut unresolved = MissingEntities::default();
        for pending in pending.into_values() {
            let PendingRelation {
                relation,
                far,
                far_types,
            } = pending;
            let on_pattern = match session.store.get_node_by_uuid(&far) {
                Some(node) => type_matches(&far_types, &node.short_type),
                None => !off_pattern.contains(&far),
            };
            if !on_pattern {
                tracing::debug!(uuid = %relation.uuid, far = %far, "Far end is off-pattern");
                session.report.off_pattern_dropped += 1;
                continue;
            }

            match session.store.add_relation(relation) {
                Ok(()) => {}
                Err(StoreError::DuplicateEntity { .. }) if self.config.ignore_duplicates => {
                    session.report.duplicates_skipped += 1;
                }
                Err(StoreError::MissingEntities(still_missing)) => unresolved.merge(still_missing),
                Err(e) => return Err(e.into()),
            }
        }

        if !unresolved.is_empty() {
            tracing::error!(
                unresolved = %unresolved,
                "Relation endpoints still missing after refetch"
            );
            return Err(StoreError::MissingEntities(unresolved).into());
        }
        Ok(())
    }

    fn insert_node(&self, session: &mut Session, node: Node) -> Result<()> {
        match session.store.add_node(node) {
            Ok(()) => Ok(()),
            Err(StoreError::DuplicateEntity { uuid }) if self.config.ignore_duplicates => {
                tracing::trace!(uuid = %uuid, "Node already stored");
                session.report.duplicates_skipped += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_nodes(&self, uuids: &BTreeSet<String>) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for batch in batches(uuids, self.config.batch_size) {
            nodes.extend(self.nodes.fetch_nodes_by_uuids(&batch).await?);
        }
        Ok(nodes)
    }

    /// Relations touching `uuids`, deduplicated across batches.
    async fn fetch_relations(&self, uuids: &BTreeSet<String>) -> Result<Vec<Relation>> {
        let mut seen = HashSet::new();
        let mut relations = Vec::new();
        for batch in batches(uuids, self.config.batch_size) {
            let fetched = self
                .relations
                .fetch_relations_by_endpoint_uuids(&batch)
                .await?;
            relations.extend(fetched.into_iter().filter(|r| seen.insert(r.uuid.clone())));
        }
        Ok(relations)
    }
}

/// The endpoint reached when following `relation` away from `sources`.
fn far_end<'r>(
    relation: &'r Relation,
    sources: &BTreeSet<String>,
    allowed: AllowedDirection,
) -> Option<&'r str> {
    let directional = relation.is_directional();
    if sources.contains(&relation.source_uuid)
        && allowed.permits(Travelled::Outgoing, directional)
    {
        return Some(&relation.target_uuid);
    }
    if sources.contains(&relation.target_uuid)
        && allowed.permits(Travelled::Incoming, directional)
    {
        return Some(&relation.source_uuid);
    }
    None
}

fn batches(uuids: &BTreeSet<String>, size: usize) -> Vec<BTreeSet<String>> {
    let all: Vec<&String> = uuids.iter().collect();
    all.chunks(size.max(1))
        .map(|chunk| chunk.iter().map(|uuid| (*uuid).clone()).collect())
        .collect()
}

fn canonical_seeds<S: AsRef<str>>(seeds: &[S]) -> Result<BTreeSet<String>> {
    seeds
        .iter()
        .map(|raw| {
            canonical_uuid(raw.as_ref()).ok_or_else(|| CollectError::InvalidSeed {
                uuid: raw.as_ref().to_string(),
            })
        })
        .collect()
}

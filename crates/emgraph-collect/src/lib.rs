//! emgraph-collect: Pattern-driven subgraph collection for EM-Infra assets.
//!
//! Expands seed assets along a declarative pattern of node and relation
//! types, fetching through the `NodeSource` / `RelationSource` capabilities
//! into an in-memory graph, then replays a (sub-)pattern over that graph
//! to produce the matched nodes and relations.

pub mod collector;
pub mod derive;
pub mod error;
pub mod filter;
pub mod pattern;
pub mod store;
pub mod types;

pub use collector::{Collection, GraphCollector};
pub use derive::derive_pattern;
pub use error::CollectError;
pub use filter::{filter, FilterResult, MatchedRelation};
pub use pattern::{EdgeDirection, EdgeStatement, Pattern, PatternError, Statement};
pub use store::{AllowedDirection, GraphStore, MissingEntities, StoreError};
pub use types::{CollectRequest, CollectResult, CollectionReport, DeriveRequest, DeriveResult};

use emgraph_core::config::CollectorConfig;
use emgraph_core::{NodeSource, RelationSource};

/// Collect the subgraph `pattern` describes from a source serving both capabilities.
pub async fn collect<S, T>(
    source: &S,
    seeds: &[T],
    pattern: &Pattern,
    config: &CollectorConfig,
) -> error::Result<Collection>
where
    S: NodeSource + RelationSource + ?Sized,
    T: AsRef<str>,
{
    GraphCollector::new(source, source)
        .with_config(config.clone())
        .collect(seeds, pattern)
        .await
}

/// Runs collect-and-filter requests against one data source.
pub struct CollectEngine<S> {
    source: S,
    config: CollectorConfig,
}

impl<S> CollectEngine<S>
where
    S: NodeSource + RelationSource,
{
    /// Create a new engine with the default collector configuration.
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: CollectorConfig::default(),
        }
    }

    /// Set a custom collector configuration.
    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Collect along `request.pattern`, then filter with `request.filter_pattern`.
    ///
    /// Both patterns, including the filter pattern's levels, are validated
    /// before anything is fetched.
    pub async fn run(&self, request: CollectRequest) -> error::Result<CollectResult> {
        let pattern = Pattern::from_json(&request.pattern)?;
        let filter_pattern = match &request.filter_pattern {
            Some(raw) => Pattern::from_json(raw)?,
            None => pattern.clone(),
        };
        let levels = filter_pattern.level_map()?;

        let collection = collect(&self.source, &request.seeds, &pattern, &self.config).await?;

        let include_relations = request
            .include_relations
            .unwrap_or(self.config.include_relations);
        let matched = filter(
            &collection.store,
            &filter_pattern,
            &request.seeds,
            include_relations,
        );

        tracing::info!(
            nodes = matched.nodes.len(),
            relations = matched.relations.len(),
            "Collect request complete"
        );

        Ok(CollectResult {
            nodes: matched.nodes,
            relations: matched.relations,
            levels,
            report: collection.report,
        })
    }
}

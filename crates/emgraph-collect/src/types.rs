//! Request and response types for collection operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use emgraph_core::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::MatchedRelation;

/// Request to collect and filter a subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectRequest {
    /// Seed asset uuids (plain uuids or OTL identificators).
    pub seeds: Vec<String>,
    /// Pattern driving the remote collection.
    pub pattern: Value,
    /// Pattern replayed on the collected graph. Defaults to `pattern`.
    pub filter_pattern: Option<Value>,
    /// Include matched relations in the result (default: from config).
    pub include_relations: Option<bool>,
}

/// Result of a collect-and-filter run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectResult {
    pub nodes: Vec<Node>,
    pub relations: Vec<MatchedRelation>,
    /// Short type → rendering level, from the filter pattern's level statements.
    pub levels: BTreeMap<String, i64>,
    pub report: CollectionReport,
}

/// Statistics about one collection session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub started_at: DateTime<Utc>,
    pub waves: usize,
    pub nodes: usize,
    pub relations: usize,
    /// Number of missing-endpoint refetches (at most one per wave).
    pub remediation_fetches: usize,
    pub duplicates_skipped: usize,
    /// Relations dropped because their far end turned out to be off-pattern.
    pub off_pattern_dropped: usize,
    pub duration_ms: u64,
}

impl CollectionReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            waves: 0,
            nodes: 0,
            relations: 0,
            remediation_fetches: 0,
            duplicates_skipped: 0,
            off_pattern_dropped: 0,
            duration_ms: 0,
        }
    }
}

/// Request to derive a pattern from an example subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveRequest {
    pub assets: Vec<Value>,
    pub relations: Vec<Value>,
}

/// A derived pattern in its JSON tuple form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveResult {
    pub pattern: Value,
}

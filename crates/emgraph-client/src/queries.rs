//! Asset and asset-relation searches, and the data-source capabilities built on them.

use std::collections::BTreeSet;

use async_trait::async_trait;
use emgraph_core::{Node, NodeSource, Relation, RelationSource, SourceError};

use crate::adapter;
use crate::client::{ClientError, EmInfraClient};

pub const ASSETS_SEARCH_PATH: &str = "core/api/otl/assets/search";
pub const RELATIONS_SEARCH_PATH: &str = "core/api/otl/assetrelaties/search";

impl EmInfraClient {
    /// Raw asset records for the given uuids.
    pub async fn search_assets(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let filters = serde_json::json!({ "uuid": uuids });
        self.search_all(ASSETS_SEARCH_PATH, filters).await
    }

    /// Raw relation records with any of the given uuids as source or target.
    pub async fn search_relations(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let filters = serde_json::json!({ "asset": uuids });
        self.search_all(RELATIONS_SEARCH_PATH, filters).await
    }
}

#[async_trait]
impl NodeSource for EmInfraClient {
    async fn fetch_nodes_by_uuids(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<Node>, SourceError> {
        let records = self.search_assets(uuids).await?;
        let nodes = adapter::nodes_from_raw(&records)?;
        tracing::debug!(requested = uuids.len(), received = nodes.len(), "Fetched assets");
        Ok(nodes)
    }
}

#[async_trait]
impl RelationSource for EmInfraClient {
    async fn fetch_relations_by_endpoint_uuids(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<Relation>, SourceError> {
        let records = self.search_relations(uuids).await?;
        let relations = adapter::relations_from_raw(&records)?;
        tracing::debug!(
            endpoints = uuids.len(),
            received = relations.len(),
            "Fetched asset relations"
        );
        Ok(relations)
    }
}

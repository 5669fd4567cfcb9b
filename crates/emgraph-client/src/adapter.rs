//! Normalization of raw OTL records into `Node` / `Relation`.
//!
//! The search endpoints return JSON-LD with namespaced keys
//! (`AIMObject.assetId` → `DtcIdentificator.identificator`). Exports and
//! hand-written fixtures often use flattened dotted keys instead
//! (`assetId.identificator`, `typeURI`). Both shapes are accepted.

use emgraph_core::{canonical_uuid, Node, Relation, SourceError};
use serde_json::Value;

const TYPE_KEYS: &[&[&str]] = &[&["@type"], &["typeURI"]];

const ASSET_ID_KEYS: &[&[&str]] = &[
    &["AIMObject.assetId", "DtcIdentificator.identificator"],
    &["RelatieObject.assetId", "DtcIdentificator.identificator"],
    &["assetId.identificator"],
    &["assetId", "identificator"],
];

const ACTIVE_KEYS: &[&[&str]] = &[&["AIMDBStatus.isActief"], &["isActief"]];

const SOURCE_KEYS: &[&[&str]] = &[
    &["RelatieObject.bronAssetId", "DtcIdentificator.identificator"],
    &["bronAssetId.identificator"],
    &["bronAssetId", "identificator"],
    &["RelatieObject.bron", "@id"],
];

const TARGET_KEYS: &[&[&str]] = &[
    &["RelatieObject.doelAssetId", "DtcIdentificator.identificator"],
    &["doelAssetId.identificator"],
    &["doelAssetId", "identificator"],
    &["RelatieObject.doel", "@id"],
];

/// Normalize a raw asset record.
pub fn node_from_raw(raw: &Value) -> Result<Node, SourceError> {
    let attributes = as_object(raw)?;
    let type_uri = lookup_str(raw, TYPE_KEYS).ok_or_else(|| invalid(raw, "missing type"))?;
    let uuid = lookup_uuid(raw, ASSET_ID_KEYS)
        .or_else(|| id_uuid(raw))
        .ok_or_else(|| invalid(raw, "missing asset identificator"))?;
    let active = lookup(raw, ACTIVE_KEYS)
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok(Node::new(uuid, type_uri)
        .with_active(active)
        .with_attributes(attributes))
}

/// Normalize a raw asset relation record.
pub fn relation_from_raw(raw: &Value) -> Result<Relation, SourceError> {
    let attributes = as_object(raw)?;
    let type_uri = lookup_str(raw, TYPE_KEYS).ok_or_else(|| invalid(raw, "missing type"))?;
    let uuid = lookup_uuid(raw, ASSET_ID_KEYS)
        .or_else(|| id_uuid(raw))
        .ok_or_else(|| invalid(raw, "missing relation identificator"))?;
    let source = lookup_uuid(raw, SOURCE_KEYS).ok_or_else(|| invalid(raw, "missing bronAssetId"))?;
    let target = lookup_uuid(raw, TARGET_KEYS).ok_or_else(|| invalid(raw, "missing doelAssetId"))?;

    Ok(Relation::new(uuid, type_uri, source, target).with_attributes(attributes))
}

/// Normalize a batch of raw asset records.
pub fn nodes_from_raw(records: &[Value]) -> Result<Vec<Node>, SourceError> {
    records.iter().map(node_from_raw).collect()
}

/// Normalize a batch of raw relation records.
pub fn relations_from_raw(records: &[Value]) -> Result<Vec<Relation>, SourceError> {
    records.iter().map(relation_from_raw).collect()
}

fn as_object(raw: &Value) -> Result<serde_json::Map<String, Value>, SourceError> {
    raw.as_object()
        .cloned()
        .ok_or_else(|| SourceError::InvalidRecord("record is not a JSON object".to_string()))
}

fn lookup<'a>(raw: &'a Value, candidates: &[&[&str]]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| {
        path.iter()
            .try_fold(raw, |value, key| value.get(*key))
            .filter(|v| !v.is_null())
    })
}

fn lookup_str<'a>(raw: &'a Value, candidates: &[&[&str]]) -> Option<&'a str> {
    lookup(raw, candidates).and_then(Value::as_str)
}

/// First candidate that holds a parseable uuid. `@id` style URLs resolve to
/// their last path segment.
fn lookup_uuid(raw: &Value, candidates: &[&[&str]]) -> Option<String> {
    candidates.iter().find_map(|path| {
        let value = path.iter().try_fold(raw, |value, key| value.get(*key))?;
        value.as_str().and_then(uuid_from_reference)
    })
}

fn id_uuid(raw: &Value) -> Option<String> {
    raw.get("@id").and_then(Value::as_str).and_then(uuid_from_reference)
}

fn uuid_from_reference(reference: &str) -> Option<String> {
    let segment = reference.rsplit('/').next().unwrap_or(reference);
    canonical_uuid(segment)
}

fn invalid(raw: &Value, reason: &str) -> SourceError {
    let id = raw.get("@id").and_then(Value::as_str).unwrap_or("<unknown>");
    SourceError::InvalidRecord(format!("{reason} ({id})"))
}

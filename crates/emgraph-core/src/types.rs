//! Core domain types for the EM-Infra asset graph.
//!
//! Assets and asset relations as they look after normalization from the
//! OTL API payloads. Everything the collector stores is one of these two.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Type URIs ─────────────────────────────────────────────────────

/// Namespace of the OTL (object type library) type URIs.
pub const OTL_NAMESPACE: &str = "https://wegenenverkeer.data.vlaanderen.be/ns/";

/// Relation types whose direction carries meaning.
///
/// Every other relation type is symmetric for traversal purposes.
pub const DIRECTIONAL_RELATION_TYPES: &[&str] = &[
    "HeeftAanvullendeGeometrie",
    "HeeftBetrokkene",
    "HeeftBijlage",
    "HeeftNetwerkProtectie",
    "HeeftNetwerktoegang",
    "HeeftToegangsprocedure",
    "HoortBij",
    "IsAdmOnderdeelVan",
    "IsInspectieVan",
    "IsNetwerkECC",
    "IsSWGehostOp",
    "IsSWOnderdeelVan",
    "LigtOp",
    "Omhult",
    "Voedt",
];

/// The fragment of a type URI after its last `#` or `:` separator.
///
/// Already-short types are returned unchanged.
pub fn short_type(type_uri: &str) -> &str {
    match type_uri.rfind(['#', ':']) {
        Some(pos) => &type_uri[pos + 1..],
        None => type_uri,
    }
}

/// Whether relations of this type (short or namespaced) are directional.
pub fn is_directional_type(type_uri: &str) -> bool {
    DIRECTIONAL_RELATION_TYPES.contains(&short_type(type_uri))
}

/// Canonical lowercase hyphenated form of a uuid.
///
/// Accepts plain uuids in any case as well as OTL identificators, which are a
/// uuid followed by `-` and a type code.
pub fn canonical_uuid(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = raw.get(..36).unwrap_or(raw);
    Uuid::parse_str(candidate).ok().map(|u| u.to_string())
}

fn default_true() -> bool {
    true
}

// ── Node ──────────────────────────────────────────────────────────

/// An asset in the remote domain model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub uuid: String,
    /// Full namespaced type, e.g. `https://…/ns/installatie#MIVModule`.
    pub type_uri: String,
    /// Fragment used for pattern matching, e.g. `MIVModule`.
    pub short_type: String,
    /// Inactive assets are still collected but flagged.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Unmodeled attributes, passed through verbatim.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    pub fn new(uuid: impl Into<String>, type_uri: impl Into<String>) -> Self {
        let type_uri = type_uri.into();
        Self {
            uuid: uuid.into(),
            short_type: short_type(&type_uri).to_string(),
            type_uri,
            active: true,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_attributes(
        mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }
}

// ── Relation ──────────────────────────────────────────────────────

/// A typed edge between two assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub uuid: String,
    pub type_uri: String,
    pub short_type: String,
    pub source_uuid: String,
    pub target_uuid: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Relation {
    pub fn new(
        uuid: impl Into<String>,
        type_uri: impl Into<String>,
        source_uuid: impl Into<String>,
        target_uuid: impl Into<String>,
    ) -> Self {
        let type_uri = type_uri.into();
        Self {
            uuid: uuid.into(),
            short_type: short_type(&type_uri).to_string(),
            type_uri,
            source_uuid: source_uuid.into(),
            target_uuid: target_uuid.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attributes(
        mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether this relation's type is directional.
    pub fn is_directional(&self) -> bool {
        is_directional_type(&self.short_type)
    }

    /// The endpoint opposite `uuid`, if `uuid` is one of the endpoints.
    pub fn other_end(&self, uuid: &str) -> Option<&str> {
        if self.source_uuid == uuid {
            Some(&self.target_uuid)
        } else if self.target_uuid == uuid {
            Some(&self.source_uuid)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_strips_namespace() {
        assert_eq!(
            short_type("https://wegenenverkeer.data.vlaanderen.be/ns/installatie#MIVModule"),
            "MIVModule"
        );
        assert_eq!(short_type("onderdeel#Bevestiging"), "Bevestiging");
        assert_eq!(short_type("lgc:installatie#Kast"), "Kast");
        assert_eq!(short_type("lgc:Kast"), "Kast");
        assert_eq!(short_type("Wegkantkast"), "Wegkantkast");
    }

    #[test]
    fn test_directional_types() {
        assert!(is_directional_type("onderdeel#Voedt"));
        assert!(is_directional_type(
            "https://wegenenverkeer.data.vlaanderen.be/ns/onderdeel#HoortBij"
        ));
        assert!(!is_directional_type("onderdeel#Bevestiging"));
        assert!(!is_directional_type("onderdeel#Sturing"));
    }

    #[test]
    fn test_canonical_uuid() {
        assert_eq!(
            canonical_uuid("0C2E1B9A-57D3-4B0E-9F2A-7E0D1C2B3A4F").as_deref(),
            Some("0c2e1b9a-57d3-4b0e-9f2a-7e0d1c2b3a4f")
        );
        // OTL identificator: uuid + type code suffix.
        assert_eq!(
            canonical_uuid("0c2e1b9a-57d3-4b0e-9f2a-7e0d1c2b3a4f-b25kZXJkZWVsI1N0dXJpbmc")
                .as_deref(),
            Some("0c2e1b9a-57d3-4b0e-9f2a-7e0d1c2b3a4f")
        );
        assert_eq!(canonical_uuid("not-a-uuid"), None);
        assert_eq!(canonical_uuid(""), None);
    }

    #[test]
    fn test_node_new_derives_short_type() {
        let node = Node::new(
            "n1",
            "https://wegenenverkeer.data.vlaanderen.be/ns/onderdeel#Wegkantkast",
        );
        assert_eq!(node.short_type, "Wegkantkast");
        assert!(node.active);
        assert!(!node.with_active(false).active);
    }

    #[test]
    fn test_relation_other_end() {
        let rel = Relation::new("r1", "onderdeel#Sturing", "a", "b");
        assert_eq!(rel.other_end("a"), Some("b"));
        assert_eq!(rel.other_end("b"), Some("a"));
        assert_eq!(rel.other_end("c"), None);
        assert!(!rel.is_directional());
    }
}

//! Tuple-based pattern language.
//!
//! A pattern is a list of 3-tuples, usually written as JSON:
//!
//! ```text
//! [["uuids", "of", "a"],
//!  ["a", "type_of", ["installatie#MIVModule"]],
//!  ["a", "-[r1]-", "b"],
//!  ["b", "type_of", ["onderdeel#Wegkantkast"]],
//!  ["r1", "type_of", ["onderdeel#Bevestiging"]],
//!  ["b", "level", 1]]
//! ```
//!
//! Entries are parsed once into tagged [`Statement`]s. Tuples that are none of
//! the known statement kinds are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use emgraph_core::short_type;
use regex::Regex;
use serde_json::{json, Value};

use crate::store::AllowedDirection;

pub const SEED_SUBJECT: &str = "uuids";
pub const SEED_PREDICATE: &str = "of";
pub const TYPE_PREDICATE: &str = "type_of";
pub const LEVEL_PREDICATE: &str = "level";

/// Structural problems with a pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Pattern has no (\"uuids\", \"of\", _) statement")]
    MissingSeed,

    #[error("Pattern has {count} seed statements, exactly one is allowed")]
    MultipleSeeds { count: usize },

    #[error("Pattern has no type_of statements")]
    NoTypeStatements,

    #[error("Pattern has no edge statements")]
    NoEdgeStatements,

    #[error("Variable {var} is used but has no type_of statement")]
    UntypedVariable { var: String },

    #[error("Type {type_name} is assigned level {existing} and level {conflicting}")]
    LevelConflict {
        type_name: String,
        existing: i64,
        conflicting: i64,
    },

    #[error("Invalid statement {statement}: {reason}")]
    InvalidStatement { statement: String, reason: String },

    #[error("Pattern must be a JSON array of 3-element arrays")]
    NotAList,
}

// ── Edges ─────────────────────────────────────────────────────────

/// Direction marker of an edge spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    /// `-[rN]-`
    Undirected,
    /// `-[rN]->`
    Forward,
    /// `<-[rN]-`
    Reversed,
    /// `<-[rN]->`
    Both,
}

impl EdgeDirection {
    /// The marker seen from the other endpoint.
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
            other => other,
        }
    }

    /// Traversal constraint for walking from the edge's `from` side.
    pub fn allowed(self) -> AllowedDirection {
        match self {
            Self::Forward => AllowedDirection::Outgoing,
            Self::Reversed => AllowedDirection::Incoming,
            Self::Undirected | Self::Both => AllowedDirection::Any,
        }
    }
}

fn edge_grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^(<)?-\[(r\d+)\]-(>)?$").expect("edge grammar is valid")
    })
}

/// `(from, edge_spec, to)` with the relation variable pulled out of the spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeStatement {
    pub from: String,
    pub relation: String,
    pub to: String,
    pub direction: EdgeDirection,
}

impl EdgeStatement {
    /// Parse an edge spec. Strings outside the grammar are not edges.
    pub fn parse(from: &str, spec: &str, to: &str) -> Option<Self> {
        let caps = edge_grammar().captures(spec)?;
        let direction = match (caps.get(1).is_some(), caps.get(3).is_some()) {
            (false, false) => EdgeDirection::Undirected,
            (false, true) => EdgeDirection::Forward,
            (true, false) => EdgeDirection::Reversed,
            (true, true) => EdgeDirection::Both,
        };
        Some(Self {
            from: from.to_string(),
            relation: caps[2].to_string(),
            to: to.to_string(),
            direction,
        })
    }

    /// Render the edge spec, e.g. `<-[r1]-`.
    pub fn spec(&self) -> String {
        let (head, tail) = match self.direction {
            EdgeDirection::Undirected => ("", ""),
            EdgeDirection::Forward => ("", ">"),
            EdgeDirection::Reversed => ("<", ""),
            EdgeDirection::Both => ("<", ">"),
        };
        format!("{head}-[{}]-{tail}", self.relation)
    }

    /// Swap endpoints and flip the direction marker.
    pub fn reverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            relation: self.relation.clone(),
            to: self.from.clone(),
            direction: self.direction.reversed(),
        }
    }

    /// This edge seen from `var`, or `None` if `var` is not an endpoint.
    pub fn oriented_from(&self, var: &str) -> Option<Self> {
        if self.from == var {
            Some(self.clone())
        } else if self.to == var {
            Some(self.reverse())
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.from, self.spec(), self.to)
    }
}

// ── Statements ────────────────────────────────────────────────────

/// One parsed pattern tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `("uuids", "of", var)`
    Seed { var: String },
    /// `(var, "type_of", [type, ...])`
    Type { var: String, types: Vec<String> },
    Edge(EdgeStatement),
    /// `(var, "level", n)`
    Level { var: String, level: i64 },
}

impl Statement {
    /// Parse one JSON tuple. `Ok(None)` for tuples that are not statements.
    pub fn from_json(entry: &Value) -> Result<Option<Self>, PatternError> {
        let Some([subject, predicate, object]) = entry.as_array().map(Vec::as_slice) else {
            return Ok(None);
        };
        let (Some(subject), Some(predicate)) = (subject.as_str(), predicate.as_str()) else {
            return Ok(None);
        };

        match predicate {
            SEED_PREDICATE if subject == SEED_SUBJECT => {
                Ok(object.as_str().map(|var| Statement::Seed {
                    var: var.to_string(),
                }))
            }
            TYPE_PREDICATE => {
                let types = match object {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .map(|t| t.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid(entry, "type list must hold strings"))?,
                    _ => return Err(invalid(entry, "expected a type or a list of types")),
                };
                Ok(Some(Statement::Type {
                    var: subject.to_string(),
                    types,
                }))
            }
            LEVEL_PREDICATE => {
                let level = object
                    .as_i64()
                    .ok_or_else(|| invalid(entry, "level must be an integer"))?;
                Ok(Some(Statement::Level {
                    var: subject.to_string(),
                    level,
                }))
            }
            spec => Ok(object
                .as_str()
                .and_then(|to| EdgeStatement::parse(subject, spec, to))
                .map(Statement::Edge)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Statement::Seed { var } => json!([SEED_SUBJECT, SEED_PREDICATE, var]),
            Statement::Type { var, types } => json!([var, TYPE_PREDICATE, types]),
            Statement::Edge(edge) => json!([edge.from, edge.spec(), edge.to]),
            Statement::Level { var, level } => json!([var, LEVEL_PREDICATE, level]),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Edge(edge) => write!(f, "{edge}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

fn invalid(entry: &Value, reason: &str) -> PatternError {
    PatternError::InvalidStatement {
        statement: entry.to_string(),
        reason: reason.to_string(),
    }
}

// ── Pattern ───────────────────────────────────────────────────────

/// A validated pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    statements: Vec<Statement>,
    seed: String,
    /// Variable → short types (union over all its type_of statements).
    types: BTreeMap<String, BTreeSet<String>>,
    edges: Vec<EdgeStatement>,
}

impl Pattern {
    /// Parse and validate a JSON pattern.
    pub fn from_json(value: &Value) -> Result<Self, PatternError> {
        let entries = value.as_array().ok_or(PatternError::NotAList)?;
        let mut statements = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(statement) = Statement::from_json(entry)? {
                statements.push(statement);
            }
        }
        Self::from_statements(statements)
    }

    /// Validate already-parsed statements.
    ///
    /// Levels are only checked by [`Pattern::level_map`].
    pub fn from_statements(statements: Vec<Statement>) -> Result<Self, PatternError> {
        let seeds: Vec<&String> = statements
            .iter()
            .filter_map(|s| match s {
                Statement::Seed { var } => Some(var),
                _ => None,
            })
            .collect();
        let seed = match seeds.as_slice() {
            [] => return Err(PatternError::MissingSeed),
            [var] => (*var).clone(),
            many => return Err(PatternError::MultipleSeeds { count: many.len() }),
        };

        let mut types: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut edges = Vec::new();
        for statement in &statements {
            match statement {
                Statement::Type { var, types: list } => {
                    types
                        .entry(var.clone())
                        .or_default()
                        .extend(list.iter().map(|t| short_type(t).to_string()));
                }
                Statement::Edge(edge) => edges.push(edge.clone()),
                _ => {}
            }
        }

        if types.is_empty() {
            return Err(PatternError::NoTypeStatements);
        }
        if edges.is_empty() {
            return Err(PatternError::NoEdgeStatements);
        }

        let used = std::iter::once(&seed)
            .chain(edges.iter().flat_map(|e| [&e.from, &e.relation, &e.to]));
        for var in used {
            if types.get(var).map_or(true, BTreeSet::is_empty) {
                return Err(PatternError::UntypedVariable { var: var.clone() });
            }
        }

        Ok(Self {
            statements,
            seed,
            types,
            edges,
        })
    }

    /// The variable bound to the caller's seed uuids.
    pub fn seed_var(&self) -> &str {
        &self.seed
    }

    /// Short types of a variable.
    pub fn types_of(&self, var: &str) -> Option<&BTreeSet<String>> {
        self.types.get(var)
    }

    pub fn edges(&self) -> &[EdgeStatement] {
        &self.edges
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Short type → level, from the level statements.
    pub fn level_map(&self) -> Result<BTreeMap<String, i64>, PatternError> {
        let mut levels: BTreeMap<String, i64> = BTreeMap::new();
        for statement in &self.statements {
            let Statement::Level { var, level } = statement else {
                continue;
            };
            let Some(types) = self.types.get(var) else {
                continue;
            };
            for type_name in types {
                match levels.get(type_name) {
                    Some(&existing) if existing != *level => {
                        return Err(PatternError::LevelConflict {
                            type_name: type_name.clone(),
                            existing,
                            conflicting: *level,
                        });
                    }
                    Some(_) => {}
                    None => {
                        levels.insert(type_name.clone(), *level);
                    }
                }
            }
        }
        Ok(levels)
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.statements.iter().map(Statement::to_json).collect())
    }
}

//! Clause and query model shared by every backend

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Operator named by a clause's type token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOp {
    Equal,
    Like,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl ClauseOp {
    /// Resolve a type token (case-sensitive, with aliases)
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" | "==" | "equal" => Some(ClauseOp::Equal),
            "~" | "~=" | "like" => Some(ClauseOp::Like),
            ">" | "gt" => Some(ClauseOp::Gt),
            "<" | "lt" => Some(ClauseOp::Lt),
            ">=" | "gte" => Some(ClauseOp::Gte),
            "<=" | "lte" => Some(ClauseOp::Lte),
            _ => None,
        }
    }

    /// Whether this operator is a numeric comparison (weight only)
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            ClauseOp::Gt | ClauseOp::Lt | ClauseOp::Gte | ClauseOp::Lte
        )
    }

    /// Apply a numeric comparison; `Like` never matches a number
    pub fn compare(&self, actual: f64, operand: f64) -> bool {
        match self {
            ClauseOp::Equal => actual == operand,
            ClauseOp::Gt => actual > operand,
            ClauseOp::Lt => actual < operand,
            ClauseOp::Gte => actual >= operand,
            ClauseOp::Lte => actual <= operand,
            ClauseOp::Like => false,
        }
    }
}

/// Single-field filter condition. The zero value is the "any" clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Operator token, e.g. `=`, `like`, `gte`
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Right operand of the operation
    #[serde(default)]
    pub value: String,
}

impl Clause {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Clause matching every value
    pub fn any() -> Self {
        Self::default()
    }

    pub fn equal(value: impl Into<String>) -> Self {
        Self::new("=", value)
    }

    pub fn like(value: impl Into<String>) -> Self {
        Self::new("~", value)
    }

    /// True when both type and value are empty
    pub fn is_any(&self) -> bool {
        self.kind.is_empty() && self.value.is_empty()
    }

    /// Resolved operator, `None` for unrecognized tokens
    pub fn op(&self) -> Option<ClauseOp> {
        ClauseOp::parse(&self.kind)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}

/// Error parsing the `"<type> <value>"` form of a clause
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid clause '{0}': expecting '<type> <value>'")]
pub struct ParseClauseError(pub String);

/// Parses the query-string form `"<type> <value>"`: exactly two
/// whitespace-separated tokens. A blank string is the "any" clause.
impl FromStr for Clause {
    type Err = ParseClauseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [] => Ok(Clause::any()),
            [kind, value] => Ok(Clause::new(*kind, *value)),
            _ => Err(ParseClauseError(s.to_string())),
        }
    }
}

/// Triple field a clause applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Source,
    Predicate,
    Target,
    Weight,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Source, Field::Predicate, Field::Target, Field::Weight];

    /// Field name, also the relational column name
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Source => "source",
            Field::Predicate => "predicate",
            Field::Target => "target",
            Field::Weight => "weight",
        }
    }
}

/// Conjunction of up to four clauses plus an optional result cap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Clause::is_any")]
    pub source: Clause,
    #[serde(default, skip_serializing_if = "Clause::is_any")]
    pub predicate: Clause,
    #[serde(default, skip_serializing_if = "Clause::is_any")]
    pub target: Clause,
    #[serde(default, skip_serializing_if = "Clause::is_any")]
    pub weight: Clause,
    /// Maximum number of results, `0` means unlimited
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: usize,
}

fn is_zero(limit: &usize) -> bool {
    *limit == 0
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, clause: Clause) -> Self {
        self.source = clause;
        self
    }

    pub fn with_predicate(mut self, clause: Clause) -> Self {
        self.predicate = clause;
        self
    }

    pub fn with_target(mut self, clause: Clause) -> Self {
        self.target = clause;
        self
    }

    pub fn with_weight(mut self, clause: Clause) -> Self {
        self.weight = clause;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Clause for the given field
    pub fn clause(&self, field: Field) -> &Clause {
        match field {
            Field::Source => &self.source,
            Field::Predicate => &self.predicate,
            Field::Target => &self.target,
            Field::Weight => &self.weight,
        }
    }

    /// True if all four clauses are "any"
    pub fn is_any(&self) -> bool {
        self.source.is_any()
            && self.predicate.is_any()
            && self.target.is_any()
            && self.weight.is_any()
    }

    /// Non-any clauses keyed by field name. Iteration order is unspecified.
    pub fn map(&self) -> HashMap<&'static str, Clause> {
        self.clauses()
            .into_iter()
            .map(|(field, clause)| (field.as_str(), clause.clone()))
            .collect()
    }

    /// Non-any clauses in field order: source, predicate, target, weight
    pub fn clauses(&self) -> Vec<(Field, &Clause)> {
        Field::ALL
            .iter()
            .map(|&field| (field, self.clause(field)))
            .filter(|(_, clause)| !clause.is_any())
            .collect()
    }

    /// Hook for defaulting applied by the facade before dispatch.
    /// Currently leaves the query unchanged.
    pub fn normalize(&mut self) {}
}

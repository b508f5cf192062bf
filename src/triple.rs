//! Triple record and its validation rules

use crate::error::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that may not appear in any identity field
pub const FORBIDDEN_CHARS: [char; 6] = ['?', ' ', '{', '}', '(', ')'];

/// Weighted subject-predicate-object fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub source: String,
    pub predicate: String,
    pub target: String,
    /// Extension data, not part of the triple's identity
    #[serde(default)]
    pub weight: f64,
}

/// Identity of a stored triple
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct TripleKey {
    pub source: String,
    pub predicate: String,
    pub target: String,
}

impl Triple {
    /// Create a new triple
    pub fn new(
        source: impl Into<String>,
        predicate: impl Into<String>,
        target: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            predicate: predicate.into(),
            target: target.into(),
            weight,
        }
    }

    /// Ensure source, predicate and target are non-empty and free of
    /// forbidden characters. Weight is never checked.
    pub fn validate(&self) -> Result<()> {
        validate_name("source", &self.source)?;
        validate_name("predicate", &self.predicate)?;
        validate_name("target", &self.target)?;
        Ok(())
    }

    /// Identity key used for deduplication
    pub fn key(&self) -> TripleKey {
        TripleKey {
            source: self.source.clone(),
            predicate: self.predicate.clone(),
            target: self.target.clone(),
        }
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains(&FORBIDDEN_CHARS[..]) {
        return Err(FabricError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.6}",
            self.source, self.predicate, self.target, self.weight
        )
    }
}

impl fmt::Display for TripleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.predicate, self.target)
    }
}

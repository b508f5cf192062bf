//! In-memory triple store
//!
//! Triples live in a `HashMap` keyed by identity and guarded by a single
//! reader/writer lock. Queries are full scans with per-field matchers.
//!
//! # Consistency
//!
//! `delete` and `reweight` run as two lock acquisitions: a shared-lock scan
//! followed by an exclusive-lock mutation. They are read-committed-at-start,
//! write-best-effort: a concurrent writer touching the same triples between
//! the two phases can cause a lost update, a re-weight that re-creates a
//! triple deleted in between, or two re-weights computed from the same
//! snapshot.

use super::{Counter, ReWeighter, Store};
use crate::error::{FabricError, Result};
use crate::query::{Clause, ClauseOp, Query};
use crate::triple::{Triple, TripleKey};
use async_trait::async_trait;
use glob::Pattern;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Store backed by an in-process map
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<TripleKey, Triple>>,
    strict_weight_ops: bool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// By default an unrecognized operator on the weight clause silently
    /// matches nothing. When strict, it fails with `UnsupportedClause` like
    /// every other field does.
    pub fn with_strict_weight_ops(mut self, strict: bool) -> Self {
        self.strict_weight_ops = strict;
        self
    }

    /// Number of stored triples
    pub fn len(&self) -> Result<usize> {
        Ok(self.read("len")?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self, op: &'static str) -> Result<RwLockReadGuard<'_, HashMap<TripleKey, Triple>>> {
        self.data.read().map_err(|_| FabricError::LockPoisoned(op))
    }

    fn write(&self, op: &'static str) -> Result<RwLockWriteGuard<'_, HashMap<TripleKey, Triple>>> {
        self.data.write().map_err(|_| FabricError::LockPoisoned(op))
    }

    /// Collect matches under the shared lock, stopping after `limit` when non-zero
    fn scan(&self, query: &Query, limit: usize, op: &'static str) -> Result<Vec<Triple>> {
        let matcher = QueryMatcher::compile(query, self.strict_weight_ops)?;
        let data = self.read(op)?;

        let matches = data.values().filter(|triple| matcher.matches(triple));
        let triples: Vec<Triple> = if limit > 0 {
            matches.take(limit).cloned().collect()
        } else {
            matches.cloned().collect()
        };

        Ok(triples)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, triple: Triple) -> Result<()> {
        let key = triple.key();
        let mut data = self.write("insert")?;

        if data.contains_key(&key) {
            return Err(FabricError::DuplicateTriple(key.to_string()));
        }

        debug!("Inserting triple: {}", triple);
        data.insert(key, triple);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Triple>> {
        let triples = self.scan(query, query.limit, "query")?;
        debug!("Query matched {} triples", triples.len());
        Ok(triples)
    }

    async fn delete(&self, query: &Query) -> Result<usize> {
        let triples = self.scan(query, 0, "delete")?;
        if triples.is_empty() {
            return Ok(0);
        }

        let mut data = self.write("delete")?;
        let removed = triples
            .iter()
            .filter(|triple| data.remove(&triple.key()).is_some())
            .count();

        debug!("Deleted {} of {} matched triples", removed, triples.len());
        Ok(removed)
    }

    fn as_counter(&self) -> Option<&dyn Counter> {
        Some(self)
    }

    fn as_reweighter(&self) -> Option<&dyn ReWeighter> {
        Some(self)
    }
}

#[async_trait]
impl Counter for InMemoryStore {
    async fn count(&self, query: &Query) -> Result<usize> {
        if query.is_any() {
            let total = self.len()?;
            return Ok(match query.limit {
                0 => total,
                limit => total.min(limit),
            });
        }

        Ok(self.scan(query, query.limit, "count")?.len())
    }
}

#[async_trait]
impl ReWeighter for InMemoryStore {
    async fn reweight(&self, query: &Query, delta: f64, replace: bool) -> Result<usize> {
        let triples = self.scan(query, 0, "reweight")?;
        if triples.is_empty() {
            return Ok(0);
        }

        let mut data = self.write("reweight")?;
        for mut triple in triples.iter().cloned() {
            if replace {
                triple.weight = delta;
            } else {
                triple.weight += delta;
            }
            data.insert(triple.key(), triple);
        }

        debug!("Re-weighted {} triples (delta={}, replace={})", triples.len(), delta, replace);
        Ok(triples.len())
    }
}

/// Predicate over a single string field
#[derive(Debug)]
enum StringMatcher {
    Any,
    Exact(String),
    Like(Pattern),
}

impl StringMatcher {
    fn compile(clause: &Clause) -> Result<Self> {
        if clause.is_any() {
            return Ok(StringMatcher::Any);
        }

        match clause.op() {
            Some(ClauseOp::Equal) => Ok(StringMatcher::Exact(clause.value.clone())),
            Some(ClauseOp::Like) => like_pattern(&clause.value).map(StringMatcher::Like),
            _ => Err(FabricError::UnsupportedClause(clause.kind.clone())),
        }
    }

    fn matches(&self, actual: &str) -> bool {
        match self {
            StringMatcher::Any => true,
            StringMatcher::Exact(expected) => expected == actual,
            StringMatcher::Like(pattern) => pattern.matches(actual),
        }
    }
}

/// Predicate over the weight field
#[derive(Debug)]
enum WeightMatcher {
    Any,
    Compare(ClauseOp, f64),
    Never,
}

impl WeightMatcher {
    fn compile(clause: &Clause, strict: bool) -> Result<Self> {
        if clause.is_any() {
            return Ok(WeightMatcher::Any);
        }

        let operand: f64 = clause
            .value
            .trim()
            .parse()
            .map_err(|_| FabricError::InvalidClauseValue {
                value: clause.value.clone(),
            })?;

        match clause.op() {
            Some(op) if op == ClauseOp::Equal || op.is_comparison() => {
                Ok(WeightMatcher::Compare(op, operand))
            }
            _ if strict => Err(FabricError::UnsupportedClause(clause.kind.clone())),
            _ => Ok(WeightMatcher::Never),
        }
    }

    fn matches(&self, actual: f64) -> bool {
        match self {
            WeightMatcher::Any => true,
            WeightMatcher::Compare(op, operand) => op.compare(actual, *operand),
            WeightMatcher::Never => false,
        }
    }
}

/// All four field predicates of a query, compiled once per scan
#[derive(Debug)]
struct QueryMatcher {
    source: StringMatcher,
    predicate: StringMatcher,
    target: StringMatcher,
    weight: WeightMatcher,
}

impl QueryMatcher {
    fn compile(query: &Query, strict_weight_ops: bool) -> Result<Self> {
        Ok(Self {
            source: StringMatcher::compile(&query.source)?,
            predicate: StringMatcher::compile(&query.predicate)?,
            target: StringMatcher::compile(&query.target)?,
            weight: WeightMatcher::compile(&query.weight, strict_weight_ops)?,
        })
    }

    fn matches(&self, triple: &Triple) -> bool {
        self.source.matches(&triple.source)
            && self.predicate.matches(&triple.predicate)
            && self.target.matches(&triple.target)
            && self.weight.matches(triple.weight)
    }
}

/// Compile a like operand into a whole-value pattern where `*` matches any
/// run of characters and everything else is literal.
fn like_pattern(value: &str) -> Result<Pattern> {
    let mut glob = value
        .split('*')
        .map(Pattern::escape)
        .collect::<Vec<_>>()
        .join("*");

    // glob rejects `**` outside a path component
    while glob.contains("**") {
        glob = glob.replace("**", "*");
    }

    Pattern::new(&glob).map_err(|_| FabricError::InvalidClauseValue {
        value: value.to_string(),
    })
}

//! SQLite triple store
//!
//! Queries are compiled into a conjunctive WHERE clause with positional
//! arguments. Each logical operation is a single statement; isolation is
//! whatever SQLite provides for that statement.

use super::{Counter, ReWeighter, Store};
use crate::error::{FabricError, Result};
use crate::query::{Clause, ClauseOp, Field, Query};
use crate::triple::Triple;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const MIGRATION: &str = "
CREATE TABLE IF NOT EXISTS triples (
    source TEXT NOT NULL,
    predicate TEXT NOT NULL,
    target TEXT NOT NULL,
    weight DECIMAL NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS triple_idx ON triples (source, predicate, target);
";

/// Store backed by a `triples` table
pub struct SqlStore {
    conn: Mutex<Connection>,
    allow_unfiltered_reweight: bool,
}

impl SqlStore {
    /// Wrap an open connection. `setup` must run before first use.
    pub fn new(conn: Connection) -> Result<Self> {
        // keep LIKE case-sensitive so it agrees with the in-memory matcher
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;

        Ok(Self {
            conn: Mutex::new(conn),
            allow_unfiltered_reweight: true,
        })
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening sqlite store at {}", path.display());
        Self::new(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Re-weight without any clause updates every row. Disallowing it makes
    /// such calls fail with `MissingFilter`, the same as delete.
    pub fn with_unfiltered_reweight(mut self, allow: bool) -> Self {
        self.allow_unfiltered_reweight = allow;
        self
    }

    /// Create the table and its uniqueness index if absent. Idempotent.
    pub async fn setup(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(MIGRATION)?;
        debug!("sqlite schema ready");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("sqlite connection mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl Store for SqlStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, triple: Triple) -> Result<()> {
        check_weight(triple.weight)?;
        let conn = self.lock();
        let result = conn.execute(
            "INSERT INTO triples (source, predicate, target, weight) VALUES (?1, ?2, ?3, ?4)",
            params![triple.source, triple.predicate, triple.target, triple.weight],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(FabricError::DuplicateTriple(triple.key().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Triple>> {
        let (filter, mut args) = where_clause(query)?;
        let mut sql = format!("SELECT source, predicate, target, weight FROM triples{filter}");
        if query.limit > 0 {
            sql.push_str(" LIMIT ?");
            args.push(limit_arg(query.limit));
        }

        debug!("sqlite query: {}", sql);
        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let triples = stmt
            .query_map(params_from_iter(args.iter()), parse_triple_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(triples)
    }

    async fn delete(&self, query: &Query) -> Result<usize> {
        let (filter, args) = where_clause(query)?;
        if filter.is_empty() {
            return Err(FabricError::MissingFilter);
        }

        let sql = format!("DELETE FROM triples{filter}");
        debug!("sqlite delete: {}", sql);
        let conn = self.lock();
        let deleted = conn.execute(&sql, params_from_iter(args.iter()))?;
        Ok(deleted)
    }

    fn as_counter(&self) -> Option<&dyn Counter> {
        Some(self)
    }

    fn as_reweighter(&self) -> Option<&dyn ReWeighter> {
        Some(self)
    }
}

#[async_trait]
impl Counter for SqlStore {
    async fn count(&self, query: &Query) -> Result<usize> {
        let (filter, mut args) = where_clause(query)?;
        let sql = if query.limit > 0 {
            args.push(limit_arg(query.limit));
            format!("SELECT count(*) FROM (SELECT 1 FROM triples{filter} LIMIT ?)")
        } else {
            format!("SELECT count(*) FROM triples{filter}")
        };

        let conn = self.lock();
        let count: i64 = conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ReWeighter for SqlStore {
    async fn reweight(&self, query: &Query, delta: f64, replace: bool) -> Result<usize> {
        check_weight(delta)?;
        let (filter, args) = where_clause(query)?;
        if filter.is_empty() && !self.allow_unfiltered_reweight {
            return Err(FabricError::MissingFilter);
        }

        let set = if replace {
            "SET weight = ?"
        } else {
            "SET weight = weight + ?"
        };
        let sql = format!("UPDATE triples {set}{filter}");

        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(Value::Real(delta));
        all_args.extend(args);

        debug!("sqlite reweight: {}", sql);
        let conn = self.lock();
        let updated = conn.execute(&sql, params_from_iter(all_args.iter()))?;
        Ok(updated)
    }
}

/// SQLite binds NaN as NULL, which the weight column rejects
fn check_weight(weight: f64) -> Result<()> {
    if weight.is_nan() {
        return Err(FabricError::InvalidField {
            field: "weight",
            value: weight.to_string(),
        });
    }
    Ok(())
}

/// Row caps are bound as integers; SQLite reads anything past `i64::MAX` as REAL
fn limit_arg(limit: usize) -> Value {
    Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX))
}

fn parse_triple_row(row: &Row<'_>) -> rusqlite::Result<Triple> {
    Ok(Triple {
        source: row.get(0)?,
        predicate: row.get(1)?,
        target: row.get(2)?,
        weight: row.get(3)?,
    })
}

/// Build ` WHERE a AND b ...` (or an empty string for an "any" query) and its
/// positional arguments, one conjunct per non-any clause in field order.
fn where_clause(query: &Query) -> Result<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    for (field, clause) in query.clauses() {
        let (condition, arg) = match field {
            Field::Weight => weight_condition(clause)?,
            _ => string_condition(field, clause)?,
        };
        conditions.push(condition);
        args.push(arg);
    }

    if conditions.is_empty() {
        return Ok((String::new(), args));
    }

    Ok((format!(" WHERE {}", conditions.join(" AND ")), args))
}

fn string_condition(field: Field, clause: &Clause) -> Result<(String, Value)> {
    let column = field.as_str();
    match clause.op() {
        Some(ClauseOp::Equal) => Ok((format!("{column} = ?"), Value::Text(clause.value.clone()))),
        Some(ClauseOp::Like) => Ok((
            format!("{column} LIKE ? ESCAPE '\\'"),
            Value::Text(like_operand(&clause.value)),
        )),
        _ => Err(FabricError::UnsupportedClause(clause.kind.clone())),
    }
}

fn weight_condition(clause: &Clause) -> Result<(String, Value)> {
    let operand: f64 = clause
        .value
        .trim()
        .parse()
        .map_err(|_| FabricError::InvalidClauseValue {
            value: clause.value.clone(),
        })?;

    let op = match clause.op() {
        Some(ClauseOp::Equal) => "=",
        Some(ClauseOp::Gt) => ">",
        Some(ClauseOp::Lt) => "<",
        Some(ClauseOp::Gte) => ">=",
        Some(ClauseOp::Lte) => "<=",
        _ => return Err(FabricError::UnsupportedClause(clause.kind.clone())),
    };

    Ok((format!("weight {op} ?"), Value::Real(operand)))
}

/// Escape LIKE metacharacters, then turn `*` into `%`
fn like_operand(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            _ => out.push(c),
        }
    }
    out
}

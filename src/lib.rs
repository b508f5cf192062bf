//! Minimal weighted triple store
//!
//! Persists subject-predicate-object facts with a numeric weight and lets
//! callers query, count, delete and re-weight subsets of them through a
//! small clause-based filter language. Two backends implement the same
//! filter semantics: an in-process map and a SQLite table.
//!
//! ```no_run
//! use fabric::{Clause, Fabric, InMemoryStore, Query, Triple};
//!
//! # async fn run() -> fabric::Result<()> {
//! let fabric = Fabric::from_store(InMemoryStore::new());
//! fabric.insert(Triple::new("bob", "knows", "john", 1.0)).await?;
//!
//! let query = Query::new().with_predicate(Clause::like("know*"));
//! let triples = fabric.query(query).await?;
//! assert_eq!(triples.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod fabric;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod store;
pub mod triple;

pub use config::Config;
pub use error::{FabricError, Result};
pub use export::export_dot;
pub use fabric::Fabric;
pub use query::{Clause, ClauseOp, Field, Query};
pub use store::{open_store, Counter, InMemoryStore, ReWeighter, SqlStore, Store, StoreCapabilities};
pub use triple::Triple;

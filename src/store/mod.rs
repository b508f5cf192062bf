//! Storage abstraction for triples
//!
//! Every backend implements [`Store`]. Counting and re-weighting are optional
//! capabilities a backend advertises through [`Store::as_counter`] and
//! [`Store::as_reweighter`]; the [`crate::Fabric`] facade falls back when
//! they are absent.
//!
//! Backends:
//! - [`InMemoryStore`]: map guarded by a single reader/writer lock
//! - [`SqlStore`]: SQLite table with generated WHERE clauses

pub mod memory;
pub mod sql;

pub use memory::InMemoryStore;
pub use sql::SqlStore;

use crate::config::{Backend, StoreConfig};
use crate::error::Result;
use crate::query::Query;
use crate::triple::Triple;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Persistence contract every backend must satisfy
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &'static str;

    /// Persist a triple. Fails with `DuplicateTriple` when a triple with the
    /// same identity already exists.
    async fn insert(&self, triple: Triple) -> Result<()>;

    /// Return all triples matching the query
    async fn query(&self, query: &Query) -> Result<Vec<Triple>>;

    /// Remove all triples matching the query, returning how many were removed
    async fn delete(&self, query: &Query) -> Result<usize>;

    /// Native count support, if any
    fn as_counter(&self) -> Option<&dyn Counter> {
        None
    }

    /// Native weight update support, if any
    fn as_reweighter(&self) -> Option<&dyn ReWeighter> {
        None
    }

    /// Optional capabilities this backend provides
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            count: self.as_counter().is_some(),
            reweight: self.as_reweighter().is_some(),
        }
    }
}

/// Native count capability
#[async_trait]
pub trait Counter: Send + Sync {
    /// Number of triples matching the query
    async fn count(&self, query: &Query) -> Result<usize>;
}

/// Weight update capability
#[async_trait]
pub trait ReWeighter: Send + Sync {
    /// Update all triples matching the query. If `replace` is true the weight
    /// is set to `delta`, otherwise `delta` is added to the current weight.
    async fn reweight(&self, query: &Query, delta: f64, replace: bool) -> Result<usize>;
}

/// Optional capabilities advertised by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCapabilities {
    pub count: bool,
    pub reweight: bool,
}

/// Build the configured backend. The SQLite schema is set up before the
/// store is returned.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.backend {
        Backend::Memory => {
            Arc::new(InMemoryStore::new().with_strict_weight_ops(config.strict_weight_ops))
        }
        Backend::Sqlite => {
            let store = SqlStore::open(&config.path)?
                .with_unfiltered_reweight(config.allow_unfiltered_reweight);
            store.setup().await?;
            Arc::new(store)
        }
    };

    info!("Opened {} store", store.name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareStore;

    #[async_trait]
    impl Store for BareStore {
        fn name(&self) -> &'static str {
            "bare"
        }

        async fn insert(&self, _triple: Triple) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _query: &Query) -> Result<Vec<Triple>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _query: &Query) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_default_capabilities() {
        let store = BareStore;
        assert_eq!(store.capabilities(), StoreCapabilities::default());
        assert!(store.as_counter().is_none());
        assert!(store.as_reweighter().is_none());
    }

    #[test]
    fn test_backend_capabilities() {
        let full = StoreCapabilities {
            count: true,
            reweight: true,
        };
        assert_eq!(InMemoryStore::new().capabilities(), full);

        let store = SqlStore::open_in_memory().unwrap();
        assert_eq!(store.capabilities(), full);
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StoreConfig {
            strict_weight_ops: true,
            ..StoreConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");

        let query = Query::new().with_weight(crate::query::Clause::new("!=", "1"));
        assert!(store.query(&query).await.is_err());
    }

    #[test]
    fn test_bare_store_query() {
        let result = tokio_test::block_on(BareStore.query(&Query::new()));
        assert!(result.unwrap().is_empty());
    }
}

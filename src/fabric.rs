//! Facade over a configured store
//!
//! `Fabric` validates triples before insertion, normalizes queries before
//! dispatch and always exposes count and re-weight: count falls back to a
//! query when the backend has no native support, re-weight fails with
//! `CapabilityUnsupported`.

use crate::error::{FabricError, Result};
use crate::metrics::METRICS;
use crate::query::Query;
use crate::store::{Store, StoreCapabilities};
use crate::time_operation;
use crate::triple::Triple;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for querying and managing triples
#[derive(Clone)]
pub struct Fabric {
    store: Arc<dyn Store>,
}

impl Fabric {
    /// Create a facade over the given store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a facade taking ownership of a concrete store
    pub fn from_store<S: Store + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    /// Name of the backend in use
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Optional capabilities of the backend in use
    pub fn capabilities(&self) -> StoreCapabilities {
        self.store.capabilities()
    }

    /// Validate the triple and persist it
    pub async fn insert(&self, triple: Triple) -> Result<()> {
        if let Err(err) = triple.validate() {
            warn!("Rejected invalid triple: {}", err);
            METRICS.record_operation("insert", false);
            return Err(err);
        }

        let result = time_operation!(
            METRICS.store_request_duration,
            "insert",
            self.store.insert(triple).await
        );

        if let Err(FabricError::DuplicateTriple(key)) = &result {
            debug!("Duplicate triple: {}", key);
            METRICS.record_duplicate();
        }
        METRICS.record_operation("insert", result.is_ok());
        result
    }

    /// Find all triples matching the query
    pub async fn query(&self, query: Query) -> Result<Vec<Triple>> {
        let mut query = query;
        query.normalize();

        let result = time_operation!(
            METRICS.store_request_duration,
            "query",
            self.store.query(&query).await
        );
        METRICS.record_operation("query", result.is_ok());
        result
    }

    /// Number of triples matching the query. Uses the backend's native count
    /// when available, otherwise the length of a full query.
    pub async fn count(&self, query: Query) -> Result<usize> {
        let result = time_operation!(METRICS.store_request_duration, "count", {
            match self.store.as_counter() {
                Some(counter) => counter.count(&query).await,
                None => {
                    debug!("{} store has no native count, querying", self.store.name());
                    METRICS.record_fallback("count");
                    self.store.query(&query).await.map(|triples| triples.len())
                }
            }
        });
        METRICS.record_operation("count", result.is_ok());
        result
    }

    /// Remove all triples matching the query, returning how many were removed
    pub async fn delete(&self, query: Query) -> Result<usize> {
        let result = time_operation!(
            METRICS.store_request_duration,
            "delete",
            self.store.delete(&query).await
        );
        METRICS.record_operation("delete", result.is_ok());
        result
    }

    /// Update the weight of all triples matching the query: set it to `delta`
    /// when `replace` is true, otherwise add `delta`.
    pub async fn reweight(&self, query: Query, delta: f64, replace: bool) -> Result<usize> {
        if delta == 0.0 && !replace {
            METRICS.record_operation("reweight", false);
            return Err(FabricError::NoOpUpdate);
        }

        let Some(reweighter) = self.store.as_reweighter() else {
            warn!("{} store does not support re-weighting", self.store.name());
            METRICS.record_operation("reweight", false);
            return Err(FabricError::CapabilityUnsupported("reweight"));
        };

        let result = time_operation!(
            METRICS.store_request_duration,
            "reweight",
            reweighter.reweight(&query, delta, replace).await
        );
        METRICS.record_operation("reweight", result.is_ok());
        result
    }
}

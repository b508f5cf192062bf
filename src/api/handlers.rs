//! Triple API handlers

use crate::error::FabricError;
use crate::export::export_dot;
use crate::fabric::Fabric;
use crate::metrics::METRICS;
use crate::query::{Clause, Query};
use crate::store::StoreCapabilities;
use crate::triple::Triple;
use axum::{
    extract::{rejection::JsonRejection, Query as QueryParams, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

/// Application state for triple handlers
#[derive(Clone)]
pub struct AppState {
    pub fabric: Fabric,
}

/// API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new("VALIDATION_ERROR", message)),
    )
}

/// Keep the axum status for a rejected JSON body, with our error body
fn body_error(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    (
        rejection.status(),
        Json(ApiError::new("INVALID_BODY", rejection.body_text())),
    )
}

/// Map a store error onto an HTTP status
fn store_error(err: FabricError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        FabricError::DuplicateTriple(_) => StatusCode::CONFLICT,
        FabricError::CapabilityUnsupported(_) => StatusCode::NOT_IMPLEMENTED,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => {
            error!("Store operation failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiError::new(err.code(), err.to_string())))
}

/// Build a query from `source`, `predicate`, `target`, `weight` and `limit`
/// parameters. Clauses use the `"<type> <value>"` form.
fn read_query(params: &HashMap<String, String>) -> ApiResult<Query> {
    let clause = |name: &str| -> ApiResult<Clause> {
        match params.get(name) {
            Some(raw) => raw
                .parse::<Clause>()
                .map_err(|e| bad_request(format!("{name}: {e}"))),
            None => Ok(Clause::any()),
        }
    };

    let limit = match params.get("limit").map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<usize>()
            .map_err(|_| bad_request(format!("invalid limit '{raw}'")))?,
        _ => 0,
    };

    Ok(Query {
        source: clause("source")?,
        predicate: clause("predicate")?,
        target: clause("target")?,
        weight: clause("weight")?,
        limit,
    })
}

/// Query triples
///
/// GET /triples?source=~%20bo*&format=dot
pub async fn query_triples(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Response> {
    let query = read_query(&params)?;
    let triples = state.fabric.query(query).await.map_err(store_error)?;

    let format = params.get("format").map(|f| f.trim()).unwrap_or("json");
    let response = match format {
        "dot" => (
            [(header::CONTENT_TYPE, "text/vnd.graphviz; charset=utf-8")],
            export_dot("fabric", &triples),
        )
            .into_response(),
        _ => Json(triples).into_response(),
    };
    Ok(response)
}

/// Insert a triple
///
/// POST /triples
pub async fn insert_triple(
    State(state): State<AppState>,
    payload: Result<Json<Triple>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Triple>)> {
    let Json(triple) = payload.map_err(body_error)?;
    info!("Triple insert request: {}", triple);

    state
        .fabric
        .insert(triple.clone())
        .await
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(triple)))
}

/// Count response
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Count triples
///
/// GET /triples/count
pub async fn count_triples(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Json<CountResponse>> {
    let query = read_query(&params)?;
    let count = state.fabric.count(query).await.map_err(store_error)?;
    Ok(Json(CountResponse { count }))
}

/// Re-weight request: query clauses in structured form plus the update
#[derive(Debug, Serialize, Deserialize)]
pub struct ReWeightRequest {
    #[serde(flatten)]
    pub query: Query,
    #[serde(default)]
    pub delta: f64,
    #[serde(default)]
    pub replace: bool,
}

/// Re-weight response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReWeightResponse {
    pub updated: usize,
}

/// Update weights of matching triples
///
/// PATCH /triples with a JSON body such as
/// `{"predicate": {"type": "~", "value": "know*"}, "delta": 5}`
pub async fn reweight_triples(
    State(state): State<AppState>,
    payload: Result<Json<ReWeightRequest>, JsonRejection>,
) -> ApiResult<Json<ReWeightResponse>> {
    let Json(request) = payload.map_err(body_error)?;
    info!(
        "Re-weight request: delta={}, replace={}",
        request.delta, request.replace
    );

    let updated = state
        .fabric
        .reweight(request.query, request.delta, request.replace)
        .await
        .map_err(store_error)?;

    Ok(Json(ReWeightResponse { updated }))
}

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

/// Delete matching triples
///
/// DELETE /triples
pub async fn delete_triples(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> ApiResult<Json<DeleteResponse>> {
    let query = read_query(&params)?;
    info!("Delete request: {:?}", query);

    let deleted = state.fabric.delete(query).await.map_err(store_error)?;
    Ok(Json(DeleteResponse { deleted }))
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub capabilities: StoreCapabilities,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.fabric.backend(),
        capabilities: state.fabric.capabilities(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_read_query() {
        let query = read_query(&params(&[
            ("source", "~ bo*"),
            ("weight", "gte 1"),
            ("limit", "10"),
        ]))
        .unwrap();

        assert_eq!(query.source, Clause::like("bo*"));
        assert_eq!(query.weight, Clause::new("gte", "1"));
        assert!(query.predicate.is_any());
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_read_query_invalid() {
        let (status, body) = read_query(&params(&[("target", "=")])).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.starts_with("target"));

        let (status, _) = read_query(&params(&[("limit", "-1")])).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_status() {
        let cases = [
            (FabricError::DuplicateTriple("a b c".into()), StatusCode::CONFLICT),
            (FabricError::MissingFilter, StatusCode::BAD_REQUEST),
            (FabricError::NoOpUpdate, StatusCode::BAD_REQUEST),
            (
                FabricError::CapabilityUnsupported("reweight"),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                FabricError::LockPoisoned("query"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = store_error(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_reweight_request_json() {
        let request: ReWeightRequest = serde_json::from_str(
            r#"{"predicate":{"type":"~","value":"know*"},"delta":5}"#,
        )
        .unwrap();
        assert_eq!(request.query.predicate, Clause::like("know*"));
        assert_eq!(request.delta, 5.0);
        assert!(!request.replace);
    }
}

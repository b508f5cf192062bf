//! HTTP transport over the fabric facade

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::build_router;

//! HTTP handlers, one module per area of the API. Handlers return
//! `Result<_, AppError>`; admin handlers call `AuthUser::require_admin` first.

pub mod catalog;
pub mod cbt;
pub mod preview;
pub mod questions;
pub mod resources;
pub mod search;
pub mod stats;
pub mod users;

/// Liveness check for the load balancer.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

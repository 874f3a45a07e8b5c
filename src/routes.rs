//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Reads are public; every
//! mutation sits behind the bearer-token middleware.

mod auth;
mod batch;
mod edits;
mod entries;
mod fields;
mod governance;
mod notifications;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Page size used when a list request names no limit
pub(crate) const DEFAULT_PAGE_LIMIT: usize = 50;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let public = Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/api/auth/dev-token", post(auth::dev_token))
        // Entries
        .route("/api/entries", get(entries::list_entries))
        .route("/api/entries/counts", get(entries::entry_counts))
        .route("/api/entries/{address}", get(entries::get_entry))
        .route("/api/entries/{address}/metadata", get(entries::get_metadata))
        .route("/api/entries/{address}/metadata/{field}", get(entries::get_metadata_value))
        // Edits
        .route("/api/entries/{address}/edits", get(edits::list_edits))
        .route("/api/entries/{address}/edits/count", get(edits::edit_count))
        .route("/api/entries/{address}/edits/{id}", get(edits::get_edit))
        .route("/api/edits", get(edits::list_all_edits))
        // Fields
        .route("/api/fields", get(fields::list_fields))
        .route("/api/fields/{name}", get(fields::get_field))
        // Governance
        .route("/api/governance/policy", get(governance::policy_status))
        .route("/api/notifications", get(notifications::list_notifications));

    let protected = Router::new()
        .route("/api/entries", post(entries::add_entry))
        .route("/api/entries/{address}/approve", post(entries::approve_entry))
        .route("/api/entries/{address}/reject", post(entries::reject_entry))
        .route("/api/entries/{address}/metadata", put(entries::set_metadata))
        .route("/api/entries/{address}/metadata/{field}", put(entries::set_metadata_value))
        .route("/api/entries/{address}/edits", post(edits::propose_edit))
        .route("/api/entries/{address}/edits/{id}/accept", post(edits::accept_edit))
        .route("/api/entries/{address}/edits/{id}/reject", post(edits::reject_edit))
        .route("/api/fields", post(fields::add_field))
        .route("/api/fields/{name}", put(fields::update_field))
        // Batch routes
        .route("/api/batch/add", post(batch::batch_add))
        .route("/api/batch/approve", post(batch::batch_approve))
        .route("/api/batch/reject", post(batch::batch_reject))
        .route("/api/batch/accept-edits", post(batch::batch_accept_edits))
        .route("/api/batch/reject-edits", post(batch::batch_reject_edits))
        // Governance
        .route("/api/governance/roles", post(governance::grant_role))
        .route("/api/governance/roles/revoke", post(governance::revoke_role))
        .route("/api/governance/migration", post(governance::stage_migration))
        .route("/api/governance/migration/complete", post(governance::complete_migration))
        .route("/api/governance/migration/cancel", post(governance::cancel_migration))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    public
        .merge(protected)
        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

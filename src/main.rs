//! Curated Registry API
//!
//! A permissioned registry of entries that move through review, with
//! configurable per-entry metadata, an edit-proposal workflow and a
//! pluggable, migratable authorization policy.
//!
//! - Entries: submit, approve, reject, resubmit after rejection
//! - Edits: propose metadata changes to approved entries, accept or reject
//! - Fields: governor-managed metadata schema, deactivated but never deleted
//! - Governance: role management and two-phase policy migration

mod auth;
mod batch;
mod config;
mod error;
mod models;
mod policy;
mod registry;
mod routes;
mod state;

use crate::config::Settings;
use crate::policy::CuratorPolicy;
use crate::registry::{Caller, Registry};
use crate::routes::create_router;
use crate::state::AppState;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Curated Registry...");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("📋 Configuration loaded successfully");

    let registry = build_registry(&settings).await?;
    let state = Arc::new(AppState::new(registry, &settings));
    if settings.auth.allow_dev_tokens {
        warn!("⚠️  Development tokens are enabled (POST /api/auth/dev-token)");
    }

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Entries ───");
    info!("   POST /api/entries                        - Submit an entry");
    info!("   GET  /api/entries?status=               - List a status partition");
    info!("   GET  /api/entries/counts                 - Pending/approved/rejected counts");
    info!("   POST /api/entries/{{address}}/approve      - Approve a pending entry");
    info!("   POST /api/entries/{{address}}/reject       - Reject a pending entry");
    info!("   PUT  /api/entries/{{address}}/metadata     - Write metadata directly");
    info!("");
    info!("   ─── Edits ───");
    info!("   POST /api/entries/{{address}}/edits        - Propose an edit");
    info!("   POST /api/entries/{{address}}/edits/{{id}}/accept - Accept (discards siblings)");
    info!("   GET  /api/edits                          - All active edits");
    info!("");
    info!("   ─── Fields, Batch & Governance ───");
    info!("   GET  /api/fields                         - Registered metadata fields");
    info!("   POST /api/batch/{{add,approve,reject,accept-edits,reject-edits}}");
    info!("   GET  /api/governance/policy              - Active and staged policy");
    info!("   POST /api/governance/migration           - Stage a policy migration");
    info!("   GET  /api/notifications?after=           - Notification feed");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,curated_registry=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Initial curator policy plus the configured seed fields
async fn build_registry(settings: &Settings) -> anyhow::Result<Registry> {
    let config = &settings.registry;
    let governor = Caller::new(config.governor.clone());

    let policy = CuratorPolicy::new(governor.clone())
        .with_curators(config.curators.iter().cloned().map(Caller::new))
        .with_trusted_delegates(config.trusted_delegates.iter().cloned().map(Caller::new))
        .with_open_submissions(config.open_submissions);
    info!(
        "🛡️  Curator policy governed by '{}' ({} curator(s), {} trusted delegate(s), \
         open submissions: {})",
        governor,
        config.curators.len(),
        config.trusted_delegates.len(),
        config.open_submissions
    );

    let registry = Registry::new(Box::new(policy)).with_max_page_size(config.max_page_size);

    for field in &config.seed_fields {
        registry
            .add_field(&governor, &field.name, field.required)
            .await
            .with_context(|| format!("Failed to register seed field '{}'", field.name))?;
    }
    if !config.seed_fields.is_empty() {
        info!("✅ Registered {} seed field(s)", config.seed_fields.len());
    }

    Ok(registry)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}

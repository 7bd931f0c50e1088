#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::items_after_statements)]

mod auth;
mod cfg;
mod error;
mod flash;
mod liquid_utils;
mod membership;
mod progression;
mod routes;
mod state;

use crate::{
    auth::{backend::ClubAuthBackend, sqlite_session::SqliteStore},
    cfg::Settings,
    error::{not_found_fallback, ClubError, IOAction, IOSnafu},
    state::ClubState,
};
use axum::Router;
use axum_login::AuthManagerLayerBuilder;
use snafu::ResultExt;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing_subscriber::EnvFilter;

#[macro_use]
extern crate tracing;

///Every route, with sessions and auth layered on top.
pub fn app(state: ClubState) -> Router {
    let session_store = SqliteStore::new(state.db.pool().clone());
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            state.settings.session.expiry_days,
        )));
    let auth_layer =
        AuthManagerLayerBuilder::new(ClubAuthBackend::new(state.db.clone()), session_layer)
            .build();

    Router::new()
        .merge(routes::index::router())
        .merge(auth::login::router())
        .merge(routes::dashboard::router())
        .merge(routes::workshops::router())
        .merge(routes::rewards::router())
        .merge(routes::admin_dashboard::router())
        .merge(routes::manage_members::router())
        .merge(routes::manage_workshops::router())
        .merge(routes::manage_rewards::router())
        .merge(routes::public::router())
        .fallback(not_found_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(auth_layer)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(?e, "Failed to listen for ctrl-c");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), ClubError> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Not loading .env: {e}");
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new().await?;
    let bind_address = settings.server.bind_address.clone();
    let cleanup_period = Duration::from_secs(settings.session.cleanup_interval_secs);

    let state = ClubState::new(settings).await?;
    SqliteStore::new(state.db.pool().clone()).spawn_cleanup(cleanup_period);

    let listener = TcpListener::bind(&bind_address).await.context(IOSnafu {
        action: IOAction::BindingListener(bind_address.clone()),
    })?;
    info!(%bind_address, "Serving");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(IOSnafu {
            action: IOAction::Serving,
        })
}

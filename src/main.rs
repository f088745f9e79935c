#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum_client_ip::ClientIpSource;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::JwtKeys;
use crate::api::router;
use crate::hooks::Hooks;
use crate::hooks::ServiceHooks;
use crate::storage::Storage;
use crate::storage::setup;
use crate::utils::env_var;
use crate::utils::env_var_or_else;

mod api;
mod archival;
mod audit_trail;
mod client_ip;
mod entities;
mod graceful_shutdown;
mod hooks;
mod paths;
mod redirects;
mod storage;
#[cfg(test)]
mod tests;
mod utils;
mod validation;

const DEFAULT_RUST_LOG: &str = "relocate=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app().await?;

    let address = setup_address()?;
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Listening on {}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown::handler())
    .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` when the storage can not be setup
pub async fn setup_app() -> Result<Router> {
    let storage = setup().await?;

    let hooks = ServiceHooks::new(env_var("MEDIA_ROOT").map(PathBuf::from));

    Ok(create_router(storage, Arc::new(hooks), setup_jwt_keys()))
}

/// Create the router for Relocate
fn create_router<S: Storage>(storage: S, hooks: Arc<dyn Hooks>, jwt_keys: JwtKeys) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(hooks))
        .layer(Extension(jwt_keys))
        .layer(ClientIpSource::ConnectInfo.into_extension())
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_jwt_keys() -> JwtKeys {
    let jwt_secret = env_var_or_else("JWT_SECRET", || {
        let jwt_secret = uuid::Uuid::new_v4().simple().to_string();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    JwtKeys::new(jwt_secret.as_bytes())
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Ok(port) = std::env::var("PORT") {
        // only check non-empty strings
        if !port.is_empty() {
            let port = port.parse::<u16>()?;

            address.set_port(port);
        }
    }

    Ok(address)
}

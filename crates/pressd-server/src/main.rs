// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! `pressd` — the standalone daemon binary. Wires `pressd-ipp`,
//! `pressd-store`, `pressd-capabilities`, `pressd-discovery`,
//! `pressd-backend`, and `pressd-dispatch` together behind a `hyper`
//! listener as a process entry point, binding and spawning the
//! connection-accept loop directly rather than exposing a library type
//! for an app to embed.

mod auth;
mod capability_provider;
mod devices;
mod http;
mod scheduler;
mod spool;

use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pressd_core::config::ServerConfig;
use pressd_store::Store;

use crate::auth::NetworkAuthenticator;
use crate::capability_provider::FilesystemCapabilityProvider;
use crate::http::AppState;
use crate::spool::DiskSpool;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    if let Err(e) = run(config).await {
        error!(error = %e, "pressd exited with an error");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.spool_dir)?;
    let ppd_dir = config.spool_dir.join("ppd");
    std::fs::create_dir_all(&ppd_dir)?;

    let store = if config.database_path == ":memory:" {
        Store::open_in_memory()?
    } else {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        Store::open(&config.database_path)?
    };

    let bind_address: SocketAddr = config.bind_address.parse()?;
    let listener = TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "pressd listening");

    let base_uri = format!("ipp://{}", strip_port_for_display(&config.bind_address));

    let state = Arc::new(AppState {
        store,
        authenticator: Box::new(NetworkAuthenticator),
        capabilities: Box::new(FilesystemCapabilityProvider::new(ppd_dir)),
        spool: Box::new(DiskSpool::new(config.spool_dir.clone())),
        spool_reader: Box::new(DiskSpool::new(config.spool_dir.clone())),
        base_uri,
        config,
    });

    let scheduler_state = Arc::clone(&state);
    tokio::spawn(async move {
        scheduler::run(&scheduler_state.store, &scheduler_state.config).await;
    });

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = hyper::service::service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { http::handle(state, req, peer).await }
            });
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }
}

/// `ipp://host` for `job-uri`/`printer-uri` construction, dropping the bind
/// port since clients address the printer at the IANA-assigned IPP port
/// regardless of what this process happens to bind to in tests.
fn strip_port_for_display(bind_address: &str) -> String {
    bind_address.split(':').next().unwrap_or(bind_address).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_port_for_display_drops_the_port() {
        assert_eq!(strip_port_for_display("0.0.0.0:631"), "0.0.0.0");
    }
}

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::NotionStore;
use astra::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod activity;
mod auth;
mod config;
mod db;
mod errors;
mod handlers;
mod responses;
mod router;
mod state;
mod store;
mod validation;


fn main() {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!("invalid bind address: {err}");
            std::process::exit(1);
        }
    };

    let store = match NotionStore::new(&config) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!("record store client init failed: {err}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(config, Arc::new(store)));

    tracing::info!("listening on http://{addr}");

    let server = Server::bind(addr).max_workers(8);
    let result = server.serve(move |req, _info| match router::handle(req, &state) {
        Ok(resp) => resp,
        Err(err) => responses::error_to_response(err),
    });

    if let Err(err) = result {
        tracing::error!("server ended with error: {err}");
    }
}

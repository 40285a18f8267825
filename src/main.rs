use crate::config::AppConfig;
use crate::db::connection::init_db;
use crate::router::{route, AppState};
use astra::Server;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod geos;
mod ingest;
mod mailer;
mod mailings;
mod responses;
mod review;
mod router;
mod spreadsheets;
mod storage;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(config));

    if let Err(e) = init_db(&state.db, &state.config.schema_path) {
        tracing::error!(error = %e, db = %state.config.db_path, "database initialization failed");
        std::process::exit(1);
    }

    let addr = state.config.bind_addr;
    tracing::info!(%addr, workers = state.config.max_workers, "starting server");

    let server = Server::bind(&addr).max_workers(state.config.max_workers);
    let result = server.serve(move |req, _info| route(req, &state));

    if let Err(e) = result {
        tracing::error!(error = %e, "server ended with error");
    }

    tracing::info!("server shut down");
}

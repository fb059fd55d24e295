// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Demo host embedding the SSO gate: one public page and one protected
//! page, with the gate and session layers wired the way an application
//! would.

use std::{env, net::SocketAddr};

use axum::{middleware, response::Html, routing::get, Json, Router};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sso_gate::{
    config::{GateConfig, APP_ENV, CONFIG_PATH_ENV},
    gate::{self, AccessGate},
    routes::sso_router,
    session::{attach_session, Session},
    state::AppState,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let production = env::var(APP_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("production"));
    let config_path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "gate.conf".to_string());

    // Configuration errors are fatal at startup, never per-request.
    let config = match GateConfig::load(&config_path, production) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {config_path}: {err}");
            std::process::exit(1);
        }
    };

    if config.mock_enabled() {
        info!("running with mock SSO headers, do not use in production");
    }

    let state = AppState::new(config);
    let app = router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    info!(%addr, "sso-gate demo host listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/profile", get(profile))
        .layer(middleware::from_fn_with_state(
            AccessGate::new(state.clone()),
            gate::enforce,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/", get(index))
        .merge(protected)
        .merge(sso_router(state))
        .layer(middleware::from_fn(attach_session))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html("<p>Public page. Visit <a href=\"/profile\">/profile</a> to sign in.</p>")
}

/// Protected page: shows the identity attributes held in the session.
async fn profile(session: Session) -> Json<serde_json::Value> {
    Json(serde_json::json!(session.snapshot()))
}

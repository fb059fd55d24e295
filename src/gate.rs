// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Gate
//!
//! The request-level state machine. Applied as a middleware layer to
//! protected routers:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/profile", get(profile))
//!     .layer(middleware::from_fn_with_state(
//!         AccessGate::new(state.clone()).with_profiles(["isAdmin"]),
//!         gate::enforce,
//!     ));
//! ```
//!
//! Applying a gate with profiles to a nested router makes every contained
//! route inherit those profile requirements; a route wanting different
//! profiles gets its own gate layer.
//!
//! The `/sso/*` routes are mounted without a gate layer, which keeps them
//! exempt from the before-filter and avoids redirect loops.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::{debug, trace, warn};

use crate::attributes::{self, ExtractedAttributes};
use crate::error::GateError;
use crate::headers::RawHeaderSet;
use crate::session::{Session, SessionId, SESSION_MARKER};
use crate::state::AppState;

/// Route that initiates a login; unauthenticated requests are sent here.
pub const LOGIN_PATH: &str = "/sso/login";

/// Per-router gate configuration: shared state plus the profile names
/// every request through this layer must hold.
#[derive(Clone)]
pub struct AccessGate {
    state: AppState,
    profiles: Arc<Vec<String>>,
}

impl AccessGate {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            profiles: Arc::new(Vec::new()),
        }
    }

    /// Require the given profiles on every gated request.
    pub fn with_profiles(
        mut self,
        profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.profiles = Arc::new(profiles.into_iter().map(Into::into).collect());
        self
    }
}

/// Gate middleware. Decides per request whether the caller already holds a
/// valid session; if not, redirects to the login initiator or (in
/// local-authentication mode) authenticates against the current request's
/// headers. Then evaluates the declared profile checks.
pub async fn enforce(State(gate): State<AccessGate>, req: Request, next: Next) -> Response {
    let Some(SessionId(id)) = req.extensions().get::<SessionId>().cloned() else {
        return GateError::internal("session middleware is not installed").into_response();
    };
    let session = Session::new(gate.state.sessions.clone(), id);

    if !session.is_authenticated() {
        if gate.state.config.login_enable {
            // Only GET targets are safe to replay after the round trip.
            if req.method() == Method::GET {
                let original = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                session.flash_put("url", original);
            }
            debug!(url = %req.uri(), "unauthenticated request, redirecting to login");
            // 303 so a non-GET request is followed with GET; 307 would
            // replay the original method against the login action.
            return Redirect::to(LOGIN_PATH).into_response();
        }

        debug!("login redirect disabled, authenticating against current request headers");
        let raw = if gate.state.config.mock_enabled() {
            gate.state.mock.snapshot()
        } else {
            RawHeaderSet::from_header_map(req.headers())
        };
        if let Err(response) = run_authentication(&gate.state, &session, &raw) {
            return response;
        }
        // Every successful authentication fires the hook, this entry point
        // included, so host side effects (e.g. user provisioning) are not
        // tied to the login round trip.
        if let Some(response) = gate.state.hooks.after_authentication(&session) {
            return response;
        }
    }

    // The first failing profile short-circuits and fires the hook once.
    for profile in gate.profiles.iter() {
        if !gate.state.hooks.check(profile, &session) {
            warn!(%profile, "profile check failed");
            return gate.state.hooks.on_check_failed(profile);
        }
    }

    next.run(req).await
}

/// Extraction, validation, and session establishment.
///
/// Shared by the authenticate route and the gate's local-authentication
/// path. On validation failure the session is left untouched and the
/// failure hook's response is returned.
pub(crate) fn run_authentication(
    state: &AppState,
    session: &Session,
    headers: &RawHeaderSet,
) -> Result<ExtractedAttributes, Response> {
    if let Some(response) = state.hooks.before_authentication(session) {
        return Err(response);
    }

    // Full header dumps fill the logs fast, so only at trace level.
    if tracing::enabled!(tracing::Level::TRACE) {
        for (name, values) in headers.iter() {
            for value in values {
                trace!(header = %name, %value, "received header");
            }
        }
    }

    let extracted = attributes::extract(&state.config.attributes, headers);

    if let Err(missing) = attributes::verify(&state.config.required, &extracted) {
        for name in &missing {
            warn!(attribute = %name, "missing required attribute");
        }
        return Err(state.hooks.on_attribute_failure(&extracted));
    }

    session.put(SESSION_MARKER, Utc::now().timestamp_millis().to_string());
    for (name, value) in &extracted {
        session.put(name, value.clone());
    }
    debug!(attributes = extracted.len(), "session authenticated");

    Ok(extracted)
}

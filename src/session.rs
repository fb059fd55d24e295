// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application Sessions
//!
//! Browser-scoped key/value storage. A `uuid` v4 session id travels in an
//! `HttpOnly` cookie; the values live server-side in [`SessionStore`].
//!
//! The store also carries a flash namespace: values written with
//! `flash_put` survive until the next `flash_take`, which consumes them.
//! The gate uses it to carry the original URL across the login round trip.
//!
//! Presence of the [`SESSION_MARKER`] key denotes an authenticated session.
//! Its value is a timestamp kept for diagnostics only; session expiry is the
//! embedding application's concern.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{FromRequestParts, Request},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::GateError;
use crate::state::AppState;

/// Session key whose presence denotes an authenticated session.
pub const SESSION_MARKER: &str = "shibboleth";

/// Name of the session id cookie.
pub const SESSION_COOKIE: &str = "sso_session";

type Values = HashMap<String, String>;

/// Process-wide session storage, keyed by session id.
///
/// Writes are last-writer-wins per key; no read-modify-write cycles are
/// performed across the handful of keys touched per request.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Values>>,
    flash: RwLock<HashMap<String, Values>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, id: &str, key: &str, value: impl Into<String>) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, id: &str, key: &str) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .and_then(|values| values.get(key).cloned())
    }

    pub fn contains(&self, id: &str, key: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .is_some_and(|values| values.contains_key(key))
    }

    /// Remove every value held for this session, flashed values included.
    pub fn clear(&self, id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        self.flash
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    /// Snapshot of all values for this session.
    pub fn snapshot(&self, id: &str) -> Values {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stash a value for the next request.
    pub fn flash_put(&self, id: &str, key: &str, value: impl Into<String>) {
        self.flash
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Consume a flashed value, if one is present.
    pub fn flash_take(&self, id: &str, key: &str) -> Option<String> {
        self.flash
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(id)
            .and_then(|values| values.remove(key))
    }
}

/// Session id assigned by [`attach_session`], carried in request extensions.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Handle binding one session id to the shared store.
///
/// Recoverable from any handler or hook via the `FromRequestParts`
/// extractor; all mutation goes through the store, so `&Session` is enough
/// to read and write.
#[derive(Clone)]
pub struct Session {
    store: Arc<SessionStore>,
    id: String,
}

impl Session {
    pub fn new(store: Arc<SessionStore>, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn put(&self, key: &str, value: impl Into<String>) {
        self.store.put(&self.id, key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(&self.id, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(&self.id, key)
    }

    pub fn clear(&self) {
        self.store.clear(&self.id);
    }

    /// Whether this session holds the authenticated marker.
    pub fn is_authenticated(&self) -> bool {
        self.contains(SESSION_MARKER)
    }

    pub fn snapshot(&self) -> Values {
        self.store.snapshot(&self.id)
    }

    pub fn flash_put(&self, key: &str, value: impl Into<String>) {
        self.store.flash_put(&self.id, key, value);
    }

    pub fn flash_take(&self, key: &str) -> Option<String> {
        self.store.flash_take(&self.id, key)
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = GateError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionId(id) = parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| GateError::internal("session middleware is not installed"))?;
        Ok(Session::new(state.sessions.clone(), id))
    }
}

/// Middleware assigning a session id to every request.
///
/// Reuses the id from the `sso_session` cookie when present, otherwise
/// generates a fresh one and sets the cookie on the response.
pub async fn attach_session(mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), SESSION_COOKIE);
    let fresh = existing.is_none();
    let id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;

    if fresh {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

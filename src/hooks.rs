// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Lifecycle Hooks
//!
//! The embedding application customizes the gate by implementing
//! [`GateHooks`] and injecting it into `AppState` at construction time.
//! Every hook has a sane default, so implementors override only what they
//! need.
//!
//! Invocation order across a full lifecycle:
//!
//! `before_login` -> `before_authentication` -> `on_attribute_failure`? ->
//! `after_authentication` -> `check`* -> `on_check_failed`? ->
//! `before_logout` -> `after_logout`
//!
//! A hook returning `Some(response)` short-circuits the phase: the gate
//! honors that response verbatim and skips its own default behavior.

use axum::response::{IntoResponse, Response};

use crate::attributes::ExtractedAttributes;
use crate::error::GateError;
use crate::session::Session;

/// Extension points invoked at defined points of the gate lifecycle.
pub trait GateHooks: Send + Sync {
    /// Runs before a login redirect is issued.
    fn before_login(&self, _session: &Session) -> Option<Response> {
        None
    }

    /// Runs before attribute extraction starts.
    fn before_authentication(&self, _session: &Session) -> Option<Response> {
        None
    }

    /// Runs after the session has been written.
    ///
    /// The attributes are already in the session. Returning `None` lets the
    /// gate redirect to the resolved return URL.
    fn after_authentication(&self, _session: &Session) -> Option<Response> {
        None
    }

    /// Runs before the session is cleared on logout.
    fn before_logout(&self, _session: &Session) -> Option<Response> {
        None
    }

    /// Runs after the session has been cleared.
    fn after_logout(&self, _session: &Session) -> Option<Response> {
        None
    }

    /// Decide whether the authenticated identity holds the given profile.
    ///
    /// The default grants every profile to any authenticated session.
    fn check(&self, _profile: &str, session: &Session) -> bool {
        session.is_authenticated()
    }

    /// Produce the response for a failed profile check.
    fn on_check_failed(&self, profile: &str) -> Response {
        GateError::forbidden(format!("profile '{profile}' is required for this action"))
            .into_response()
    }

    /// Produce the response for a failed attribute extraction, with
    /// whatever partial attributes were found.
    fn on_attribute_failure(&self, _partial: &ExtractedAttributes) -> Response {
        GateError::authentication_failure(
            "authentication failed because the required security attributes were not found",
        )
        .into_response()
    }
}

/// No-op implementation carrying only the default behaviors.
#[derive(Debug, Default)]
pub struct DefaultHooks;

impl GateHooks for DefaultHooks {}

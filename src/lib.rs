// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! sso-gate - Header-Based SSO Access Gate
//!
//! This crate gates an axum application behind an external Single-Sign-On
//! front-end that authenticates users out-of-band (at the reverse proxy
//! layer) and injects trust attributes as HTTP request headers. The gate
//! trusts those headers under the assumption that the upstream proxy
//! strips any attacker-supplied header of the same name.
//!
//! ## Modules
//!
//! - `attributes` - header-to-attribute mapping, splitting, validation
//! - `gate` - the per-request access-control state machine (middleware)
//! - `routes` - the `/sso/login`, `/sso/authenticate`, `/sso/logout` actions
//! - `hooks` - extension points for the embedding application
//! - `session` - browser-scoped key/value sessions
//! - `mock` - configurable header test double

pub mod attributes;
pub mod config;
pub mod error;
pub mod gate;
pub mod headers;
pub mod hooks;
pub mod mock;
pub mod routes;
pub mod session;
pub mod state;

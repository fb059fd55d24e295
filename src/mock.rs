// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mock SSO headers.
//!
//! When the gate runs in mock mode (`mode = mock`, non-production), the
//! authenticate phase reads headers from this store instead of the real
//! transport. The store is seeded from `mock.<header> = <value>`
//! configuration keys and stays mutable so individual test cases can shape
//! the headers they need.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::GateConfig;
use crate::headers::RawHeaderSet;

/// Mutable set of fake SSO headers.
#[derive(Default)]
pub struct MockHeaders {
    headers: RwLock<HashMap<String, Vec<String>>>,
}

impl MockHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from the `mock.*` configuration entries.
    pub fn from_config(config: &GateConfig) -> Self {
        let mock = Self::new();
        mock.reload(config);
        mock
    }

    /// Replace all headers with the configured `mock.*` entries.
    pub fn reload(&self, config: &GateConfig) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.clear();
        for (name, value) in &config.mock_headers {
            headers
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.clone());
        }
    }

    /// Set a header to a single value, replacing any previous values.
    pub fn set(&self, name: &str, value: impl Into<String>) {
        self.headers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Set a header to multiple values, for ambiguous-header scenarios.
    pub fn set_multi(&self, name: &str, values: impl IntoIterator<Item = impl Into<String>>) {
        self.headers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                name.to_ascii_lowercase(),
                values.into_iter().map(Into::into).collect(),
            );
    }

    pub fn remove(&self, name: &str) {
        self.headers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name.to_ascii_lowercase());
    }

    pub fn remove_all(&self) {
        self.headers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Capture the current headers as a [`RawHeaderSet`] for extraction.
    pub fn snapshot(&self) -> RawHeaderSet {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        let mut set = RawHeaderSet::new();
        for (name, values) in headers.iter() {
            for value in values {
                set.append(name, value.clone());
            }
        }
        set
    }
}

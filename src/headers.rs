// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw request headers as seen by the attribute mapper.
//!
//! The gate never reads `axum::http::HeaderMap` directly during attribute
//! extraction. Both the real transport and the mock test double are first
//! converted into a [`RawHeaderSet`], so the extraction logic treats the two
//! sources identically.

use std::collections::HashMap;

use axum::http::HeaderMap;
use tracing::warn;

/// Mapping of header name to the ordered sequence of values received.
///
/// Header names are normalized to ASCII lowercase on insert so lookups are
/// case-insensitive, matching HTTP semantics.
#[derive(Debug, Clone, Default)]
pub struct RawHeaderSet {
    headers: HashMap<String, Vec<String>>,
}

impl RawHeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the real transport headers.
    ///
    /// Values that are not valid UTF-8 are dropped with a warning; SSO
    /// attribute headers are text by construction.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut set = Self::new();
        for (name, value) in headers {
            match value.to_str() {
                Ok(value) => set.append(name.as_str(), value),
                Err(_) => {
                    warn!(header = %name, "dropping non-UTF-8 header value");
                }
            }
        }
        set
    }

    /// Append one value for a header, preserving the order received.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values received for a header, in order.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over all (name, values) pairs, for trace logging.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.headers
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for RawHeaderSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.append(&name.into(), value);
        }
        set
    }
}

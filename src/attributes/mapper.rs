// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mapping of logical attribute names to HTTP header names.
//!
//! Configuration keys of the form `attribute.<logicalName> = <headerName>`
//! declare which trusted header carries each identity attribute. Extraction
//! resolves that mapping against the raw headers of one request, producing a
//! single string value per logical attribute.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::headers::RawHeaderSet;

/// Configuration key prefix declaring one attribute mapping entry.
pub const ATTRIBUTE_PREFIX: &str = "attribute.";

/// Logical attribute name -> source header name.
pub type AttributeMapping = BTreeMap<String, String>;

/// Logical attribute name -> extracted value, built fresh per
/// authentication attempt.
pub type ExtractedAttributes = HashMap<String, String>;

/// Derive the attribute mapping from configuration entries.
///
/// Keys under [`ATTRIBUTE_PREFIX`] contribute one entry each; duplicate
/// logical names are last-wins. Unrelated keys are ignored.
pub fn build_mapping<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> AttributeMapping {
    let mut mapping = AttributeMapping::new();
    for (key, value) in entries {
        if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            if attribute.is_empty() {
                continue;
            }
            mapping.insert(attribute.to_string(), value.to_string());
        }
    }
    mapping
}

/// Resolve the mapping against one request's raw headers.
///
/// A missing header means the attribute is simply absent. A header carrying
/// more than one value is ambiguous: the first value wins and a warning is
/// logged. An empty-string value means the SSO front-end had no value for
/// the attribute (Shibboleth sends blank headers for unset attributes) and
/// is treated as absent.
pub fn extract(mapping: &AttributeMapping, headers: &RawHeaderSet) -> ExtractedAttributes {
    let mut extracted = ExtractedAttributes::new();

    for (attribute, header_name) in mapping {
        let Some(values) = headers.values(header_name) else {
            debug!(%attribute, header = %header_name, "header not present, skipping attribute");
            continue;
        };

        if values.len() > 1 {
            warn!(
                %attribute,
                header = %header_name,
                count = values.len(),
                "received multiple values for a single-valued attribute, picking the first"
            );
        }

        let Some(value) = values.first() else {
            continue;
        };

        if value.is_empty() {
            continue;
        }

        debug!(%attribute, %value, "received attribute");
        extracted.insert(attribute.clone(), value.clone());
    }

    extracted
}

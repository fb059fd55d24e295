// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification of required identity attributes.

use super::mapper::ExtractedAttributes;

/// Check that every required logical attribute was extracted.
///
/// Returns the missing names on failure so the caller can log them and hand
/// the partial attribute set to the failure hook. An empty required set
/// always passes.
pub fn verify(required: &[String], extracted: &ExtractedAttributes) -> Result<(), Vec<String>> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !extracted.contains_key(name.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

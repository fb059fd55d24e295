// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Splitting of multi-value attribute strings.
//!
//! Shibboleth-style SSO front-ends pack multiple values for one attribute
//! into a single header, separated by semicolons. A literal semicolon inside
//! a value is escaped with a backslash (`\;`).

/// Split a multi-value attribute into its individual values.
///
/// Components are separated by `;`. An escaped separator (`\;`) is kept as
/// a literal `;` in the emitted value, with the escape removed. A backslash
/// before any other character is preserved verbatim. Empty components
/// (including a leading `;` on malformed input) are skipped.
///
/// ```
/// use sso_gate::attributes::split;
///
/// assert_eq!(split(r"a\;b;c"), vec!["a;b", "c"]);
/// ```
pub fn split(attribute: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = attribute.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => current.push(';'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ';' => {
                if !current.is_empty() {
                    values.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    // Whatever trails the last separator is the final value.
    if !current.is_empty() {
        values.push(current);
    }

    values
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Attribute Extraction
//!
//! The engine that turns SSO-injected HTTP headers into application identity
//! attributes:
//!
//! - `splitter` - multi-value attribute strings (`a\;b;c`)
//! - `mapper` - configured logical-name -> header-name mapping and extraction
//! - `validator` - required-attribute verification

pub mod mapper;
pub mod splitter;
pub mod validator;

pub use mapper::{build_mapping, extract, AttributeMapping, ExtractedAttributes};
pub use splitter::split;
pub use validator::verify;

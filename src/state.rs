// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::GateConfig;
use crate::hooks::{DefaultHooks, GateHooks};
use crate::mock::MockHeaders;
use crate::session::SessionStore;

/// Shared application state: the immutable configuration, the session
/// store, the injected hooks, and the mock header double.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub sessions: Arc<SessionStore>,
    pub hooks: Arc<dyn GateHooks>,
    pub mock: Arc<MockHeaders>,
}

impl AppState {
    pub fn new(config: GateConfig) -> Self {
        let mock = MockHeaders::from_config(&config);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new()),
            hooks: Arc::new(DefaultHooks),
            mock: Arc::new(mock),
        }
    }

    /// Inject an application-specific hook implementation.
    pub fn with_hooks(mut self, hooks: impl GateHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

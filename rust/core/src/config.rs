// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loader configuration loaded from environment variables.

/// Default limit on chains of external style documents.
pub const DEFAULT_MAX_EXTERNAL_DEPTH: usize = 8;

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Locator used to resolve relative style references when a document is
    /// loaded without one.
    pub base_uri: Option<String>,
    /// How many levels of external style documents are followed.
    pub max_external_depth: usize,
}

impl LoaderConfig {
    /// Configuration with no base locator and the default depth limit.
    pub fn new() -> Self {
        Self {
            base_uri: None,
            max_external_depth: DEFAULT_MAX_EXTERNAL_DEPTH,
        }
    }

    /// Builder: set the base locator.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Builder: set the external document depth limit.
    pub fn with_max_external_depth(mut self, depth: usize) -> Self {
        self.max_external_depth = depth;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `KML_BASE_URI`: base locator (unset or empty means none)
    /// - `KML_MAX_EXTERNAL_DEPTH`: external document depth limit
    pub fn from_env() -> Self {
        Self {
            base_uri: std::env::var("KML_BASE_URI")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            max_external_depth: std::env::var("KML_MAX_EXTERNAL_DEPTH")
                .unwrap_or_else(|_| DEFAULT_MAX_EXTERNAL_DEPTH.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_EXTERNAL_DEPTH),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

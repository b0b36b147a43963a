// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use thiserror::Error;

/// Result type for KML loading
pub type Result<T> = std::result::Result<T, Error>;

/// Error produced by a [`DocumentFetcher`](crate::fetch::DocumentFetcher)
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while loading a KML document
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Malformed coordinate: {0}")]
    MalformedCoordinate(String),

    #[error("Unknown geometry in placemark {placemark:?}")]
    UnknownGeometry { placemark: Option<String> },

    #[error("Open ring: the first and last coordinate tuples must be the same")]
    OpenRing,

    #[error("Malformed styleUrl {0:?}: expected exactly one '#' separator")]
    MalformedStyleUrl(String),

    #[error("Failed to fetch {uri}: {source}")]
    FetchFailure {
        uri: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("Missing input: {0} is required")]
    MissingInput(&'static str),

    #[error("Markup error at byte {position}: {message}")]
    Markup { position: usize, message: String },

    #[error("Invalid URI {uri:?}: {message}")]
    InvalidUri { uri: String, message: String },
}

impl Error {
    /// Create a malformed coordinate error
    pub fn malformed_coordinate(message: impl Into<String>) -> Self {
        Error::MalformedCoordinate(message.into())
    }

    /// Create a markup error
    pub fn markup(position: usize, message: impl Into<String>) -> Self {
        Error::Markup {
            position,
            message: message.into(),
        }
    }

    /// Wrap a fetch collaborator failure
    pub fn fetch(uri: impl Into<String>, source: impl Into<FetchError>) -> Self {
        let source: FetchError = source.into();
        Error::FetchFailure {
            uri: uri.into(),
            source: Arc::from(source),
        }
    }

    /// True for failures of the asynchronous document fetch
    #[inline]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::FetchFailure { .. })
    }
}

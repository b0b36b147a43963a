// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document fetch collaborator
//!
//! The loader reaches other documents only through [`DocumentFetcher`]. A
//! fetch must settle: resolve with the parsed document or reject with the
//! reason, never hang.

use futures::future::{FutureExt, LocalBoxFuture};
use url::Url;

use crate::error::FetchError;
use crate::tree::Node;

/// Fetches and parses a document by absolute URI
pub trait DocumentFetcher {
    fn fetch<'a>(&'a self, uri: &'a str) -> LocalBoxFuture<'a, Result<Node, FetchError>>;
}

impl<T: DocumentFetcher + ?Sized> DocumentFetcher for &T {
    fn fetch<'a>(&'a self, uri: &'a str) -> LocalBoxFuture<'a, Result<Node, FetchError>> {
        (**self).fetch(uri)
    }
}

/// Reads documents from the local file system
///
/// Accepts `file://` URLs and plain paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }

    fn read(uri: &str) -> Result<Node, FetchError> {
        let path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| format!("{} is not a local file", uri))?,
            Ok(url) => return Err(format!("unsupported scheme {:?}", url.scheme()).into()),
            Err(_) => std::path::PathBuf::from(uri),
        };

        let content = std::fs::read_to_string(&path)?;
        Ok(Node::parse(&content)?)
    }
}

impl DocumentFetcher for FileFetcher {
    fn fetch<'a>(&'a self, uri: &'a str) -> LocalBoxFuture<'a, Result<Node, FetchError>> {
        async move {
            tracing::debug!(uri, "Reading document");
            Self::read(uri)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_fetcher_reads_path_and_url() {
        let dir = std::env::temp_dir().join(format!("kml-lite-fetch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("styles.kml");
        std::fs::write(&path, r#"<kml><Style id="s"/></kml>"#).unwrap();

        let fetcher = FileFetcher::new();
        let by_path = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(by_path.tag(), "kml");

        let url = Url::from_file_path(&path).unwrap();
        let by_url = fetcher.fetch(url.as_str()).await.unwrap();
        assert_eq!(by_url, by_path);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_file_fetcher_rejects() {
        let fetcher = FileFetcher::new();
        assert!(fetcher.fetch("/definitely/not/here.kml").await.is_err());
        assert!(fetcher.fetch("https://example.com/doc.kml").await.is_err());
    }
}

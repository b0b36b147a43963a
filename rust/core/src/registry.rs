// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Style Registry
//!
//! Keyed store of the shared styles a load can reference. Keys are the
//! literal `styleUrl` text after resolution:
//!
//! - `#id` for a style defined in the document being loaded
//! - `<absolute document uri>#id` for a style defined in an external document
//!
//! The registry is filled in two passes. The local pass registers the `Style`
//! elements of one document. The external pass finds `styleUrl` values that
//! point into other documents, fetches every distinct document once, and
//! runs both passes on it again, until no document is left to fetch.

use futures::future::try_join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::DocumentFetcher;
use crate::style::StyleDefinition;
use crate::tree::Node;

/// Lookup key of a shared style
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleKey(String);

impl StyleKey {
    /// Key of style `id` defined in `document`, or in the loaded document
    /// itself when `document` is `None`
    pub fn scoped(document: Option<&str>, id: &str) -> Self {
        match document {
            Some(document) => StyleKey(format!("{}#{}", document, id)),
            None => StyleKey(format!("#{}", id)),
        }
    }

    /// Key a `styleUrl` value refers to, resolving its document part against
    /// `base` the same way the external pass does
    pub fn from_style_url(value: &str, base: Option<&Url>) -> Result<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Ok(StyleKey(value.to_string()));
        }
        let (document, fragment) = split_style_url(value)?;
        Ok(StyleKey::scoped(Some(&resolve_document(document, base)?), fragment))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StyleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split `document#fragment`; exactly one `#` is allowed
fn split_style_url(value: &str) -> Result<(&str, &str)> {
    let mut separators = memchr::memchr_iter(b'#', value.as_bytes());
    match (separators.next(), separators.next()) {
        (Some(at), None) => Ok((&value[..at], &value[at + 1..])),
        _ => Err(Error::MalformedStyleUrl(value.to_string())),
    }
}

/// Resolve a document reference to the absolute form used in keys
///
/// Without a base, absolute URLs are normalized and anything else is kept
/// verbatim.
pub fn resolve_document(reference: &str, base: Option<&Url>) -> Result<String> {
    match base {
        Some(base) => base
            .join(reference)
            .map(String::from)
            .map_err(|e| Error::InvalidUri {
                uri: reference.to_string(),
                message: e.to_string(),
            }),
        None => Ok(Url::parse(reference)
            .map(String::from)
            .unwrap_or_else(|_| reference.to_string())),
    }
}

/// Interpret a source locator as a URL
///
/// Absolute URLs are taken as they are; anything else is a file path,
/// relative ones being resolved against the working directory.
pub fn locator_url(locator: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(locator) {
        return Ok(url);
    }
    let invalid = |message: String| Error::InvalidUri {
        uri: locator.to_string(),
        message,
    };
    let path = std::path::Path::new(locator);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| invalid(e.to_string()))?
            .join(path)
    };
    Url::from_file_path(&path).map_err(|_| invalid("not a usable file path".to_string()))
}

/// Keyed store of style definitions
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: FxHashMap<StyleKey, StyleDefinition>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style registered under `key`
    #[inline]
    pub fn lookup(&self, key: &StyleKey) -> Option<&StyleDefinition> {
        self.styles.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &StyleKey) -> bool {
        self.styles.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn clear(&mut self) {
        self.styles.clear();
    }

    /// Local pass: register every `Style` with an `id` in `document`
    ///
    /// Keys already in the registry are left alone. Within the document the
    /// first definition of a duplicated id is the one registered.
    /// Returns the number of new keys.
    pub fn register_local_styles(&mut self, document: &Node, scope: Option<&str>) -> usize {
        let styles: Vec<&Node> = document.descendants("Style").collect();

        // Walk backwards so the first occurrence is the last one written
        let mut local: FxHashMap<StyleKey, &Node> = FxHashMap::default();
        for node in styles.into_iter().rev() {
            if let Some(id) = node.id() {
                local.insert(StyleKey::scoped(scope, id), node);
            }
        }

        let mut added = 0;
        for (key, node) in local {
            if !self.styles.contains_key(&key) {
                self.styles.insert(key, StyleDefinition::from_node(node));
                added += 1;
            }
        }
        added
    }

    /// External pass: fetch and register every document referenced by a
    /// `styleUrl` of `document`, transitively
    ///
    /// Each distinct absolute document is fetched at most once. The fetches of
    /// one round run together and all of them must succeed; the first failure
    /// aborts the pass. Documents nested deeper than `max_depth` references
    /// are skipped. Returns the number of documents fetched.
    pub async fn resolve_external<F>(
        &mut self,
        document: &Node,
        base: Option<&Url>,
        fetcher: &F,
        max_depth: usize,
    ) -> Result<usize>
    where
        F: DocumentFetcher + ?Sized,
    {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut pending: Vec<String> = external_documents(document, base)?
            .into_iter()
            .filter(|uri| seen.insert(uri.clone()))
            .collect();
        let mut fetched_count = 0;
        let mut depth = 1;

        while !pending.is_empty() {
            if depth > max_depth {
                tracing::warn!(
                    max_depth,
                    skipped = pending.len(),
                    "External style documents nested too deeply, skipping"
                );
                break;
            }

            tracing::debug!(round = depth, documents = pending.len(), "Fetching external style documents");

            let fetched = try_join_all(pending.iter().map(|uri| async move {
                fetcher
                    .fetch(uri)
                    .await
                    .map(|node| (uri.as_str(), node))
                    .map_err(|e| Error::fetch(uri.as_str(), e))
            }))
            .await?;
            fetched_count += fetched.len();

            let mut next = Vec::new();
            for (uri, fetched_document) in fetched {
                let added = self.register_local_styles(&fetched_document, Some(uri));
                tracing::debug!(uri, styles = added, "Registered external styles");

                let document_base = Url::parse(uri).ok();
                for reference in external_documents(&fetched_document, document_base.as_ref())? {
                    if seen.insert(reference.clone()) {
                        next.push(reference);
                    }
                }
            }

            pending = next;
            depth += 1;
        }

        Ok(fetched_count)
    }
}

/// Distinct absolute documents referenced by the `styleUrl`s of `document`,
/// in document order
pub fn external_documents(document: &Node, base: Option<&Url>) -> Result<Vec<String>> {
    let mut documents: Vec<String> = Vec::new();
    for node in document.descendants("styleUrl") {
        let text = node.text();
        let value = text.trim();
        if value.starts_with('#') {
            continue;
        }
        let (reference, _) = split_style_url(value)?;
        let resolved = resolve_document(reference, base)?;
        if !documents.contains(&resolved) {
            documents.push(resolved);
        }
    }
    Ok(documents)
}

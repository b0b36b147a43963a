// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document Load Orchestrator
//!
//! [`KmlDataSource`] owns the entity collection and the style registry and
//! loads one document at a time in two phases:
//!
//! 1. **Style resolution**: register the document's own styles, then fetch
//!    every external style document it needs. Nothing else happens until
//!    all fetches have settled.
//! 2. **Entity materialization**: turn each `Placemark` into an entity with
//!    its cascaded style, geometry and name.
//!
//! A load either materializes every placemark or none. Loads are serialized
//! by `&mut self`; a listener that wants to start another load must wait
//! until the current call has returned.

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use url::Url;
use uuid::Uuid;

use crate::cascade::{apply_to_entity, resolve_inline_and_shared};
use crate::config::LoaderConfig;
use crate::entity::EntityCollection;
use crate::error::{Error, Result};
use crate::fetch::DocumentFetcher;
use crate::geometry::{classify, extract};
use crate::registry::{locator_url, StyleRegistry};
use crate::tree::Node;

/// Where a data source is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet
    Idle,
    StyleResolution,
    EntityMaterialization,
    Loaded,
    Failed,
}

/// Summary of a successfully loaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Locator the document was loaded from, if known
    pub source: Option<String>,
    pub entity_count: usize,
    pub style_count: usize,
    /// External style documents fetched during the load
    pub external_documents: usize,
}

/// Document-level notification
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// A document finished loading
    Changed(DocumentHandle),
    /// A document failed while resolving its documents
    Error(Error),
}

/// Loads KML documents into an [`EntityCollection`]
pub struct KmlDataSource<F> {
    fetcher: F,
    config: LoaderConfig,
    entities: EntityCollection,
    styles: StyleRegistry,
    state: LoadState,
    listeners: Vec<UnboundedSender<LoadEvent>>,
}

impl<F: DocumentFetcher> KmlDataSource<F> {
    /// Create a data source with configuration from the environment
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, LoaderConfig::default())
    }

    pub fn with_config(fetcher: F, config: LoaderConfig) -> Self {
        Self {
            fetcher,
            config,
            entities: EntityCollection::new(),
            styles: StyleRegistry::new(),
            state: LoadState::Idle,
            listeners: Vec::new(),
        }
    }

    /// Entities of the last load
    #[inline]
    pub fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    /// Styles registered by the last load
    #[inline]
    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    #[inline]
    pub fn state(&self) -> LoadState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    #[inline]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Receive `Changed`/`Error` notifications of subsequent loads
    pub fn subscribe(&mut self) -> UnboundedReceiver<LoadEvent> {
        let (sender, receiver) = unbounded();
        self.listeners.push(sender);
        receiver
    }

    /// Fetch the document at `uri` and load it, replacing any existing data
    pub async fn load_url(&mut self, uri: &str) -> Result<DocumentHandle> {
        if uri.trim().is_empty() {
            return Err(Error::MissingInput("url"));
        }
        self.begin();

        let locator = match locator_url(uri.trim()) {
            Ok(url) => url,
            Err(error) => return Err(self.fail(error)),
        };

        tracing::info!(uri = %locator, "Fetching KML document");
        let document = match self.fetcher.fetch(locator.as_str()).await {
            Ok(document) => document,
            Err(source) => return Err(self.fail(Error::fetch(locator.as_str(), source))),
        };

        self.load(&document, Some(locator.as_str())).await
    }

    /// Load a parsed document, replacing any existing data
    ///
    /// `source` is the document's own locator; relative external style
    /// references are resolved against it (or against the configured base
    /// locator when it is `None`).
    pub async fn load(&mut self, document: &Node, source: Option<&str>) -> Result<DocumentHandle> {
        self.begin();

        let source = source
            .map(str::to_string)
            .or_else(|| self.config.base_uri.clone());
        let base = match source.as_deref().map(locator_url).transpose() {
            Ok(base) => base,
            Err(error) => return Err(self.fail(error)),
        };

        tracing::info!(source = ?source, "Loading KML document");

        // Phase 1
        let local_styles = self.styles.register_local_styles(document, None);
        let external_documents = match self
            .styles
            .resolve_external(
                document,
                base.as_ref(),
                &self.fetcher,
                self.config.max_external_depth,
            )
            .await
        {
            Ok(count) => count,
            Err(error) => return Err(self.fail(error)),
        };
        tracing::debug!(
            local_styles,
            external_documents,
            styles = self.styles.len(),
            "Style resolution complete"
        );

        // Phase 2
        self.state = LoadState::EntityMaterialization;
        if let Err(error) = self.materialize(document, base.as_ref()) {
            tracing::warn!(%error, "Aborting KML load");
            self.entities.clear();
            self.state = LoadState::Failed;
            return Err(error);
        }

        self.state = LoadState::Loaded;
        let handle = DocumentHandle {
            source,
            entity_count: self.entities.len(),
            style_count: self.styles.len(),
            external_documents,
        };
        tracing::info!(
            entities = handle.entity_count,
            styles = handle.style_count,
            external_documents,
            "KML document loaded"
        );
        self.emit(LoadEvent::Changed(handle.clone()));
        Ok(handle)
    }

    /// Reset both collections for a new load
    fn begin(&mut self) {
        self.entities.clear();
        self.styles.clear();
        self.state = LoadState::StyleResolution;
    }

    /// Terminal failure while resolving documents
    fn fail(&mut self, error: Error) -> Error {
        tracing::warn!(%error, "KML load failed");
        self.entities.clear();
        self.state = LoadState::Failed;
        self.emit(LoadEvent::Error(error.clone()));
        error
    }

    fn materialize(&mut self, document: &Node, base: Option<&Url>) -> Result<()> {
        for placemark in document.descendants("Placemark") {
            let id = placemark
                .id()
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let entity = self.entities.get_or_create(&id);

            let (kind, geometry_node) = classify(placemark)?;
            let style = resolve_inline_and_shared(placemark, &self.styles, base)?;
            apply_to_entity(entity, &style, kind);
            entity.geometry = Some(extract(kind, geometry_node)?);

            let name = placemark
                .child("name")
                .map(|name| name.text().trim().to_string());
            entity.set_name(name);
        }
        Ok(())
    }

    fn emit(&mut self, event: LoadEvent) {
        self.listeners
            .retain(|listener| listener.unbounded_send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use futures::future::{FutureExt, LocalBoxFuture};
    use futures::StreamExt;

    struct NoFetch;

    impl DocumentFetcher for NoFetch {
        fn fetch<'a>(
            &'a self,
            uri: &'a str,
        ) -> LocalBoxFuture<'a, std::result::Result<Node, FetchError>> {
            async move { Err::<Node, FetchError>(format!("no network for {}", uri).into()) }
                .boxed_local()
        }
    }

    fn data_source() -> KmlDataSource<NoFetch> {
        KmlDataSource::with_config(NoFetch, LoaderConfig::new())
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let mut source = data_source();
        assert_eq!(source.state(), LoadState::Idle);

        let doc = Node::parse("<kml><Placemark><Point><coordinates>1,2</coordinates></Point></Placemark></kml>").unwrap();
        source.load(&doc, None).await.unwrap();
        assert_eq!(source.state(), LoadState::Loaded);

        let bad =
            Node::parse("<kml><Placemark><name>no geometry</name></Placemark></kml>").unwrap();
        assert!(matches!(source.load(&bad, None).await, Err(Error::UnknownGeometry { .. })));
        assert_eq!(source.state(), LoadState::Failed);
        assert!(source.entities().is_empty());
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let mut source = data_source();
        let doc = Node::parse(
            "<kml><Placemark><Point><coordinates>1,2</coordinates></Point></Placemark>\
             <Placemark><Point><coordinates>3,4</coordinates></Point></Placemark></kml>",
        )
        .unwrap();
        let handle = source.load(&doc, None).await.unwrap();
        assert_eq!(handle.entity_count, 2);
        let ids: Vec<_> = source.entities().iter().map(|e| e.id().to_string()).collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_empty_url_is_missing_input() {
        let mut source = data_source();
        let mut events = source.subscribe();
        assert!(matches!(source.load_url("  ").await, Err(Error::MissingInput(_))));
        assert_eq!(source.state(), LoadState::Idle);
        assert!(events.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_load_url_fetch_failure_notifies() {
        let mut source = data_source();
        let mut events = source.subscribe();

        let error = source.load_url("https://host/doc.kml").await.unwrap_err();
        assert!(error.is_fetch_failure());
        assert_eq!(source.state(), LoadState::Failed);
        assert!(matches!(events.next().now_or_never(), Some(Some(LoadEvent::Error(_)))));
    }
}

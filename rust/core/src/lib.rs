// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # KML-Lite Core
//!
//! Loads KML documents into styled, addressable scene entities.
//!
//! ## Overview
//!
//! - **Markup Tree**: owned element tree, built by the caller or parsed with
//!   [quick-xml](https://docs.rs/quick-xml)
//! - **Coordinates**: `lon,lat[,alt]` text to WGS84 Cartesian positions
//! - **Geometry**: `Point`, `LineString`, `LinearRing` and `Polygon` placemarks
//! - **Styles**: inline, shared and external styles combined with
//!   fill-if-absent precedence
//! - **Data Source**: the two-phase loader that fetches every external style
//!   document before materializing a single entity
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kml_lite_core::{FileFetcher, KmlDataSource};
//!
//! let mut source = KmlDataSource::new(FileFetcher::new());
//! let handle = source.load_url("data/trails.kml").await?;
//!
//! for entity in source.entities() {
//!     println!("{}: {:?}", entity.id(), entity.geometry_kind());
//! }
//! ```
//!
//! ## Concurrency
//!
//! Everything runs on the caller's task. External style documents of one
//! round are fetched concurrently through [`DocumentFetcher`]; parsing and
//! styling are synchronous. Futures are not `Send`.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization of entities and styles

pub mod cascade;
pub mod config;
pub mod coordinates;
pub mod data_source;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod registry;
pub mod style;
pub mod tree;

pub use cascade::{apply_to_entity, resolve_inline_and_shared};
pub use config::LoaderConfig;
pub use coordinates::{
    parse_coordinate_block, to_cartesian, to_cartesian_many, CoordinateBlock, GeodeticTuple,
    Position,
};
pub use data_source::{DocumentHandle, KmlDataSource, LoadEvent, LoadState};
pub use entity::{Entity, EntityCollection};
pub use error::{Error, FetchError, Result};
pub use fetch::{DocumentFetcher, FileFetcher};
pub use geometry::{classify, extract, Geometry, GeometryKind};
pub use registry::{StyleKey, StyleRegistry};
pub use style::{
    Color, ColorMode, FillIfAbsent, IconStyle, LabelStyle, LineStyle, PolygonStyle,
    StyleDefinition,
};
pub use tree::Node;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Collection - scene entities keyed by identity

use rustc_hash::FxHashMap;

use crate::coordinates::Position;
use crate::geometry::{Geometry, GeometryKind};
use crate::style::{IconStyle, LabelStyle, LineStyle, PolygonStyle};

/// One materialized placemark
///
/// The property bags are `None` until a style routed to them is applied.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Entity {
    id: String,
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
    pub billboard: Option<IconStyle>,
    pub label: Option<LabelStyle>,
    pub polyline: Option<LineStyle>,
    pub polygon: Option<PolygonStyle>,
}

impl Entity {
    /// Create an entity with empty property bags
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        self.geometry.as_ref().map(Geometry::kind)
    }

    /// Position of a point entity
    pub fn position(&self) -> Option<&Position> {
        match &self.geometry {
            Some(Geometry::Point(position)) => Some(position),
            _ => None,
        }
    }

    /// Vertices of a line or ring entity
    pub fn vertex_positions(&self) -> Option<&[Position]> {
        match &self.geometry {
            Some(Geometry::LineString(positions)) | Some(Geometry::LinearRing(positions)) => {
                Some(positions)
            }
            _ => None,
        }
    }

    /// Set the name; an existing label takes it as its text
    pub fn set_name(&mut self, name: Option<String>) {
        if let (Some(label), Some(name)) = (self.label.as_mut(), name.as_ref()) {
            label.text = Some(name.clone());
        }
        self.name = name;
    }
}

/// Identity-keyed store of entities, iterated in insertion order
#[derive(Debug, Default)]
pub struct EntityCollection {
    index: FxHashMap<String, usize>,
    entities: Vec<Entity>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing entity with this id, or a new empty one
    pub fn get_or_create(&mut self, id: &str) -> &mut Entity {
        let slot = match self.index.get(id) {
            Some(&slot) => slot,
            None => {
                let slot = self.entities.len();
                self.entities.push(Entity::new(id));
                self.index.insert(id.to_string(), slot);
                slot
            }
        };
        &mut self.entities[slot]
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&slot| &self.entities[slot])
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Drop every entity
    pub fn clear(&mut self) {
        self.index.clear();
        self.entities.clear();
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Resolver
//!
//! Finds the geometry element of a placemark and turns its coordinate blocks
//! into Cartesian positions.

use crate::coordinates::{
    parse_coordinate_block, to_cartesian, to_cartesian_many, GeodeticTuple, Position,
};
use crate::error::{Error, Result};
use crate::tree::Node;

/// Supported geometry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GeometryKind {
    Point,
    LineString,
    LinearRing,
    Polygon,
}

impl GeometryKind {
    /// Map a KML tag name to a geometry kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Point" => Some(GeometryKind::Point),
            "LineString" => Some(GeometryKind::LineString),
            "LinearRing" => Some(GeometryKind::LinearRing),
            "Polygon" => Some(GeometryKind::Polygon),
            _ => None,
        }
    }

    /// KML tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::LinearRing => "LinearRing",
            GeometryKind::Polygon => "Polygon",
        }
    }
}

/// Positions extracted from a geometry element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    LinearRing(Vec<Position>),
    /// Boundary positions of all rings, outer first. Validated but not
    /// materialized as polygon visuals.
    Polygon(Vec<Position>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::LinearRing(_) => GeometryKind::LinearRing,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }
}

/// Find the first direct child of a placemark that is a supported geometry
pub fn classify(placemark: &Node) -> Result<(GeometryKind, &Node)> {
    placemark
        .children()
        .iter()
        .find_map(|child| GeometryKind::from_tag(child.tag()).map(|kind| (kind, child)))
        .ok_or_else(|| Error::UnknownGeometry {
            placemark: placemark.id().map(str::to_string),
        })
}

/// Extract the geometry of the given kind from its element
pub fn extract(kind: GeometryKind, node: &Node) -> Result<Geometry> {
    let tuples = read_coordinates(node)?;

    match kind {
        GeometryKind::Point => {
            let first = tuples.first().ok_or_else(|| {
                Error::malformed_coordinate("point has no coordinates")
            })?;
            Ok(Geometry::Point(to_cartesian(first)))
        }
        GeometryKind::LineString => Ok(Geometry::LineString(to_cartesian_many(&tuples))),
        GeometryKind::LinearRing => {
            ensure_closed(&tuples)?;
            Ok(Geometry::LinearRing(to_cartesian_many(&tuples)))
        }
        GeometryKind::Polygon => {
            for ring in node.descendants("LinearRing") {
                ensure_closed(&read_coordinates(ring)?)?;
            }
            Ok(Geometry::Polygon(to_cartesian_many(&tuples)))
        }
    }
}

/// Concatenate every `coordinates` block below the node, in document order
fn read_coordinates(node: &Node) -> Result<Vec<GeodeticTuple>> {
    let mut tuples = Vec::new();
    for block in node.descendants("coordinates") {
        tuples.extend(parse_coordinate_block(&block.text())?.into_vec());
    }
    Ok(tuples)
}

/// First and last tuple must match component-wise
fn ensure_closed(tuples: &[GeodeticTuple]) -> Result<()> {
    match (tuples.first(), tuples.last()) {
        (Some(first), Some(last)) if first == last => Ok(()),
        (None, None) => Ok(()),
        _ => Err(Error::OpenRing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placemark(xml: &str) -> Node {
        Node::parse(xml).unwrap()
    }

    #[test]
    fn test_classify_first_geometry_wins() {
        let node = placemark(
            "<Placemark><name>x</name><LineString><coordinates>0,0 1,1</coordinates></LineString>\
             <Point><coordinates>0,0</coordinates></Point></Placemark>",
        );
        let (kind, geometry) = classify(&node).unwrap();
        assert_eq!(kind, GeometryKind::LineString);
        assert_eq!(geometry.tag(), "LineString");
    }

    #[test]
    fn test_classify_ignores_nested_geometry() {
        let node = placemark(
            "<Placemark id=\"p\"><MultiGeometry><Point><coordinates>0,0</coordinates></Point></MultiGeometry></Placemark>",
        );
        match classify(&node) {
            Err(Error::UnknownGeometry { placemark }) => {
                assert_eq!(placemark.as_deref(), Some("p"))
            }
            other => panic!("Expected UnknownGeometry, got {:?}", other.map(|(k, _)| k)),
        }
    }

    #[test]
    fn test_point_extraction() {
        let node = placemark("<Point><coordinates>10,20,0</coordinates></Point>");
        let geometry = extract(GeometryKind::Point, &node).unwrap();
        let expected = to_cartesian(&GeodeticTuple::new(10.0, 20.0, Some(0.0)));
        assert_eq!(geometry, Geometry::Point(expected));
    }

    #[test]
    fn test_point_without_coordinates() {
        let node = placemark("<Point/>");
        assert!(matches!(
            extract(GeometryKind::Point, &node),
            Err(Error::MalformedCoordinate(_))
        ));
    }

    #[test]
    fn test_multiple_blocks_are_concatenated() {
        let node = placemark(
            "<LineString><coordinates>0,0 1,1</coordinates><coordinates>2,2</coordinates></LineString>",
        );
        match extract(GeometryKind::LineString, &node).unwrap() {
            Geometry::LineString(positions) => assert_eq!(positions.len(), 3),
            other => panic!("Expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_between_tuples() {
        let node = placemark(
            "<LineString><coordinates>1,2 <!-- second vertex --> 3,4</coordinates></LineString>",
        );
        match extract(GeometryKind::LineString, &node).unwrap() {
            Geometry::LineString(positions) => {
                assert_eq!(positions.len(), 2);
                assert_eq!(positions[0], to_cartesian(&GeodeticTuple::new(1.0, 2.0, None)));
                assert_eq!(positions[1], to_cartesian(&GeodeticTuple::new(3.0, 4.0, None)));
            }
            other => panic!("Expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_ring() {
        let node =
            placemark("<LinearRing><coordinates>0,0,5 1,0,5 1,1,5 0,0,5</coordinates></LinearRing>");
        match extract(GeometryKind::LinearRing, &node).unwrap() {
            Geometry::LinearRing(positions) => {
                assert_eq!(positions.len(), 4);
                assert_eq!(positions[0], positions[3]);
            }
            other => panic!("Expected LinearRing, got {:?}", other),
        }
    }

    #[test]
    fn test_open_ring_any_component() {
        for last in ["0.5,0,5", "0,0.5,5", "0,0,6", "0,0"] {
            let xml = format!(
                "<LinearRing><coordinates>0,0,5 1,0,5 1,1,5 {}</coordinates></LinearRing>",
                last
            );
            let node = placemark(&xml);
            assert!(
                matches!(extract(GeometryKind::LinearRing, &node), Err(Error::OpenRing)),
                "ring ending in {} should be open",
                last
            );
        }
    }

    #[test]
    fn test_polygon_rings_validated() {
        let closed = placemark(
            "<Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs>\
             <innerBoundaryIs><LinearRing><coordinates>0.2,0.2 0.4,0.2 0.2,0.2</coordinates></LinearRing></innerBoundaryIs></Polygon>",
        );
        match extract(GeometryKind::Polygon, &closed).unwrap() {
            Geometry::Polygon(positions) => assert_eq!(positions.len(), 7),
            other => panic!("Expected Polygon, got {:?}", other),
        }

        let open = placemark(
            "<Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1</coordinates></LinearRing></outerBoundaryIs></Polygon>",
        );
        assert!(matches!(extract(GeometryKind::Polygon, &open), Err(Error::OpenRing)));
    }
}

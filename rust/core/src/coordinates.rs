// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate Parser
//!
//! Reads KML `<coordinates>` text (`lon,lat[,alt]` tuples separated by
//! whitespace) and converts the tuples to Earth-centered Cartesian positions
//! on the WGS84 ellipsoid.

use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Cartesian position in meters (Earth-centered, Earth-fixed)
pub type Position = Vector3<f64>;

/// WGS84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared
const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Longitude/latitude in degrees, optional altitude in meters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GeodeticTuple {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: Option<f64>,
}

impl GeodeticTuple {
    pub fn new(longitude: f64, latitude: f64, altitude: Option<f64>) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }

    /// Altitude with the KML default of zero
    #[inline]
    pub fn height(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }
}

/// Result of parsing one `<coordinates>` block
///
/// A block holding exactly one tuple is reported as [`CoordinateBlock::Single`],
/// never as a one-element list.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateBlock {
    Single(GeodeticTuple),
    Many(Vec<GeodeticTuple>),
}

impl CoordinateBlock {
    /// Number of tuples in the block
    pub fn len(&self) -> usize {
        match self {
            CoordinateBlock::Single(_) => 1,
            CoordinateBlock::Many(tuples) => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten either shape into a list
    pub fn into_vec(self) -> Vec<GeodeticTuple> {
        match self {
            CoordinateBlock::Single(tuple) => vec![tuple],
            CoordinateBlock::Many(tuples) => tuples,
        }
    }
}

/// Parse a coordinate block
///
/// Each component is read with prefix-float semantics: leading numeric text is
/// accepted (`"10m"` reads as `10`), anything else is not a number. Longitude
/// and latitude are required for every tuple; an unreadable altitude is
/// treated as absent.
pub fn parse_coordinate_block(text: &str) -> Result<CoordinateBlock> {
    let mut tuples: Vec<GeodeticTuple> = text
        .split_whitespace()
        .map(parse_tuple)
        .collect::<Result<_>>()?;

    match tuples.len() {
        0 => Err(Error::malformed_coordinate(
            "longitude and latitude are required, found an empty coordinate block",
        )),
        1 => Ok(CoordinateBlock::Single(tuples.remove(0))),
        _ => Ok(CoordinateBlock::Many(tuples)),
    }
}

fn parse_tuple(token: &str) -> Result<GeodeticTuple> {
    let components: SmallVec<[Option<f64>; 3]> = token.split(',').map(parse_float).collect();

    let longitude = components.first().copied().flatten();
    let latitude = components.get(1).copied().flatten();
    let altitude = components.get(2).copied().flatten();

    match (longitude, latitude) {
        (Some(longitude), Some(latitude)) => Ok(GeodeticTuple::new(longitude, latitude, altitude)),
        _ => Err(Error::malformed_coordinate(format!(
            "longitude and latitude are required in tuple {:?}",
            token
        ))),
    }
}

/// Parse the leading float of a component, `None` if there is none
#[inline]
pub(crate) fn parse_float(component: &str) -> Option<f64> {
    let component = component.trim();
    match fast_float::parse_partial::<f64, _>(component) {
        Ok((value, consumed)) if consumed > 0 && value.is_finite() => Some(value),
        _ => None,
    }
}

/// Convert a geodetic tuple to a Cartesian position on the WGS84 ellipsoid
pub fn to_cartesian(tuple: &GeodeticTuple) -> Position {
    let lon = tuple.longitude.to_radians();
    let lat = tuple.latitude.to_radians();
    let height = tuple.height();

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    // Radius of curvature in the prime vertical
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    )
}

/// Convert a list of tuples, preserving order
pub fn to_cartesian_many(tuples: &[GeodeticTuple]) -> Vec<Position> {
    tuples.iter().map(to_cartesian).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_tuple_is_not_wrapped() {
        let block = parse_coordinate_block("10,20,30").unwrap();
        assert_eq!(
            block,
            CoordinateBlock::Single(GeodeticTuple::new(10.0, 20.0, Some(30.0)))
        );
    }

    #[test]
    fn test_multi_tuple_order_preserved() {
        let block = parse_coordinate_block("\n  1,2,3\t4,5  \n 6,7,8 \n").unwrap();
        let tuples = match block {
            CoordinateBlock::Many(tuples) => tuples,
            other => panic!("Expected many tuples, got {:?}", other),
        };
        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[0], GeodeticTuple::new(1.0, 2.0, Some(3.0)));
        assert_eq!(tuples[1], GeodeticTuple::new(4.0, 5.0, None));
        assert_eq!(tuples[2], GeodeticTuple::new(6.0, 7.0, Some(8.0)));
    }

    #[test]
    fn test_missing_latitude_fails() {
        assert!(matches!(
            parse_coordinate_block("10"),
            Err(Error::MalformedCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate_block("1,2 abc,4"),
            Err(Error::MalformedCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate_block("1,north"),
            Err(Error::MalformedCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate_block("   "),
            Err(Error::MalformedCoordinate(_))
        ));
    }

    #[test]
    fn test_non_numeric_altitude_is_absent() {
        let block = parse_coordinate_block("10,20,high").unwrap();
        assert_eq!(
            block,
            CoordinateBlock::Single(GeodeticTuple::new(10.0, 20.0, None))
        );
    }

    #[test]
    fn test_prefix_float_semantics() {
        let block = parse_coordinate_block("10.5deg,-20e1,3m").unwrap();
        assert_eq!(
            block,
            CoordinateBlock::Single(GeodeticTuple::new(10.5, -200.0, Some(3.0)))
        );
    }

    #[test]
    fn test_to_cartesian_equator() {
        let position = to_cartesian(&GeodeticTuple::new(0.0, 0.0, None));
        assert_relative_eq!(position.x, WGS84_A, epsilon = 1e-6);
        assert_relative_eq!(position.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(position.z, 0.0, epsilon = 1e-6);

        let east = to_cartesian(&GeodeticTuple::new(90.0, 0.0, Some(100.0)));
        assert_relative_eq!(east.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(east.y, WGS84_A + 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_to_cartesian_pole() {
        let pole = to_cartesian(&GeodeticTuple::new(0.0, 90.0, None));
        // Semi-minor axis
        assert_relative_eq!(pole.z, 6_356_752.314_245, epsilon = 1e-3);
        assert_relative_eq!(pole.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_to_cartesian_many_preserves_order() {
        let tuples = [
            GeodeticTuple::new(0.0, 0.0, None),
            GeodeticTuple::new(90.0, 0.0, None),
        ];
        let positions = to_cartesian_many(&tuples);
        assert_eq!(positions.len(), 2);
        assert!(positions[0].x > positions[1].x);
        assert!(positions[1].y > positions[0].y);
    }
}

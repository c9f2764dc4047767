//! Small geodesy helpers for route summaries and map framing.

use crate::model::Coordinate;
use serde::Serialize;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Length of a path following the points in order.
pub fn path_length_km(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Minimal box covering every point, or `None` for an empty slice.
    pub fn covering(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let init = Bounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(points[1..].iter().fold(init, |b, p| Bounds {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    #[cfg(test)]
    pub fn contains(&self, p: Coordinate) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lon)
    }
}

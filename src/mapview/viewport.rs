use super::MapView;
use crate::geo::Bounds;
use crate::model::Coordinate;

/// Shown until a position arrives.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 51.505,
    lon: -0.09,
};
pub const DEFAULT_ZOOM: f64 = 13.0;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Extra room left around fitted bounds.
const FIT_PADDING: f64 = 1.1;
const DEFAULT_ASPECT: f64 = 0.5;
const MIN_ASPECT: f64 = 0.1;
const MAX_ASPECT: f64 = 4.0;

/// A web-map style viewport: a center and a zoom level where the visible
/// longitude span is `360 / 2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center: Coordinate,
    zoom: f64,
    /// Visible latitude span per degree of visible longitude span.
    aspect: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER, DEFAULT_ZOOM)
    }
}

impl Viewport {
    pub fn new(center: Coordinate, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            aspect: DEFAULT_ASPECT,
        }
    }

    /// Match the shape of the drawing area. Keeps center and zoom.
    pub fn set_aspect(&mut self, aspect: f64) {
        if aspect.is_finite() {
            self.aspect = aspect.clamp(MIN_ASPECT, MAX_ASPECT);
        }
    }

    pub fn lon_span(&self) -> f64 {
        360.0 / 2f64.powf(self.zoom)
    }

    pub fn lat_span(&self) -> f64 {
        self.lon_span() * self.aspect
    }

    pub fn bounds(&self) -> Bounds {
        let half_lon = self.lon_span() / 2.0;
        let half_lat = self.lat_span() / 2.0;
        Bounds {
            south: self.center.lat - half_lat,
            west: self.center.lon - half_lon,
            north: self.center.lat + half_lat,
            east: self.center.lon + half_lon,
        }
    }

    /// Move by a fraction of the visible span. Positive `dx` goes east,
    /// positive `dy` goes north.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let lat = (self.center.lat + dy * self.lat_span()).clamp(-90.0, 90.0);
        let mut lon = self.center.lon + dx * self.lon_span();
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        self.center = Coordinate { lat, lon };
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

impl MapView for Viewport {
    fn center(&self) -> Coordinate {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_view(&mut self, center: Coordinate, zoom: f64) {
        self.center = center;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        // Largest whole zoom whose span still covers the padded box on both axes.
        let fit_lon = (360.0 / (bounds.lon_span() * FIT_PADDING)).log2();
        let fit_lat = (360.0 * self.aspect / (bounds.lat_span() * FIT_PADDING)).log2();
        let zoom = fit_lon.min(fit_lat).floor();
        self.center = bounds.center();
        self.zoom = if zoom.is_nan() {
            MAX_ZOOM
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
    }
}

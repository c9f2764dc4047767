use crate::error::{LocationError, SessionError};
use crate::orchestrator::{SessionState, Transition};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Shortest distance the controls allow, in kilometres.
pub const MIN_UI_DISTANCE_KM: f64 = 1.0;
/// Longest distance the controls allow, in kilometres.
pub const MAX_UI_DISTANCE_KM: f64 = 20.0;
pub const DEFAULT_DISTANCE_KM: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub base_url: String,
    pub distance_km: f64,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
    pub locator: LocatorConfig,
}

/// Where the one-shot position comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocatorConfig {
    Fixed { lat: f64, lon: f64 },
    IpLookup { url: String },
    Disabled,
}

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        (lat_ok && lon_ok).then_some(Self { lat, lon })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Clamp a user-entered distance to the range the controls offer, snapped to 0.1 km.
pub fn clamp_ui_distance(km: f64) -> f64 {
    let snapped = (km * 10.0).round() / 10.0;
    snapped.clamp(MIN_UI_DISTANCE_KM, MAX_UI_DISTANCE_KM)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub distance_km: f64,
}

impl RouteRequest {
    pub fn new(origin: Coordinate, distance_km: f64) -> Result<Self, SessionError> {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return Err(SessionError::InvalidDistance(distance_km));
        }
        Ok(Self {
            origin,
            distance_km,
        })
    }
}

/// Ordered path, start to end. Replaced wholesale, never edited in place, so
/// clones share one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGeometry(Arc<[Coordinate]>);

impl RouteGeometry {
    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A path needs at least two points to be drawn or framed.
    pub fn is_drawable(&self) -> bool {
        self.0.len() >= 2
    }
}

impl From<Vec<Coordinate>> for RouteGeometry {
    fn from(points: Vec<Coordinate>) -> Self {
        Self(points.into())
    }
}

impl Serialize for RouteGeometry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Decoded success body of the generate endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub geometry: RouteGeometry,
    pub reported_distance_km: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        transition: Transition,
        // Boxed to keep the event small; states carry several fields.
        before: Box<SessionState>,
        after: Box<SessionState>,
    },
    Notice(Notice),
    GpxReady {
        bytes: Bytes,
    },
}

/// User-facing messages emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Location(LocationError),
    Failed(SessionError),
    RouteReady { points: usize },
    CacheReset { message: String },
    CacheResetFailed,
    ExportFailed(SessionError),
}

impl Notice {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            Notice::Location(LocationError::Unsupported) => {
                "Geolocation not supported; pass --lat/--lon".to_string()
            }
            Notice::Location(e) => format!("Unable to retrieve your location: {e}"),
            Notice::Failed(e) => e.to_string(),
            Notice::RouteReady { points } => format!("Route ready ({points} points)"),
            Notice::CacheReset { message } => format!("Cache reset: {message}"),
            Notice::CacheResetFailed => "Failed to reset cache. Check backend logs.".to_string(),
            Notice::ExportFailed(e) => format!("Failed to download GPX: {e}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::Location(_) | Notice::Failed(_) | Notice::CacheResetFailed | Notice::ExportFailed(_)
        )
    }
}

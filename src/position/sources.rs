use super::PositionSource;
use crate::error::LocationError;
use crate::model::{Coordinate, LocatorConfig, SessionConfig};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::debug;

/// Location sources available to a terminal client.
#[derive(Debug, Clone)]
pub(crate) enum Locator {
    /// Coordinates supplied by the user; validated on lookup.
    Fixed { lat: f64, lon: f64 },
    /// One GET against a geolocation endpoint answering with latitude/longitude.
    IpLookup { http: reqwest::Client, url: String },
}

impl Locator {
    /// Build the configured source, or `None` when locating is disabled.
    pub fn from_config(cfg: &SessionConfig) -> Result<Option<Self>> {
        match &cfg.locator {
            LocatorConfig::Disabled => Ok(None),
            LocatorConfig::Fixed { lat, lon } => Ok(Some(Locator::Fixed {
                lat: *lat,
                lon: *lon,
            })),
            LocatorConfig::IpLookup { url } => {
                let http = reqwest::Client::builder()
                    .user_agent(cfg.user_agent.clone())
                    .timeout(cfg.request_timeout)
                    .build()
                    .context("build geolocation HTTP client")?;
                Ok(Some(Locator::IpLookup {
                    http,
                    url: url.clone(),
                }))
            }
        }
    }
}

impl PositionSource for Locator {
    async fn locate(&self) -> Result<Coordinate, LocationError> {
        match self {
            Locator::Fixed { lat, lon } => {
                Coordinate::new(*lat, *lon).ok_or(LocationError::Unavailable)
            }
            Locator::IpLookup { http, url } => {
                let resp = http.get(url).send().await.map_err(|e| {
                    debug!(%url, error = %e, "geolocation request failed");
                    LocationError::Unavailable
                })?;
                match resp.status() {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        return Err(LocationError::Denied)
                    }
                    s if !s.is_success() => return Err(LocationError::Unavailable),
                    _ => {}
                }
                let meta: serde_json::Value =
                    resp.json().await.map_err(|_| LocationError::Unavailable)?;
                coordinate_from_meta(&meta).ok_or(LocationError::Unavailable)
            }
        }
    }
}

/// Pull a coordinate out of a geolocation answer. Accepts `latitude`/`longitude`
/// or `lat`/`lon`, as numbers or numeric strings.
pub(crate) fn coordinate_from_meta(meta: &serde_json::Value) -> Option<Coordinate> {
    let field = |names: &[&str]| {
        names.iter().find_map(|n| match meta.get(*n)? {
            serde_json::Value::Number(x) => x.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    };
    let lat = field(&["latitude", "lat"])?;
    let lon = field(&["longitude", "lon", "lng"])?;
    Coordinate::new(lat, lon)
}

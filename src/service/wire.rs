use crate::error::SessionError;
use crate::model::{Coordinate, RouteGeometry, RouteRequest, RouteResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RouteRequestBody {
    lat: f64,
    lon: f64,
    distance_km: f64,
}

impl From<&RouteRequest> for RouteRequestBody {
    fn from(r: &RouteRequest) -> Self {
        Self {
            lat: r.origin.lat,
            lon: r.origin.lon,
            distance_km: r.distance_km,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteBody {
    coordinates: Vec<WirePoint>,
    #[serde(default)]
    actual_distance_km: Option<f64>,
    #[serde(default)]
    distance_meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ResetBody {
    message: String,
}

pub(super) fn decode_route(body: &[u8]) -> Result<RouteResponse, SessionError> {
    let parsed: RouteBody =
        serde_json::from_slice(body).map_err(|e| SessionError::Decode(e.to_string()))?;

    let points = parsed
        .coordinates
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Coordinate::new(p.lat, p.lng).ok_or_else(|| {
                SessionError::Decode(format!("coordinate {i} out of range: {}, {}", p.lat, p.lng))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let reported_distance_km = parsed
        .actual_distance_km
        .or(parsed.distance_meters.map(|m| m / 1000.0));

    Ok(RouteResponse {
        geometry: RouteGeometry::from(points),
        reported_distance_km,
    })
}

pub(super) fn decode_reset(body: &[u8]) -> Result<String, SessionError> {
    serde_json::from_slice::<ResetBody>(body)
        .map(|b| b.message)
        .map_err(|e| SessionError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_service_field_names() {
        let origin = Coordinate::new(51.5, -0.09).unwrap();
        let req = RouteRequest::new(origin, 5.0).unwrap();
        let json = serde_json::to_value(RouteRequestBody::from(&req)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "lat": 51.5, "lon": -0.09, "distanceKm": 5.0 })
        );
    }

    #[test]
    fn decodes_route_with_reported_distance() {
        let body = br#"{"coordinates":[{"lat":51.50,"lng":-0.09},{"lat":51.51,"lng":-0.08}],
                        "distanceMeters":5012.0,"actualDistanceKm":5.012,"success":true}"#;
        let r = decode_route(body).unwrap();
        assert_eq!(r.geometry.len(), 2);
        assert_eq!(r.geometry.points()[1], Coordinate::new(51.51, -0.08).unwrap());
        assert_eq!(r.reported_distance_km, Some(5.012));
    }

    #[test]
    fn falls_back_to_meters() {
        let body = br#"{"coordinates":[],"distanceMeters":2500.0}"#;
        let r = decode_route(body).unwrap();
        assert!(r.geometry.is_empty());
        assert_eq!(r.reported_distance_km, Some(2.5));
    }

    #[test]
    fn missing_coordinates_is_decode_error() {
        let err = decode_route(br#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }

    #[test]
    fn wrong_types_are_decode_errors() {
        let err = decode_route(br#"{"coordinates":[{"lat":"north","lng":1}]}"#).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
        let err = decode_route(br#"{"coordinates":{"lat":1,"lng":1}}"#).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }

    #[test]
    fn out_of_range_point_is_decode_error() {
        let err = decode_route(br#"{"coordinates":[{"lat":95.0,"lng":0.0}]}"#).unwrap_err();
        assert!(matches!(err, SessionError::Decode(msg) if msg.contains("out of range")));
    }

    #[test]
    fn reset_requires_message() {
        assert_eq!(
            decode_reset(br#"{"message":"Route cache has been reset","success":true}"#).unwrap(),
            "Route cache has been reset"
        );
        assert!(decode_reset(b"{}").is_err());
    }
}

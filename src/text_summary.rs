//! Route summary for headless output.
//!
//! `--json` prints the summary as JSON, `--text` prints [`RouteSummary::lines`].

use crate::geo::{self, Bounds};
use crate::model::{Coordinate, RouteGeometry};
use crate::orchestrator::SessionState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RouteSummary {
    pub position: Option<Coordinate>,
    pub requested_distance_km: f64,
    pub reported_distance_km: Option<f64>,
    pub points: usize,
    /// Length along the polyline, great-circle per leg.
    pub path_length_km: f64,
    pub bounds: Option<Bounds>,
    pub stale: bool,
    pub route: RouteGeometry,
}

impl RouteSummary {
    pub fn from_state(state: &SessionState) -> Self {
        let points = state.route.points();
        Self {
            position: state.position,
            requested_distance_km: state.distance_km,
            reported_distance_km: state.reported_distance_km,
            points: points.len(),
            path_length_km: geo::path_length_km(points),
            bounds: Bounds::covering(points),
            stale: state.route_stale,
            route: state.route.clone(),
        }
    }

    /// Pre-formatted lines for text mode.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        match self.position {
            Some(p) => lines.push(format!("Position: {p}")),
            None => lines.push("Position: -".to_string()),
        }

        let reported = self
            .reported_distance_km
            .map(|km| format!("{km:.2} km"))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "Distance: requested {:.1} km, reported {reported}",
            self.requested_distance_km
        ));

        if self.points == 0 {
            lines.push("Route: no points".to_string());
            return lines;
        }
        lines.push(format!(
            "Route: {} points, {:.2} km along path",
            self.points, self.path_length_km
        ));

        if let Some(b) = self.bounds {
            lines.push(format!(
                "Bounds: S {:.5} W {:.5} N {:.5} E {:.5}",
                b.south, b.west, b.north, b.east
            ));
        }
        if self.stale {
            lines.push("Note: service cache was reset after this route was generated".to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn state() -> SessionState {
        let mut s = SessionState::new(5.0);
        s.position = Some(c(51.5, -0.09));
        s
    }

    #[test]
    fn empty_route_summary() {
        let summary = RouteSummary::from_state(&state());
        assert_eq!(summary.points, 0);
        assert!(summary.bounds.is_none());
        assert_eq!(summary.path_length_km, 0.0);
        let lines = summary.lines();
        assert_eq!(lines[0], "Position: 51.50000, -0.09000");
        assert_eq!(lines[1], "Distance: requested 5.0 km, reported -");
        assert_eq!(lines[2], "Route: no points");
    }

    #[test]
    fn summary_covers_route() {
        let mut s = state();
        s.route = RouteGeometry::from(vec![c(51.50, -0.09), c(51.51, -0.08), c(51.50, -0.09)]);
        s.reported_distance_km = Some(2.6);

        let summary = RouteSummary::from_state(&s);
        assert_eq!(summary.points, 3);
        assert!(summary.path_length_km > 2.0 && summary.path_length_km < 3.0);
        let b = summary.bounds.unwrap();
        assert_eq!((b.south, b.north), (51.50, 51.51));

        let lines = summary.lines();
        assert_eq!(lines[1], "Distance: requested 5.0 km, reported 2.60 km");
        assert!(lines[2].starts_with("Route: 3 points, "));
        assert!(lines[3].starts_with("Bounds: S 51.50000"));
    }

    #[test]
    fn json_carries_route_points() {
        let mut s = state();
        s.route = RouteGeometry::from(vec![c(51.50, -0.09), c(51.51, -0.08)]);
        let json = serde_json::to_value(RouteSummary::from_state(&s)).unwrap();
        assert_eq!(json["points"], 2);
        assert_eq!(json["route"][1]["lat"], 51.51);
        assert_eq!(json["reported_distance_km"], serde_json::Value::Null);
    }
}

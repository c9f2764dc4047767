//! Keeps a map viewport in step with the route session.
//!
//! The synchronizer is driven by explicit [`Transition`]s rather than by
//! diffing state: a position fix recenters the view once, a replaced route
//! fits the view to the route. Nothing else moves the camera, so the user's
//! own panning and zooming survive every other update.

mod viewport;

pub(crate) use viewport::Viewport;

use crate::geo::Bounds;
use crate::model::{Coordinate, RouteGeometry};
use crate::orchestrator::{SessionState, Transition};

/// What the synchronizer needs from a map widget.
pub(crate) trait MapView {
    fn center(&self) -> Coordinate;
    fn zoom(&self) -> f64;
    fn set_view(&mut self, center: Coordinate, zoom: f64);
    fn fit_bounds(&mut self, bounds: &Bounds);
}

/// Everything a map renders for one session snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MapLayers<'a> {
    pub marker: Option<Coordinate>,
    /// Present only when the route has at least two points.
    pub polyline: Option<&'a [Coordinate]>,
    pub stale: bool,
}

pub(crate) struct MapViewSynchronizer<V> {
    view: V,
}

impl<V: MapView> MapViewSynchronizer<V> {
    pub fn new(view: V) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// For user-driven pan and zoom.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn on_transition(&mut self, transition: Transition, _before: &SessionState, after: &SessionState) {
        match transition {
            Transition::PositionAcquired => self.recenter(after.position),
            Transition::RouteReplaced => self.fit_route(&after.route),
            Transition::GenerateStarted
            | Transition::GenerateSettled
            | Transition::RouteInvalidated => {}
        }
    }

    /// Center on `position` at the current zoom. No-op without a position.
    pub fn recenter(&mut self, position: Option<Coordinate>) {
        if let Some(p) = position {
            let zoom = self.view.zoom();
            self.view.set_view(p, zoom);
        }
    }

    /// Fit the view to the route. Routes with fewer than two points leave the
    /// view where it is.
    pub fn fit_route(&mut self, route: &RouteGeometry) {
        if !route.is_drawable() {
            return;
        }
        if let Some(bounds) = Bounds::covering(route.points()) {
            self.view.fit_bounds(&bounds);
        }
    }

    pub fn layers<'a>(&self, state: &'a SessionState) -> MapLayers<'a> {
        MapLayers {
            marker: state.position,
            polyline: state.route.is_drawable().then(|| state.route.points()),
            stale: state.route_stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn state_with(position: Option<Coordinate>, route: Vec<Coordinate>) -> SessionState {
        let mut s = SessionState::new(5.0);
        s.position = position;
        s.route = RouteGeometry::from(route);
        s
    }

    fn sync() -> MapViewSynchronizer<Viewport> {
        MapViewSynchronizer::new(Viewport::default())
    }

    #[test]
    fn recenter_keeps_zoom_and_is_idempotent() {
        let mut m = sync();
        m.view_mut().zoom_by(-3.0);
        m.recenter(Some(c(48.85, 2.35)));
        let once = *m.view();
        m.recenter(Some(c(48.85, 2.35)));
        assert_eq!(*m.view(), once);
        assert_eq!(m.view().center(), c(48.85, 2.35));
        assert_eq!(m.view().zoom(), 10.0);
    }

    #[test]
    fn recenter_without_position_is_noop() {
        let mut m = sync();
        let before = *m.view();
        m.recenter(None);
        assert_eq!(*m.view(), before);
    }

    #[test]
    fn short_routes_do_not_move_the_view() {
        let mut m = sync();
        let before = *m.view();
        m.fit_route(&RouteGeometry::default());
        m.fit_route(&RouteGeometry::from(vec![c(40.0, 40.0)]));
        assert_eq!(*m.view(), before);
    }

    #[test]
    fn fitted_view_contains_route_and_refit_is_stable() {
        let route = RouteGeometry::from(vec![c(51.50, -0.10), c(51.52, -0.07), c(51.49, -0.05)]);
        let mut m = sync();
        m.fit_route(&route);
        for p in route.points() {
            assert!(m.view().bounds().contains(*p));
        }
        let once = *m.view();
        m.fit_route(&route);
        assert_eq!(*m.view(), once);
    }

    #[test]
    fn route_change_does_not_recenter_on_position() {
        let here = c(51.5, -0.09);
        let before = state_with(Some(here), vec![]);
        let after = state_with(Some(here), vec![c(51.60, 0.10), c(51.62, 0.12)]);

        let mut m = sync();
        m.on_transition(Transition::RouteReplaced, &before, &after);
        assert_ne!(m.view().center(), here);
        assert!(m.view().bounds().contains(c(51.60, 0.10)));
    }

    #[test]
    fn user_pan_survives_non_camera_transitions() {
        let here = c(51.5, -0.09);
        let s = state_with(Some(here), vec![c(51.5, -0.09), c(51.51, -0.08)]);
        let mut m = sync();
        m.on_transition(Transition::PositionAcquired, &SessionState::new(5.0), &s);
        m.view_mut().pan(0.5, 0.0);
        let panned = *m.view();
        for t in [
            Transition::GenerateStarted,
            Transition::GenerateSettled,
            Transition::RouteInvalidated,
        ] {
            m.on_transition(t, &s, &s);
        }
        assert_eq!(*m.view(), panned);
    }

    #[test]
    fn layers_hide_single_point_polyline() {
        let m = sync();
        let one = state_with(Some(c(1.0, 1.0)), vec![c(1.0, 1.0)]);
        let layers = m.layers(&one);
        assert_eq!(layers.marker, Some(c(1.0, 1.0)));
        assert!(layers.polyline.is_none());

        let mut two = state_with(None, vec![c(1.0, 1.0), c(1.1, 1.1)]);
        two.route_stale = true;
        let layers = m.layers(&two);
        assert!(layers.marker.is_none());
        assert_eq!(layers.polyline.map(<[Coordinate]>::len), Some(2));
        assert!(layers.stale);
    }
}

//! Session state and its transition functions.
//!
//! `SessionState` is only mutated through the functions here, and only the
//! controller calls them. Every call corresponds to one [`Transition`] that is
//! reported to observers with the state before and after.

use crate::error::{Precondition, SessionError};
use crate::model::{Coordinate, RouteGeometry, RouteRequest, RouteResponse};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Loading {
    #[default]
    Idle,
    Requesting,
}

/// Named state changes, in the order they can occur for one generate call:
/// `GenerateStarted`, then `RouteReplaced` on success, then `GenerateSettled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    PositionAcquired,
    GenerateStarted,
    RouteReplaced,
    GenerateSettled,
    RouteInvalidated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub position: Option<Coordinate>,
    pub distance_km: f64,
    pub route: RouteGeometry,
    /// Set when the service acknowledged a cache reset after this route was made.
    pub route_stale: bool,
    pub loading: Loading,
    pub reported_distance_km: Option<f64>,
    pub generations: u64,
    /// Acknowledged cache resets so far.
    pub cache_resets: u64,
    /// `cache_resets` when the in-flight generate was sent.
    #[serde(skip)]
    generate_sent_at_reset: u64,
}

impl SessionState {
    pub fn new(distance_km: f64) -> Self {
        Self {
            position: None,
            distance_km,
            route: RouteGeometry::default(),
            route_stale: false,
            loading: Loading::Idle,
            reported_distance_km: None,
            generations: 0,
            cache_resets: 0,
            generate_sent_at_reset: 0,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.position.is_some() && self.loading == Loading::Idle
    }

    /// Build a request from the current position, without checking `loading`.
    pub fn request_for(&self, distance_km: f64) -> Result<RouteRequest, SessionError> {
        let origin = self
            .position
            .ok_or(Precondition::NoPosition)?;
        RouteRequest::new(origin, distance_km)
    }

    /// Everything `generate` needs before it may start. Does not mutate.
    pub(super) fn check_generate(&self, distance_km: f64) -> Result<RouteRequest, SessionError> {
        if self.position.is_none() {
            return Err(Precondition::NoPosition.into());
        }
        if self.loading == Loading::Requesting {
            return Err(Precondition::RequestInFlight.into());
        }
        self.request_for(distance_km)
    }

    /// Record the position. It is set at most once and never cleared.
    pub(super) fn set_position(&mut self, position: Coordinate) -> bool {
        if self.position.is_some() {
            return false;
        }
        self.position = Some(position);
        true
    }

    pub(super) fn start_generate(&mut self, request: &RouteRequest) {
        self.loading = Loading::Requesting;
        self.distance_km = request.distance_km;
        self.generate_sent_at_reset = self.cache_resets;
    }

    pub(super) fn replace_route(&mut self, response: RouteResponse) {
        self.route = response.geometry;
        self.reported_distance_km = response.reported_distance_km;
        // A reset acknowledged while the request was out may not have reached it.
        self.route_stale = self.cache_resets != self.generate_sent_at_reset;
        self.generations += 1;
    }

    pub(super) fn settle(&mut self) {
        self.loading = Loading::Idle;
    }

    pub(super) fn mark_stale(&mut self) {
        self.cache_resets += 1;
        self.route_stale = true;
    }
}

//! Boundary to the remote route-generation service.

mod http;
mod wire;

pub(crate) use http::HttpRouteService;

use crate::error::SessionError;
use crate::model::{RouteRequest, RouteResponse};
use bytes::Bytes;
use std::future::Future;

/// Operations the session needs from the route service.
///
/// The controller only depends on this trait, so tests can substitute an
/// in-memory service and the HTTP client stays a thin adapter.
pub(crate) trait RouteService {
    /// Generate a route around `request.origin` of roughly `request.distance_km`.
    fn generate(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<RouteResponse, SessionError>>;

    /// Invalidate the service's route cache. Resolves with its acknowledgment message.
    fn reset_cache(&self) -> impl Future<Output = Result<String, SessionError>>;

    /// Fetch the route for `request` encoded as GPX.
    fn export_gpx(&self, request: &RouteRequest)
        -> impl Future<Output = Result<Bytes, SessionError>>;
}

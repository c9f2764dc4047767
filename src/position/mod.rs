//! One-shot position acquisition.
//!
//! A [`PositionProvider`] is consumed by [`PositionProvider::acquire`], so a
//! session can only ever ask for its position once. There is no tracking and
//! no retry.

mod sources;

pub(crate) use sources::Locator;

use crate::error::LocationError;
use crate::model::Coordinate;
use std::future::Future;
use tracing::{info, warn};

/// A platform facility that can report where the user is.
pub(crate) trait PositionSource {
    fn locate(&self) -> impl Future<Output = Result<Coordinate, LocationError>>;
}

pub(crate) struct PositionProvider<P> {
    source: Option<P>,
}

impl<P: PositionSource> PositionProvider<P> {
    pub fn new(source: Option<P>) -> Self {
        Self { source }
    }

    /// Ask the source once. Without a source this fails immediately with
    /// [`LocationError::Unsupported`].
    pub async fn acquire(self) -> Result<Coordinate, LocationError> {
        let Some(source) = self.source else {
            warn!("no location source configured");
            return Err(LocationError::Unsupported);
        };
        match source.locate().await {
            Ok(c) => {
                info!(lat = c.lat, lon = c.lon, "position acquired");
                Ok(c)
            }
            Err(e) => {
                warn!(error = %e, "position lookup failed");
                Err(e)
            }
        }
    }
}

//! Route session controller.
//!
//! Owns the session state, runs the three user operations against the route
//! service and reports every transition to an observer.

use super::state::{Loading, SessionState, Transition};
use crate::error::{LocationError, SessionError};
use crate::model::{Coordinate, Notice, RouteGeometry, SessionEvent};
use crate::position::{PositionProvider, PositionSource};
use crate::service::RouteService;
use anyhow::Result;
use bytes::Bytes;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::cell::RefCell;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Receives every state transition and every user-facing notice.
pub(crate) trait SessionObserver {
    fn on_transition(&self, transition: Transition, before: &SessionState, after: &SessionState);
    fn on_notice(&self, notice: &Notice);
}

/// Forwards to a presentation layer running elsewhere.
impl SessionObserver for UnboundedSender<SessionEvent> {
    fn on_transition(&self, transition: Transition, before: &SessionState, after: &SessionState) {
        let _ = self.send(SessionEvent::StateChanged {
            transition,
            before: Box::new(before.clone()),
            after: Box::new(after.clone()),
        });
    }

    fn on_notice(&self, notice: &Notice) {
        let _ = self.send(SessionEvent::Notice(notice.clone()));
    }
}

/// Headless observer: notices go to the log only.
pub(crate) struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_transition(&self, transition: Transition, _before: &SessionState, after: &SessionState) {
        debug!(?transition, loading = ?after.loading, points = after.route.len(), "session transition");
    }

    fn on_notice(&self, notice: &Notice) {
        if notice.is_error() {
            warn!("{}", notice.to_message());
        } else {
            info!("{}", notice.to_message());
        }
    }
}

pub(crate) struct RouteSessionController<S, O> {
    service: S,
    observer: O,
    // Driven from a single task; borrows never span an await.
    state: RefCell<SessionState>,
}

impl<S, O: SessionObserver> RouteSessionController<S, O> {
    pub fn new(service: S, observer: O, distance_km: f64) -> Self {
        Self {
            service,
            observer,
            state: RefCell::new(SessionState::new(distance_km)),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The single write path: mutate, then report before/after.
    fn apply<R>(&self, transition: Transition, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (before, after, out) = {
            let mut state = self.state.borrow_mut();
            let before = state.clone();
            let out = f(&mut state);
            (before, state.clone(), out)
        };
        self.observer.on_transition(transition, &before, &after);
        out
    }

    fn notify(&self, notice: Notice) {
        self.observer.on_notice(&notice);
    }
}

/// Returns `loading` to idle when dropped, so a generate that errors, panics
/// or is abandoned mid-flight still settles.
struct LoadingRelease<'a, S, O: SessionObserver> {
    controller: &'a RouteSessionController<S, O>,
}

impl<S, O: SessionObserver> Drop for LoadingRelease<'_, S, O> {
    fn drop(&mut self) {
        self.controller
            .apply(Transition::GenerateSettled, SessionState::settle);
    }
}

impl<S: RouteService, O: SessionObserver> RouteSessionController<S, O> {
    /// Run the one-shot position lookup and record its outcome.
    pub async fn acquire_position<P: PositionSource>(
        &self,
        provider: PositionProvider<P>,
    ) -> Result<Coordinate, LocationError> {
        match provider.acquire().await {
            Ok(position) => {
                self.apply(Transition::PositionAcquired, |s| s.set_position(position));
                Ok(position)
            }
            Err(e) => {
                self.notify(Notice::Location(e));
                Err(e)
            }
        }
    }

    /// Request a new route around the current position.
    ///
    /// Fails without touching the network when there is no position or a
    /// generate is already in flight. On success the route is replaced
    /// wholesale; on failure it is left as it was.
    pub async fn generate_route(&self, distance_km: f64) -> Result<RouteGeometry, SessionError> {
        let checked = self.state.borrow().check_generate(distance_km);
        let request = match checked {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "generate rejected");
                self.notify(Notice::Failed(e.clone()));
                return Err(e);
            }
        };

        self.apply(Transition::GenerateStarted, |s| s.start_generate(&request));
        let _release = LoadingRelease { controller: self };

        info!(distance_km, lat = request.origin.lat, lon = request.origin.lon, "generating route");
        match self.service.generate(&request).await {
            Ok(response) => {
                let geometry = response.geometry.clone();
                self.apply(Transition::RouteReplaced, |s| s.replace_route(response));
                info!(points = geometry.len(), "route replaced");
                self.notify(Notice::RouteReady {
                    points: geometry.len(),
                });
                Ok(geometry)
            }
            Err(e) => {
                warn!(error = %e, "route generation failed");
                self.notify(Notice::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Ask the service to drop its cached routes. Not guarded by `loading`.
    pub async fn reset_cache(&self) -> Result<String, SessionError> {
        match self.service.reset_cache().await {
            Ok(message) => {
                info!(%message, "cache reset");
                self.apply(Transition::RouteInvalidated, SessionState::mark_stale);
                self.notify(Notice::CacheReset {
                    message: message.clone(),
                });
                Ok(message)
            }
            Err(e) => {
                error!(error = %e, "error resetting cache");
                self.notify(Notice::CacheResetFailed);
                Err(e)
            }
        }
    }

    /// Fetch the route as GPX. The caller owns saving the bytes.
    pub async fn export_gpx(&self, distance_km: f64) -> Result<Bytes, SessionError> {
        let checked = self.state.borrow().request_for(distance_km);
        let request = match checked {
            Ok(r) => r,
            Err(e) => {
                self.notify(Notice::Failed(e.clone()));
                return Err(e);
            }
        };

        match self.service.export_gpx(&request).await {
            Ok(bytes) => {
                info!(bytes = bytes.len(), "gpx downloaded");
                Ok(bytes)
            }
            Err(e) => {
                error!(error = %e, "gpx download failed");
                self.notify(Notice::ExportFailed(e.clone()));
                Err(e)
            }
        }
    }
}

/// Commands emitted by UI layers to drive the session.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    Generate(f64),
    ResetCache,
    ExportGpx(f64),
    Quit,
}

enum Completion {
    Settled,
    Export(Result<Bytes, SessionError>),
}

/// Drive the controller from UI commands until quit.
///
/// Position lookup and every requested operation are polled together on this
/// task. Export bytes are forwarded as [`SessionEvent::GpxReady`].
pub(crate) async fn run_controller<S: RouteService, P: PositionSource>(
    controller: &RouteSessionController<S, UnboundedSender<SessionEvent>>,
    provider: PositionProvider<P>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut inflight: FuturesUnordered<LocalBoxFuture<'_, Completion>> = FuturesUnordered::new();
    inflight.push(
        controller
            .acquire_position(provider)
            .map(|_| Completion::Settled)
            .boxed_local(),
    );

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Generate(km)) => {
                        // Rejected immediately by the loading guard when one is already running.
                        inflight.push(controller.generate_route(km).map(|_| Completion::Settled).boxed_local());
                    }
                    Some(UiCommand::ResetCache) => {
                        inflight.push(controller.reset_cache().map(|_| Completion::Settled).boxed_local());
                    }
                    Some(UiCommand::ExportGpx(km)) => {
                        inflight.push(controller.export_gpx(km).map(Completion::Export).boxed_local());
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(done) = inflight.next(), if !inflight.is_empty() => {
                if let Completion::Export(Ok(bytes)) = done {
                    let _ = controller.observer().send(SessionEvent::GpxReady { bytes });
                }
            }
        }
    }

    if !inflight.is_empty() {
        debug!(pending = inflight.len(), "dropping in-flight operations on quit");
    }
    drop(inflight);
    debug_assert_eq!(controller.snapshot().loading, Loading::Idle);
    Ok(())
}

//! Route session orchestration.
//!
//! This module owns the session state and the controller that mutates it. UI and
//! CLI layers send commands in and observe transitions out; they never write the
//! state themselves.

mod controller;
mod state;

pub(crate) use controller::{run_controller, LogObserver, RouteSessionController, UiCommand};
pub(crate) use state::{Loading, SessionState, Transition};

//! # Navigator
//!
//! Turn-by-turn route progress for an active trip leg, independent of which
//! trip kind is being navigated: a route-progress state machine, deviation
//! detection with scheduled recalculation, and a voice-instruction queue.

mod config;
mod navigator;
mod route;
mod voice;

pub use crate::config::NavConfig;
pub use crate::navigator::{NavPhase, NavigationState, Navigator};
pub use crate::route::{RouteProjection, project};
pub use crate::voice::VoiceInstruction;

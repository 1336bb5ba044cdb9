//! # Realtime Core
//!
//! Core modules for the Realtime tracking platform.

mod error;
mod geo;
mod provider;
mod route;

pub use crate::error::*;
pub use crate::geo::*;
pub use crate::provider::*;
pub use crate::route::*;

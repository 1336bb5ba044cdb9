//! # Sampler
//!
//! Owns the device location source: adapts the sampling interval to battery,
//! network, and speed, buffers readings across connectivity loss, and
//! republishes a normalized position stream with rolling statistics.
//!
//! The sampler has no knowledge of trips or orders.

mod buffer;
mod config;
mod interval;
mod model;
mod sampler;

pub use crate::buffer::OfflineBuffer;
pub use crate::config::SamplerConfig;
pub use crate::model::*;
pub use crate::sampler::{Disposer, Sampler, Subscriber};

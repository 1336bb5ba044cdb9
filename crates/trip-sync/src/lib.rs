//! # Trip Sync
//!
//! Maintains one consistent, up-to-date [`TrackingData`] per watched trip,
//! normalizing the three backend record kinds (delivery, taxi, marketplace
//! order) into a single tracking model and reconciling it against the
//! record store's change feeds.

mod config;
mod model;
pub mod normalize;
mod records;
mod watcher;

pub use crate::config::SyncConfig;
pub use crate::model::*;
pub use crate::normalize::ProgressTables;
pub use crate::records::*;
pub use crate::watcher::{TripWatch, TripWatcher, WatchOptions};

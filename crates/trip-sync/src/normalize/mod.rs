//! Per-kind normalization of backend records into [`TrackingData`].
//!
//! Each kind owns its status→progress table and field mapping; nothing here
//! is shared through inheritance, so each mapping stays independently
//! testable. Progress is a pure function of `(kind, status)`; geography
//! never feeds into it.

pub mod delivery;
pub mod market;
pub mod taxi;

use std::collections::HashMap;

use anyhow::{Result as AnyResult, bail};
use serde_json::Value;
use tracing::warn;

use crate::model::{TrackingData, TripKind};

/// Fallback for a status string the table does not know. Strictly inside
/// (0, 100) so the cancellation and completion invariants keep holding.
const UNKNOWN_PROGRESS: u8 = 10;

/// The status→progress lookup tables, one per kind.
///
/// These are configuration data: integrators may replace any table wholesale
/// as long as [`ProgressTables::validate`] still passes.
#[derive(Debug, Clone)]
pub struct ProgressTables {
    tables: HashMap<TripKind, HashMap<String, u8>>,
}

impl Default for ProgressTables {
    fn default() -> Self {
        let mut tables = HashMap::new();
        tables.insert(TripKind::Delivery, to_map(delivery::DEFAULT_PROGRESS));
        tables.insert(TripKind::Taxi, to_map(taxi::DEFAULT_PROGRESS));
        tables.insert(TripKind::Marketplace, to_map(market::DEFAULT_PROGRESS));
        Self { tables }
    }
}

impl ProgressTables {
    /// Replaces the table for one kind.
    #[must_use]
    pub fn with_table(mut self, kind: TripKind, entries: &[(&str, u8)]) -> Self {
        self.tables.insert(kind, to_map(entries));
        self
    }

    /// Progress for `(kind, status)`. Unknown statuses map to a small
    /// non-zero value and are logged.
    #[must_use]
    pub fn progress(&self, kind: TripKind, status: &str) -> u8 {
        self.tables.get(&kind).and_then(|table| table.get(status)).copied().unwrap_or_else(|| {
            warn!(%kind, status, "status missing from progress table");
            UNKNOWN_PROGRESS
        })
    }

    /// Checks every table: the cancellation status maps to 0, every terminal
    /// success status maps to 100, and nothing else touches either bound.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated invariant.
    pub fn validate(&self) -> AnyResult<()> {
        for kind in [TripKind::Delivery, TripKind::Taxi, TripKind::Marketplace] {
            let Some(table) = self.tables.get(&kind) else {
                bail!("no progress table for kind {kind}");
            };

            let cancelled = cancelled_status(kind);
            if table.get(cancelled) != Some(&0) {
                bail!("{kind}: cancellation status {cancelled} must map to 0");
            }
            for status in terminal_success(kind) {
                if table.get(*status) != Some(&100) {
                    bail!("{kind}: terminal status {status} must map to 100");
                }
            }
            for (status, progress) in table {
                let terminal = *status == cancelled
                    || terminal_success(kind).contains(&status.as_str());
                if !terminal && !(1..=99).contains(progress) {
                    bail!("{kind}: non-terminal status {status} maps to {progress}");
                }
            }
        }
        Ok(())
    }
}

fn to_map(entries: &[(&str, u8)]) -> HashMap<String, u8> {
    entries.iter().map(|(status, progress)| ((*status).to_string(), *progress)).collect()
}

/// Normalizes one raw record of the given kind.
///
/// # Errors
///
/// Returns a `LoadError` when the payload does not deserialize as the kind's
/// record shape.
pub fn normalize(
    kind: TripKind, value: &Value, tables: &ProgressTables,
) -> realtime::Result<TrackingData> {
    match kind {
        TripKind::Delivery => delivery::normalize(value, tables),
        TripKind::Taxi => taxi::normalize(value, tables),
        TripKind::Marketplace => market::normalize(value, tables),
    }
}

/// Kind-aware human label for a raw status.
#[must_use]
pub fn status_label(kind: TripKind, status: &str) -> &'static str {
    match kind {
        TripKind::Delivery => delivery::label(status),
        TripKind::Taxi => taxi::label(status),
        TripKind::Marketplace => market::label(status),
    }
}

/// True when the status is in the kind's terminal set (success or
/// cancellation).
#[must_use]
pub fn is_terminal(kind: TripKind, status: &str) -> bool {
    status == cancelled_status(kind) || terminal_success(kind).contains(&status)
}

#[must_use]
pub const fn cancelled_status(kind: TripKind) -> &'static str {
    match kind {
        TripKind::Delivery => delivery::CANCELLED,
        TripKind::Taxi => taxi::CANCELLED,
        TripKind::Marketplace => market::CANCELLED,
    }
}

#[must_use]
pub const fn terminal_success(kind: TripKind) -> &'static [&'static str] {
    match kind {
        TripKind::Delivery => delivery::TERMINAL_SUCCESS,
        TripKind::Taxi => taxi::TERMINAL_SUCCESS,
        TripKind::Marketplace => market::TERMINAL_SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_tables_validate() {
        ProgressTables::default().validate().expect("default tables should hold the invariants");
    }

    #[test]
    fn every_known_status_is_mapped() {
        let tables = ProgressTables::default();
        for (kind, entries) in [
            (TripKind::Delivery, delivery::DEFAULT_PROGRESS),
            (TripKind::Taxi, taxi::DEFAULT_PROGRESS),
            (TripKind::Marketplace, market::DEFAULT_PROGRESS),
        ] {
            for (status, progress) in entries {
                assert_eq!(tables.progress(kind, status), *progress, "{kind}/{status}");
            }
        }
    }

    #[test]
    fn cancellation_maps_to_zero_and_success_to_hundred() {
        let tables = ProgressTables::default();
        for kind in [TripKind::Delivery, TripKind::Taxi, TripKind::Marketplace] {
            assert_eq!(tables.progress(kind, cancelled_status(kind)), 0);
            for status in terminal_success(kind) {
                assert_eq!(tables.progress(kind, status), 100);
            }
        }
    }

    #[test]
    fn unknown_status_stays_inside_bounds() {
        let progress = ProgressTables::default().progress(TripKind::Delivery, "mystery_status");
        assert!((1..=99).contains(&progress));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let tables = ProgressTables::default()
            .with_table(TripKind::Taxi, &[("requested", 10), ("completed", 90), ("cancelled", 0)]);
        assert!(tables.validate().is_err());
    }

    #[test]
    fn override_replaces_wholesale() {
        let tables = ProgressTables::default().with_table(
            TripKind::Taxi,
            &[("requested", 15), ("completed", 100), ("cancelled", 0)],
        );
        tables.validate().expect("override should validate");
        assert_eq!(tables.progress(TripKind::Taxi, "requested"), 15);
    }
}

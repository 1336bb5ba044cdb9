//! Ride-hailing record mapping.

use realtime::{GeoPoint, Result};
use serde_json::Value;

use crate::model::{Counterparty, Place, Pricing, Timing, TrackingData, TripKind, TripRoute};
use crate::normalize::ProgressTables;
use crate::records::TaxiRecord;

pub const CANCELLED: &str = "cancelled";
pub const TERMINAL_SUCCESS: &[&str] = &["completed"];

/// Default status→progress table for rides.
pub const DEFAULT_PROGRESS: &[(&str, u8)] = &[
    ("requested", 10),
    ("accepted", 25),
    ("driver_arriving", 40),
    ("arrived", 50),
    ("in_progress", 75),
    ("completed", 100),
    ("cancelled", 0),
];

pub(crate) fn normalize(value: &Value, tables: &ProgressTables) -> Result<TrackingData> {
    let record: TaxiRecord = serde_json::from_value(value.clone())?;
    let progress = tables.progress(TripKind::Taxi, &record.ride_status);

    Ok(TrackingData {
        id: record.id,
        kind: TripKind::Taxi,
        counterparty: record.driver.map(|driver| Counterparty {
            id: driver.id,
            name: driver.full_name,
            phone: driver.phone_number,
            avatar_url: driver.avatar,
            rating: driver.rating,
            vehicle: driver
                .vehicle
                .map(|vehicle| format!("{} {} · {}", vehicle.make, vehicle.model, vehicle.plate)),
        }),
        route: TripRoute {
            pickup: Place {
                point: GeoPoint::new(record.pickup.lat, record.pickup.lng),
                address: record.pickup_address,
            },
            destination: Place {
                point: GeoPoint::new(record.destination.lat, record.destination.lng),
                address: record.destination_address,
            },
        },
        pricing: Pricing {
            amount: record.fare,
            currency: record.currency,
            estimated: record.fare_estimated,
        },
        timing: Timing {
            created_at: record.requested_at,
            estimated_arrival: record.eta,
            completed_at: record.completed_at,
        },
        status: record.ride_status,
        progress,
        counterparty_location: None,
    })
}

pub(crate) fn label(status: &str) -> &'static str {
    match status {
        "requested" => "Finding you a driver",
        "accepted" => "Driver on the way",
        "driver_arriving" => "Driver is arriving",
        "arrived" => "Driver has arrived",
        "in_progress" => "On your trip",
        "completed" => "Trip completed",
        "cancelled" => "Cancelled",
        _ => "In progress",
    }
}

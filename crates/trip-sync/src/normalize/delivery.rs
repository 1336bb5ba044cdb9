//! Delivery-job record mapping.

use realtime::{GeoPoint, Result};
use serde_json::Value;

use crate::model::{Counterparty, Place, Pricing, Timing, TrackingData, TripKind, TripRoute};
use crate::normalize::ProgressTables;
use crate::records::DeliveryRecord;

pub const CANCELLED: &str = "cancelled";
pub const TERMINAL_SUCCESS: &[&str] = &["delivered"];

/// Default status→progress table for deliveries.
pub const DEFAULT_PROGRESS: &[(&str, u8)] = &[
    ("pending", 5),
    ("confirmed", 10),
    ("preparing", 25),
    ("ready_for_pickup", 40),
    ("courier_assigned", 50),
    ("picked_up", 60),
    ("in_transit", 75),
    ("arriving", 90),
    ("delivered", 100),
    ("cancelled", 0),
];

pub(crate) fn normalize(value: &Value, tables: &ProgressTables) -> Result<TrackingData> {
    let record: DeliveryRecord = serde_json::from_value(value.clone())?;
    let progress = tables.progress(TripKind::Delivery, &record.status);

    Ok(TrackingData {
        id: record.id,
        kind: TripKind::Delivery,
        counterparty: record.courier.map(|courier| Counterparty {
            id: courier.id,
            name: courier.name,
            phone: courier.phone,
            avatar_url: courier.photo_url,
            rating: courier.rating,
            vehicle: courier.vehicle_type,
        }),
        route: TripRoute {
            pickup: Place {
                point: GeoPoint::new(record.pickup_lat, record.pickup_lng),
                address: record.pickup_address,
            },
            destination: Place {
                point: GeoPoint::new(record.dropoff_lat, record.dropoff_lng),
                address: record.dropoff_address,
            },
        },
        pricing: Pricing {
            amount: record.delivery_fee,
            currency: record.currency,
            estimated: record.fee_estimated,
        },
        timing: Timing {
            created_at: record.created_at,
            estimated_arrival: record.estimated_delivery_time,
            completed_at: record.delivered_at,
        },
        status: record.status,
        progress,
        counterparty_location: None,
    })
}

pub(crate) fn label(status: &str) -> &'static str {
    match status {
        "pending" => "Waiting for confirmation",
        "confirmed" => "Order confirmed",
        "preparing" => "Being prepared",
        "ready_for_pickup" => "Ready for pickup",
        "courier_assigned" => "Courier assigned",
        "picked_up" => "Courier has your order",
        "in_transit" => "On the way",
        "arriving" => "Courier is arriving",
        "delivered" => "Delivered",
        "cancelled" => "Cancelled",
        _ => "In progress",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn record() -> Value {
        json!({
            "id": "dlv-42",
            "status": "picked_up",
            "courier": {
                "id": "courier-7",
                "name": "Mere T.",
                "phone": "+64210000000",
                "rating": 4.9,
                "vehicleType": "bike"
            },
            "pickupLat": -36.8485,
            "pickupLng": 174.7633,
            "pickupAddress": "1 Queen St",
            "dropoffLat": -36.8571,
            "dropoffLng": 174.7654,
            "dropoffAddress": "50 Symonds St",
            "deliveryFee": 8.5,
            "currency": "NZD",
            "feeEstimated": false,
            "createdAt": 1_700_000_000_000_i64,
            "estimatedDeliveryTime": 1_700_000_900_000_i64
        })
    }

    #[test]
    fn maps_fields_and_progress() {
        let tracking = normalize(&record(), &ProgressTables::default()).expect("should normalize");

        assert_eq!(tracking.id, "dlv-42");
        assert_eq!(tracking.kind, TripKind::Delivery);
        // progress comes from the table, never from remaining distance
        assert_eq!(tracking.progress, 60);
        assert_eq!(tracking.counterparty.as_ref().map(|c| c.name.as_str()), Some("Mere T."));
        assert_eq!(tracking.route.destination.address, "50 Symonds St");
        assert_eq!(tracking.pricing.amount, 8.5);
        assert_eq!(tracking.timing.estimated_arrival, Some(1_700_000_900_000));
        assert!(tracking.counterparty_location.is_none());
        assert!(tracking.is_active());
    }

    #[test]
    fn unassigned_delivery_has_no_counterparty() {
        let mut value = record();
        value["courier"] = Value::Null;
        value["status"] = json!("pending");

        let tracking = normalize(&value, &ProgressTables::default()).expect("should normalize");
        assert!(tracking.counterparty.is_none());
        assert_eq!(tracking.progress, 5);
    }

    #[test]
    fn malformed_record_is_a_load_error() {
        let err = normalize(&json!({"id": 12}), &ProgressTables::default()).unwrap_err();
        assert_eq!(err.code(), "load_error");
    }
}

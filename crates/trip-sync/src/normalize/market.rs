//! Marketplace-order record mapping.

use realtime::{GeoPoint, Result};
use serde_json::Value;

use crate::model::{Counterparty, Place, Pricing, Timing, TrackingData, TripKind, TripRoute};
use crate::normalize::ProgressTables;
use crate::records::MarketplaceOrderRecord;

pub const CANCELLED: &str = "cancelled";
pub const TERMINAL_SUCCESS: &[&str] = &["delivered"];

/// Default status→progress table for marketplace orders.
pub const DEFAULT_PROGRESS: &[(&str, u8)] = &[
    ("placed", 10),
    ("confirmed", 20),
    ("processing", 40),
    ("shipped", 60),
    ("out_for_delivery", 80),
    ("delivered", 100),
    ("cancelled", 0),
];

pub(crate) fn normalize(value: &Value, tables: &ProgressTables) -> Result<TrackingData> {
    let record: MarketplaceOrderRecord = serde_json::from_value(value.clone())?;
    let progress = tables.progress(TripKind::Marketplace, &record.order_status);

    // marketplace orders carry the courier flat on the record
    let counterparty = record.courier_id.map(|id| Counterparty {
        id,
        name: record.courier_name.unwrap_or_default(),
        phone: record.courier_phone,
        avatar_url: None,
        rating: None,
        vehicle: None,
    });

    Ok(TrackingData {
        id: record.id,
        kind: TripKind::Marketplace,
        counterparty,
        route: TripRoute {
            pickup: Place {
                point: GeoPoint::new(record.seller_lat, record.seller_lng),
                address: record.seller_address,
            },
            destination: Place {
                point: GeoPoint::new(record.shipping_lat, record.shipping_lng),
                address: record.shipping_address,
            },
        },
        pricing: Pricing { amount: record.total, currency: record.currency, estimated: false },
        timing: Timing {
            created_at: record.placed_at,
            estimated_arrival: record.expected_delivery,
            completed_at: record.fulfilled_at,
        },
        status: record.order_status,
        progress,
        counterparty_location: None,
    })
}

pub(crate) fn label(status: &str) -> &'static str {
    match status {
        "placed" => "Order placed",
        "confirmed" => "Order confirmed",
        "processing" => "Being processed",
        "shipped" => "Shipped",
        "out_for_delivery" => "Out for delivery",
        "delivered" => "Delivered",
        "cancelled" => "Cancelled",
        _ => "In progress",
    }
}

//! Backend record shapes as stored by the platform, one per trip kind. Field
//! names mirror the backend collections; normalization projects them onto
//! [`crate::TrackingData`](crate::model::TrackingData).

use serde::{Deserialize, Serialize};

/// A delivery job record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub courier: Option<CourierInfo>,
    #[serde(default)]
    pub pickup_lat: f64,
    #[serde(default)]
    pub pickup_lng: f64,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub dropoff_lat: f64,
    #[serde(default)]
    pub dropoff_lng: f64,
    #[serde(default)]
    pub dropoff_address: String,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub fee_estimated: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub estimated_delivery_time: Option<i64>,
    #[serde(default)]
    pub delivered_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourierInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

/// A ride-hailing trip record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaxiRecord {
    pub id: String,
    #[serde(default)]
    pub ride_status: String,
    #[serde(default)]
    pub driver: Option<DriverInfo>,
    #[serde(default)]
    pub pickup: LatLng,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub destination: LatLng,
    #[serde(default)]
    pub destination_address: String,
    #[serde(default)]
    pub fare: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub fare_estimated: bool,
    #[serde(default)]
    pub requested_at: i64,
    #[serde(default)]
    pub eta: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LatLng {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriverInfo {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vehicle: Option<VehicleInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub plate: String,
}

/// A marketplace order record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceOrderRecord {
    pub id: String,
    #[serde(default)]
    pub order_status: String,
    #[serde(default)]
    pub courier_id: Option<String>,
    #[serde(default)]
    pub courier_name: Option<String>,
    #[serde(default)]
    pub courier_phone: Option<String>,
    #[serde(default)]
    pub seller_lat: f64,
    #[serde(default)]
    pub seller_lng: f64,
    #[serde(default)]
    pub seller_address: String,
    #[serde(default)]
    pub shipping_lat: f64,
    #[serde(default)]
    pub shipping_lng: f64,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub placed_at: i64,
    #[serde(default)]
    pub expected_delivery: Option<i64>,
    #[serde(default)]
    pub fulfilled_at: Option<i64>,
}

/// The live-location record published for a courier or driver, keyed by
/// counterparty id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveLocationRecord {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    /// Unix epoch milliseconds at the source.
    #[serde(default)]
    pub updated_at: i64,
}

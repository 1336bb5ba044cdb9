//! Planned route model returned by the routing provider.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Maneuver performed at the end of a route step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverType {
    Depart,
    Continue,
    TurnLeft,
    TurnRight,
    UTurn,
    Arrive,
}

impl ManeuverType {
    /// Spoken phrase for the maneuver.
    #[must_use]
    pub const fn phrase(self) -> &'static str {
        match self {
            Self::Depart => "Head out",
            Self::Continue => "Continue straight",
            Self::TurnLeft => "Turn left",
            Self::TurnRight => "Turn right",
            Self::UTurn => "Make a U-turn",
            Self::Arrive => "You have arrived",
        }
    }
}

/// One leg of a route: travel `distance_m`, then perform `maneuver`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub maneuver: ManeuverType,
    #[serde(default)]
    pub street_name: Option<String>,
    pub distance_m: f64,
}

/// A navigable route: the polyline geometry plus maneuver steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub points: Vec<GeoPoint>,
    pub steps: Vec<RouteStep>,
    pub distance_m: f64,
    pub duration_s: f64,
}

impl Route {
    /// Cumulative along-route offset, in meters, at which each step's
    /// maneuver triggers.
    #[must_use]
    pub fn step_offsets(&self) -> Vec<f64> {
        let mut offset = 0.0;
        self.steps
            .iter()
            .map(|step| {
                offset += step.distance_m;
                offset
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.len() < 2
    }
}

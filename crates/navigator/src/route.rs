//! Route-relative geometry: projecting a position onto the planned polyline.

use realtime::{GeoPoint, Route, distance_m};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Where a position sits relative to the route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteProjection {
    /// Distance traveled along the route, meters.
    pub along_m: f64,
    /// Perpendicular distance from the route, meters. The corridor check
    /// compares this against the configured tolerance.
    pub cross_track_m: f64,
}

/// Projects `position` onto the nearest segment of the route polyline.
///
/// Uses a local equirectangular approximation per segment, which is accurate
/// to well under a meter at street scale.
#[must_use]
pub fn project(route: &Route, position: GeoPoint) -> RouteProjection {
    let mut best =
        RouteProjection { along_m: 0.0, cross_track_m: distance_m(position, route_start(route)) };
    let mut cumulative = 0.0;

    for pair in route.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let segment_len = distance_m(a, b);

        let (px, py) = planar(a, position);
        let (bx, by) = planar(a, b);
        let segment_sq = bx.mul_add(bx, by * by);

        let t = if segment_sq > 0.0 {
            (px.mul_add(bx, py * by) / segment_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let dx = px - t * bx;
        let dy = py - t * by;
        let cross = dx.hypot(dy);

        if cross < best.cross_track_m {
            best = RouteProjection { along_m: t.mul_add(segment_len, cumulative), cross_track_m: cross };
        }

        cumulative += segment_len;
    }

    best
}

fn route_start(route: &Route) -> GeoPoint {
    route.points.first().copied().unwrap_or_default()
}

/// Planar offset of `point` from `origin` in meters.
fn planar(origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
    let x = (point.longitude - origin.longitude)
        * METERS_PER_DEG_LAT
        * origin.latitude.to_radians().cos();
    let y = (point.latitude - origin.latitude) * METERS_PER_DEG_LAT;
    (x, y)
}

use common::{OrbitObject, Point};

/// Position on the orbit at phase `t`, with the angular velocity scaled by
/// the rate multiplier.
pub fn position(orbit: &OrbitObject, t: f64, rate_multiplier: f64) -> Point {
    let angle = t * orbit.angular_velocity * rate_multiplier;
    (
        orbit.center.0 + orbit.path_radius * angle.cos(),
        orbit.center.1 + orbit.path_radius * angle.sin(),
    )
}

use common::{Animation, Point};

use super::MotionError;

/// A discrete walk along a path: the object heads for `target_index` in a
/// straight line and picks the next waypoint once it gets there.
#[derive(Clone, Debug, PartialEq)]
pub struct PathWalk {
    pub position: Point,
    /// Waypoint the object is currently heading for
    pub target_index: usize,
    pub traveling_forward: bool,
}

impl PathWalk {
    /// Start on the first waypoint, heading for the second.
    pub fn start(waypoints: &[Point]) -> Self {
        PathWalk {
            position: waypoints.first().copied().unwrap_or((0.0, 0.0)),
            target_index: 1,
            traveling_forward: true,
        }
    }

    /// Move up to `step` units toward the target. Arriving within one step
    /// snaps onto the waypoint and picks the next target. Returns `false`
    /// once the walk is over for good.
    pub fn step(
        &mut self,
        waypoints: &[Point],
        step: f64,
        animation: Animation,
    ) -> Result<bool, MotionError> {
        if waypoints.len() < 2 {
            return Err(MotionError::TooFewWaypoints(waypoints.len()));
        }
        let target = *waypoints
            .get(self.target_index)
            .ok_or(MotionError::StateMismatch)?;

        let step = step.max(0.0);
        let (dx, dy) = (target.0 - self.position.0, target.1 - self.position.1);
        let distance = (dx * dx + dy * dy).sqrt();

        if distance <= step {
            self.position = target;
            return Ok(self.next_target(waypoints.len(), animation));
        }

        self.position = (
            self.position.0 + dx / distance * step,
            self.position.1 + dy / distance * step,
        );
        Ok(true)
    }

    fn next_target(&mut self, len: usize, animation: Animation) -> bool {
        if self.traveling_forward {
            if self.target_index + 1 < len {
                self.target_index += 1;
                return true;
            }

            match animation {
                Animation::Loop => self.target_index = 0,
                Animation::Bounce => {
                    self.traveling_forward = false;
                    self.target_index = len - 2;
                }
                Animation::None => return false,
            }
        } else {
            if self.target_index > 0 {
                self.target_index -= 1;
                return true;
            }

            match animation {
                Animation::Loop | Animation::Bounce => {
                    self.traveling_forward = true;
                    self.target_index = 1;
                }
                Animation::None => return false,
            }
        }

        true
    }
}

/// Position along the polyline at parameter `s`: the integer part picks the
/// segment (wrapping around), the fractional part is the progress through it.
pub fn continuous_position(waypoints: &[Point], s: f64) -> Result<Point, MotionError> {
    if waypoints.len() < 2 {
        return Err(MotionError::TooFewWaypoints(waypoints.len()));
    }
    if !s.is_finite() {
        return Err(MotionError::NotFinite);
    }

    let segments = (waypoints.len() - 1) as f64;
    let whole = s.floor();
    let progress = s - whole;
    let index = whole.rem_euclid(segments) as usize;

    let (start, end) = (waypoints[index], waypoints[index + 1]);
    Ok((
        start.0 + (end.0 - start.0) * progress,
        start.1 + (end.1 - start.1) * progress,
    ))
}

//! Per-object animation. Given an object, its motion state and the live
//! controls, work out where the object is this frame and what it looks like,
//! then move the state on by one frame.

use common::{Point, Rgb, SceneObject};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controls::ControlValues;

pub mod orbit;
pub mod path;

pub use path::PathWalk;

/// Simulated seconds per frame for the phase clock, regardless of how long
/// the frame actually took.
pub const FRAME_DELTA: f64 = 0.016;

/// Phase clocks start somewhere in `[0, PHASE_OFFSET_RANGE)` so identical
/// orbits in one scene do not move in lockstep.
pub const PHASE_OFFSET_RANGE: f64 = 10.0;

/// How path objects move. One policy applies to every path object of a
/// render loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathPolicy {
    /// Walk waypoint to waypoint at `speed` units per frame, then stop, loop
    /// or bounce according to the object's animation
    #[default]
    Checkpoint,
    /// Sweep the polyline as a function of the phase clock, ignoring the
    /// object's animation
    Continuous,
}

/// Animation state for one object of the current scene. Created when a scene
/// becomes current and thrown away when it stops being current.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionState {
    /// Continuous phase clock, in simulated seconds
    Phase { t: f64 },
    /// Discrete walk along a path
    Checkpoint(PathWalk),
    /// A path that ran out of waypoints with no animation. It stays put for
    /// the rest of the scene instance.
    Halted { position: Point },
}

/// Where and how to draw an object this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub color: Rgb,
    pub radius: f64,
}

#[derive(Error, Debug, PartialEq)]
pub enum MotionError {
    #[error("Path has {0} waypoints, at least 2 are needed")]
    TooFewWaypoints(usize),

    #[error("Position is not a finite number")]
    NotFinite,

    #[error("Motion state does not match the object")]
    StateMismatch,
}

impl MotionState {
    /// Fresh state for `object`. Phase clocks get a random starting offset.
    pub fn seed<R: Rng + ?Sized>(object: &SceneObject, policy: PathPolicy, rng: &mut R) -> Self {
        match (object, policy) {
            (SceneObject::Path(path), PathPolicy::Checkpoint) => {
                MotionState::Checkpoint(PathWalk::start(&path.waypoints))
            }
            _ => MotionState::Phase {
                t: rng.gen_range(0.0..PHASE_OFFSET_RANGE),
            },
        }
    }

    pub fn phase_clock(&self) -> Option<f64> {
        match self {
            MotionState::Phase { t } => Some(*t),
            _ => None,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, MotionState::Halted { .. })
    }
}

/// Evaluate `object` for this frame and advance `state` by one frame. On
/// error the state is left as it was.
pub fn evaluate(
    object: &SceneObject,
    state: &mut MotionState,
    controls: &ControlValues,
) -> Result<Placement, MotionError> {
    let rate = controls.rate_multiplier();

    let position = match (object, &*state) {
        (SceneObject::Orbit(orbit), MotionState::Phase { t }) => orbit::position(orbit, *t, rate),
        (SceneObject::Path(path), MotionState::Phase { t }) => {
            path::continuous_position(&path.waypoints, *t * path.speed * rate)?
        }
        (SceneObject::Path(_), MotionState::Checkpoint(walk)) => walk.position,
        (SceneObject::Path(_), MotionState::Halted { position }) => *position,
        _ => return Err(MotionError::StateMismatch),
    };

    if !(position.0.is_finite() && position.1.is_finite()) {
        return Err(MotionError::NotFinite);
    }

    let mut halted_at = None;
    match (object, &mut *state) {
        (_, MotionState::Phase { t }) => *t += FRAME_DELTA,
        (SceneObject::Path(path), MotionState::Checkpoint(walk)) => {
            if !walk.step(&path.waypoints, path.speed * rate, path.animation)? {
                halted_at = Some(walk.position);
            }
        }
        _ => {}
    }
    if let Some(position) = halted_at {
        *state = MotionState::Halted { position };
    }

    Ok(Placement {
        position,
        color: object.color().dimmed(controls.intensity),
        radius: object.radius() * controls.scale_multiplier(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Animation, OrbitObject, PathObject};
    use rand::{rngs::StdRng, SeedableRng};

    fn neutral() -> ControlValues {
        ControlValues::default()
    }

    #[test]
    fn test_phase_offsets_are_in_range_and_differ() {
        let mut rng = StdRng::seed_from_u64(7);
        let object = SceneObject::default();

        let clocks: Vec<f64> = (0..50)
            .map(|_| {
                MotionState::seed(&object, PathPolicy::Checkpoint, &mut rng)
                    .phase_clock()
                    .unwrap()
            })
            .collect();

        assert!(clocks.iter().all(|t| (0.0..PHASE_OFFSET_RANGE).contains(t)));
        assert!(clocks.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_policy_picks_path_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = SceneObject::Path(PathObject::default());

        assert!(matches!(
            MotionState::seed(&path, PathPolicy::Checkpoint, &mut rng),
            MotionState::Checkpoint(_)
        ));
        assert!(matches!(
            MotionState::seed(&path, PathPolicy::Continuous, &mut rng),
            MotionState::Phase { .. }
        ));
    }

    #[test]
    fn test_orbit_stays_on_its_circle() {
        let mut rng = StdRng::seed_from_u64(42);

        for path_radius in [0.0, 1.0, 150.0, 999.5] {
            for rate in [0u8, 1, 64, 128, 255] {
                let object = SceneObject::Orbit(OrbitObject {
                    center: (400.0, -30.0),
                    path_radius,
                    angular_velocity: 2.5,
                    ..OrbitObject::default()
                });
                let controls = ControlValues {
                    rate,
                    ..neutral()
                };
                let mut state = MotionState::seed(&object, PathPolicy::Checkpoint, &mut rng);

                for _ in 0..500 {
                    let placement = evaluate(&object, &mut state, &controls).unwrap();
                    let (dx, dy) = (placement.position.0 - 400.0, placement.position.1 + 30.0);
                    assert!(((dx * dx + dy * dy).sqrt() - path_radius).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_phase_clock_advances_one_frame() {
        let object = SceneObject::default();
        let mut state = MotionState::Phase { t: 1.0 };

        evaluate(&object, &mut state, &neutral()).unwrap();
        evaluate(&object, &mut state, &neutral()).unwrap();

        assert!((state.phase_clock().unwrap() - (1.0 + 2.0 * FRAME_DELTA)).abs() < 1e-12);
    }

    #[test]
    fn test_rate_scales_angular_velocity_squared() {
        let object = SceneObject::Orbit(OrbitObject {
            center: (0.0, 0.0),
            path_radius: 1.0,
            angular_velocity: 1.0,
            ..OrbitObject::default()
        });

        // Half rate is a quarter of the angular velocity
        let controls = ControlValues {
            rate: 64,
            ..neutral()
        };
        let mut state = MotionState::Phase { t: 2.0 };
        let placement = evaluate(&object, &mut state, &controls).unwrap();

        assert!((placement.position.0 - 0.5f64.cos()).abs() < 1e-12);
        assert!((placement.position.1 - 0.5f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_intensity_and_scale() {
        let object = SceneObject::Orbit(OrbitObject {
            color: Rgb::new(255, 128, 0),
            radius: 10.0,
            ..OrbitObject::default()
        });
        let controls = ControlValues {
            intensity: 0,
            rate: 128,
            scale: 64,
        };
        let mut state = MotionState::Phase { t: 0.0 };

        let placement = evaluate(&object, &mut state, &controls).unwrap();
        assert_eq!(Rgb::BLACK, placement.color);
        assert_eq!(2.5, placement.radius);
    }

    #[test]
    fn test_none_animation_halts_for_good() {
        let object = SceneObject::Path(PathObject {
            waypoints: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
            speed: 3.0,
            animation: Animation::None,
            ..PathObject::default()
        });
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = MotionState::seed(&object, PathPolicy::Checkpoint, &mut rng);

        let mut frames = 0;
        while !state.is_halted() {
            evaluate(&object, &mut state, &neutral()).unwrap();
            frames += 1;
            assert!(frames < 100, "path never finished");
        }

        for _ in 0..20 {
            let placement = evaluate(&object, &mut state, &neutral()).unwrap();
            assert_eq!((10.0, 10.0), placement.position);
        }
    }

    #[test]
    fn test_state_must_match_object() {
        let object = SceneObject::Orbit(OrbitObject::default());
        let mut state = MotionState::Checkpoint(PathWalk::start(&[(0.0, 0.0), (1.0, 1.0)]));

        assert_eq!(
            Err(MotionError::StateMismatch),
            evaluate(&object, &mut state, &neutral())
        );
    }

    #[test]
    fn test_non_finite_position_keeps_the_state() {
        let object = SceneObject::Orbit(OrbitObject {
            center: (f64::MAX, 0.0),
            path_radius: f64::MAX,
            angular_velocity: 0.0,
            ..OrbitObject::default()
        });
        let mut state = MotionState::Phase { t: 0.0 };

        assert_eq!(
            Err(MotionError::NotFinite),
            evaluate(&object, &mut state, &neutral())
        );
        assert_eq!(MotionState::Phase { t: 0.0 }, state);
    }

    #[test]
    fn test_continuous_path_speed_follows_rate() {
        let object = SceneObject::Path(PathObject {
            waypoints: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
            speed: 1.0,
            ..PathObject::default()
        });
        // Half rate: s = t * speed / 4
        let controls = ControlValues {
            rate: 64,
            ..neutral()
        };

        let mut state = MotionState::Phase { t: 2.0 };
        let placement = evaluate(&object, &mut state, &controls).unwrap();
        assert!((placement.position.0 - 5.0).abs() < 1e-9);
        assert!(placement.position.1.abs() < 1e-9);

        let mut state = MotionState::Phase { t: 6.0 };
        let placement = evaluate(&object, &mut state, &controls).unwrap();
        assert!((placement.position.0 - 10.0).abs() < 1e-9);
        assert!((placement.position.1 - 5.0).abs() < 1e-9);
        assert!((state.phase_clock().unwrap() - (6.0 + FRAME_DELTA)).abs() < 1e-12);
    }

    #[test]
    fn test_broken_path_is_an_error_not_a_panic() {
        let object = SceneObject::Path(PathObject {
            waypoints: vec![(5.0, 5.0)],
            ..PathObject::default()
        });

        let mut state = MotionState::Phase { t: 3.0 };
        assert_eq!(
            Err(MotionError::TooFewWaypoints(1)),
            evaluate(&object, &mut state, &neutral())
        );
        assert_eq!(Some(3.0), state.phase_clock());

        let mut state = MotionState::Checkpoint(PathWalk::start(&[(5.0, 5.0)]));
        assert_eq!(
            Err(MotionError::TooFewWaypoints(1)),
            evaluate(&object, &mut state, &neutral())
        );
    }
}

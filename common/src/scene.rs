use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A coordinate on the projection surface, in pixels. Serialized as `[x, y]`.
pub type Point = (f64, f64);

pub const DEFAULT_PATH_SPEED: f64 = 1.0;

/// A named, ordered collection of animated shapes. Scenes are identified by
/// their name, so two scenes in the same store can never share one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub objects: Vec<SceneObject>,
}

/// One animated shape. The motion kind is the `motion` field of the file
/// format, and each kind carries all of its own geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "motion")]
pub enum SceneObject {
    /// Constant-rate circular motion around a fixed center
    #[serde(rename = "circular")]
    Orbit(OrbitObject),
    /// Motion along a polyline of waypoints
    #[serde(rename = "path")]
    Path(PathObject),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitObject {
    #[serde(rename = "path_center")]
    pub center: Point,
    pub path_radius: f64,
    pub angular_velocity: f64,
    pub color: Rgb,
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathObject {
    #[serde(rename = "path")]
    pub waypoints: Vec<Point>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub animation: Animation,
    pub color: Rgb,
    pub radius: f64,
}

/// What a path object does once it reaches the last waypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    /// Stop on the last waypoint for good
    None,
    /// Head back to the first waypoint
    #[default]
    Loop,
    /// Walk the waypoints in reverse, then forward again
    Bounce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionKind {
    Orbit,
    Path,
}

/// An 8-bit color. Files may carry any number per channel; values are rounded
/// and clamped into [0, 255] on the way in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("Scene name is empty")]
    EmptyName,

    #[error("Object {index}: a path needs at least 2 waypoints, found {found}")]
    TooFewWaypoints { index: usize, found: usize },

    #[error("Object {index}: radius {value} is negative")]
    NegativeRadius { index: usize, value: f64 },

    #[error("Object {index}: path radius {value} is negative")]
    NegativePathRadius { index: usize, value: f64 },

    #[error("Object {index}: {field} is not a finite number")]
    NotFinite { index: usize, field: &'static str },
}

fn default_speed() -> f64 {
    DEFAULT_PATH_SPEED
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Scale every channel by `intensity / 255`, rounding to the nearest step.
    pub fn dimmed(self, intensity: u8) -> Self {
        let scale = |channel: u8| {
            (channel as f64 * intensity as f64 / 255.0)
                .round()
                .clamp(0.0, 255.0) as u8
        };

        Rgb::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(channels: [f64; 3]) -> Self {
        let clamp = |value: f64| value.round().clamp(0.0, 255.0) as u8;
        Rgb::new(clamp(channels[0]), clamp(channels[1]), clamp(channels[2]))
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        [color.r, color.g, color.b]
    }
}

impl std::fmt::Display for MotionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionKind::Orbit => write!(f, "circular"),
            MotionKind::Path => write!(f, "path"),
        }
    }
}

impl Default for OrbitObject {
    fn default() -> Self {
        OrbitObject {
            center: (400.0, 300.0),
            path_radius: 150.0,
            angular_velocity: 1.0,
            color: Rgb::RED,
            radius: 30.0,
        }
    }
}

impl Default for PathObject {
    fn default() -> Self {
        PathObject {
            waypoints: vec![(100.0, 100.0), (700.0, 100.0), (700.0, 700.0), (100.0, 700.0)],
            speed: 2.0,
            animation: Animation::Loop,
            color: Rgb::RED,
            radius: 30.0,
        }
    }
}

impl Default for SceneObject {
    fn default() -> Self {
        SceneObject::Orbit(OrbitObject::default())
    }
}

impl SceneObject {
    pub fn kind(&self) -> MotionKind {
        match self {
            SceneObject::Orbit(_) => MotionKind::Orbit,
            SceneObject::Path(_) => MotionKind::Path,
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            SceneObject::Orbit(orbit) => orbit.color,
            SceneObject::Path(path) => path.color,
        }
    }

    pub fn radius(&self) -> f64 {
        match self {
            SceneObject::Orbit(orbit) => orbit.radius,
            SceneObject::Path(path) => path.radius,
        }
    }

    /// Turn this object into the other motion kind. Color and radius carry
    /// over; the new geometry comes from the editor defaults.
    pub fn with_kind(self, kind: MotionKind) -> SceneObject {
        if self.kind() == kind {
            return self;
        }

        let (color, radius) = (self.color(), self.radius());
        match kind {
            MotionKind::Orbit => SceneObject::Orbit(OrbitObject {
                color,
                radius,
                ..OrbitObject::default()
            }),
            MotionKind::Path => SceneObject::Path(PathObject {
                color,
                radius,
                ..PathObject::default()
            }),
        }
    }

    /// Check the invariants of a single object. `index` is only used to
    /// label the error.
    pub fn validate(&self, index: usize) -> Result<(), SceneError> {
        let finite = |value: f64, field: &'static str| {
            if value.is_finite() {
                Ok(())
            } else {
                Err(SceneError::NotFinite { index, field })
            }
        };

        let radius = self.radius();
        finite(radius, "radius")?;
        if radius < 0.0 {
            return Err(SceneError::NegativeRadius {
                index,
                value: radius,
            });
        }

        match self {
            SceneObject::Orbit(orbit) => {
                finite(orbit.center.0, "path_center")?;
                finite(orbit.center.1, "path_center")?;
                finite(orbit.angular_velocity, "angular_velocity")?;
                finite(orbit.path_radius, "path_radius")?;
                if orbit.path_radius < 0.0 {
                    return Err(SceneError::NegativePathRadius {
                        index,
                        value: orbit.path_radius,
                    });
                }
            }
            SceneObject::Path(path) => {
                if path.waypoints.len() < 2 {
                    return Err(SceneError::TooFewWaypoints {
                        index,
                        found: path.waypoints.len(),
                    });
                }
                for (x, y) in &path.waypoints {
                    finite(*x, "path")?;
                    finite(*y, "path")?;
                }
                finite(path.speed, "speed")?;
            }
        }

        Ok(())
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Scene {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.name.trim().is_empty() {
            return Err(SceneError::EmptyName);
        }

        self.objects
            .iter()
            .enumerate()
            .try_for_each(|(index, object)| object.validate(index))
    }
}

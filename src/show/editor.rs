//! Scene editing. Every edit is applied to a scene body and checked before
//! it is kept, so a rejected edit leaves the body as it was.

use common::{Animation, MotionKind, Point, Rgb, Scene, SceneObject, SCENE_FILE_EXTENSION};

use super::ControlError;

/// A partial update of one scene object. Fields left as `None` keep their
/// current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectPatch {
    /// Switch motion kind first; the new kind starts from editor defaults
    pub kind: Option<MotionKind>,
    pub color: Option<Rgb>,
    pub radius: Option<f64>,
    // Orbit only
    pub center: Option<Point>,
    pub path_radius: Option<f64>,
    pub angular_velocity: Option<f64>,
    // Path only
    pub waypoints: Option<Vec<Point>>,
    pub speed: Option<f64>,
    pub animation: Option<Animation>,
}

impl ObjectPatch {
    /// The patched object. Nothing is checked beyond whether each field
    /// applies to the (possibly new) motion kind.
    pub fn apply(&self, object: &SceneObject) -> Result<SceneObject, ControlError> {
        let mut object = match self.kind {
            Some(kind) => object.clone().with_kind(kind),
            None => object.clone(),
        };
        let kind = object.kind();
        let mismatch = |field| ControlError::PatchMismatch { field, kind };

        match &mut object {
            SceneObject::Orbit(orbit) => {
                if self.waypoints.is_some() {
                    return Err(mismatch("path"));
                }
                if self.speed.is_some() {
                    return Err(mismatch("speed"));
                }
                if self.animation.is_some() {
                    return Err(mismatch("animation"));
                }

                if let Some(center) = self.center {
                    orbit.center = center;
                }
                if let Some(path_radius) = self.path_radius {
                    orbit.path_radius = path_radius;
                }
                if let Some(angular_velocity) = self.angular_velocity {
                    orbit.angular_velocity = angular_velocity;
                }
                if let Some(color) = self.color {
                    orbit.color = color;
                }
                if let Some(radius) = self.radius {
                    orbit.radius = radius;
                }
            }
            SceneObject::Path(path) => {
                if self.center.is_some() {
                    return Err(mismatch("path_center"));
                }
                if self.path_radius.is_some() {
                    return Err(mismatch("path_radius"));
                }
                if self.angular_velocity.is_some() {
                    return Err(mismatch("angular_velocity"));
                }

                if let Some(waypoints) = &self.waypoints {
                    path.waypoints = waypoints.clone();
                }
                if let Some(speed) = self.speed {
                    path.speed = speed;
                }
                if let Some(animation) = self.animation {
                    path.animation = animation;
                }
                if let Some(color) = self.color {
                    path.color = color;
                }
                if let Some(radius) = self.radius {
                    path.radius = radius;
                }
            }
        }

        Ok(object)
    }
}

/// Append an object (the editor default when `object` is `None`). Returns its
/// index.
pub fn add_object(scene: &mut Scene, object: Option<SceneObject>) -> Result<usize, ControlError> {
    let object = object.unwrap_or_default();
    let index = scene.objects.len();
    object.validate(index)?;

    scene.objects.push(object);
    Ok(index)
}

pub fn remove_object(scene: &mut Scene, index: usize) -> Result<SceneObject, ControlError> {
    check_index(scene, index)?;
    Ok(scene.objects.remove(index))
}

pub fn update_object(
    scene: &mut Scene,
    index: usize,
    patch: &ObjectPatch,
) -> Result<(), ControlError> {
    check_index(scene, index)?;

    let updated = patch.apply(&scene.objects[index])?;
    updated.validate(index)?;

    scene.objects[index] = updated;
    Ok(())
}

fn check_index(scene: &Scene, index: usize) -> Result<(), ControlError> {
    let len = scene.objects.len();
    if index >= len {
        return Err(ControlError::ObjectIndex { index, len });
    }
    Ok(())
}

/// File name a scene is saved under. Anything that is not a letter, digit,
/// space, dash or underscore becomes an underscore.
pub fn scene_file_name(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem = if stem.is_empty() { "scene" } else { &stem };
    format!("{stem}.{SCENE_FILE_EXTENSION}")
}

use common::{MotionKind, SceneError, SceneFileError};
use thiserror::Error;

pub mod editor;
pub mod playback;
pub mod scene_store;
pub mod show_manager;

pub mod prelude {
    pub use super::{
        editor::ObjectPatch,
        playback::{PlaybackHandle, PlaybackScheduler},
        scene_store::{CurrentScene, SceneStore},
        show_manager::ShowManager,
        ControlError,
    };
}

/// A control-surface operation that was refused. A refused operation never
/// changes any state.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("No scene selected or invalid scene")]
    NoSceneSelected,

    #[error("Scene '{0}' not found")]
    UnknownScene(String),

    #[error("Playback interval must be at least 1 second, got {0}")]
    InvalidPlaybackInterval(u64),

    #[error("Projection is already running")]
    AlreadyRunning,

    #[error("A scene named '{0}' already exists")]
    NameTaken(String),

    #[error("Object {index} does not exist, the scene has {len}")]
    ObjectIndex { index: usize, len: usize },

    #[error("Invalid scene: {0}")]
    InvalidObject(#[from] SceneError),

    #[error("{field} does not apply to a {kind} object")]
    PatchMismatch {
        field: &'static str,
        kind: MotionKind,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SceneFile(#[from] SceneFileError),
}

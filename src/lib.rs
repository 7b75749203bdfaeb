pub mod config;
pub mod controls;
pub mod dmx;
pub mod logging;
pub mod motion;
pub mod projector;
pub mod show;
pub mod stop;
pub mod structure;

pub mod prelude {
    pub use crate::{
        config::*,
        controls::{ControlValues, SharedControls},
        dmx::{ArtNetHandle, ArtNetReceiver},
        logging::LogSink,
        motion::{MotionState, PathPolicy},
        projector::{CloseHandle, FrameBuffer, RenderLoop, Surface, SurfaceEvent},
        show::prelude::*,
        stop::{StopSignal, StopToken},
        structure::FileStructure,
    };
    pub use common::{Animation, MotionKind, Rgb, Scene, SceneObject};
}

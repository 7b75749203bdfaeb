pub mod codec;
pub mod scene;

pub use codec::{
    decode_scene, encode_scene, is_scene_file, read_scene_file, write_scene_file, SceneFileError,
    SCENE_FILE_EXTENSION,
};
pub use scene::{
    Animation, MotionKind, OrbitObject, PathObject, Point, Rgb, Scene, SceneError, SceneObject,
};

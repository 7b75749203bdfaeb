//! The scene file container: a Base64 encoding of a UTF-8 JSON document
//! holding one `Scene`.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use thiserror::Error;

use crate::scene::{Scene, SceneError};

pub const SCENE_FILE_EXTENSION: &str = "spyLAZ";

#[derive(Error, Debug)]
pub enum SceneFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not valid Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid scene document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scene: {0}")]
    Invalid(#[from] SceneError),
}

/// Encode a scene into the bytes of a scene file.
pub fn encode_scene(scene: &Scene) -> Result<String, SceneFileError> {
    let json = serde_json::to_string_pretty(scene)?;
    Ok(BASE64_STANDARD.encode(json.as_bytes()))
}

/// Decode and validate the bytes of a scene file. Whitespace anywhere in the
/// Base64 text (line wrapping, a trailing newline) is ignored.
pub fn decode_scene(bytes: &[u8]) -> Result<Scene, SceneFileError> {
    let text: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let decoded = String::from_utf8(BASE64_STANDARD.decode(text)?)?;
    let scene: Scene = serde_json::from_str(&decoded)?;
    scene.validate()?;

    Ok(scene)
}

pub fn read_scene_file(path: &Path) -> Result<Scene, SceneFileError> {
    decode_scene(&std::fs::read(path)?)
}

pub fn write_scene_file(path: &Path, scene: &Scene) -> Result<(), SceneFileError> {
    std::fs::write(path, encode_scene(scene)?)?;
    Ok(())
}

/// Whether a path looks like a scene file, by extension.
pub fn is_scene_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SCENE_FILE_EXTENSION)
}

use std::{fs, path::Path};

use anyhow::{Context, Error};
use common::is_scene_file;
use log::info;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "src/assets/scenes"]
struct DemoScenes;

pub struct FileStructure {}

impl FileStructure {
    /// Make sure the scene directory exists. If it has no scene files yet and
    /// `seed_demo` is set, fill it with the built-in demo scenes. Returns the
    /// number of demo files written.
    pub fn verify(dir: &Path, seed_demo: bool) -> Result<usize, Error> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            info!("Created scene directory {}", dir.display());
        }

        if !seed_demo || Self::has_scene_files(dir)? {
            return Ok(0);
        }

        let mut written = 0;
        for name in DemoScenes::iter() {
            let Some(file) = DemoScenes::get(&name) else {
                continue;
            };

            let path = dir.join(&*name);
            fs::write(&path, &file.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }

        info!("Wrote {written} demo scenes to {}", dir.display());
        Ok(written)
    }

    fn has_scene_files(dir: &Path) -> Result<bool, Error> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

        Ok(entries
            .filter_map(Result::ok)
            .any(|entry| is_scene_file(&entry.path())))
    }

    /// Names of the built-in demo scene files.
    pub fn demo_scene_files() -> Vec<String> {
        DemoScenes::iter().map(|name| name.to_string()).collect()
    }
}

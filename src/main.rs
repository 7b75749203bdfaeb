use std::path::PathBuf;

use anyhow::Error;
use log::{error, info, warn};
use stage_laser::{logging, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let log = logging::init(true)?;

    // Load the config file, `config.ron` unless another one is given
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    info!("Starting config from {}...", config_path.display());
    let config = Config::load_or_default(&config_path)?;

    // Set up the scene directory
    info!("Starting scenes...");
    let scene_dir = config.scenes.directory.clone();
    FileStructure::verify(&scene_dir, config.scenes.seed_demo)?;

    let listen = config.control_net.enabled;
    let mut manager = ShowManager::new(config, log);
    manager.load_scenes_from_directory(&scene_dir)?;

    // The receiver failing to bind must not keep the show from running
    if listen {
        info!("Starting Control-Net...");
        if let Err(e) = manager.listen_control_net().await {
            warn!("Running without Control-Net: {e}");
        }
    }

    info!("Starting projection...");
    manager
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await;
    Ok(())
}

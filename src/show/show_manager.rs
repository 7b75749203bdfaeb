use std::{
    collections::HashMap,
    fs,
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use common::{is_scene_file, read_scene_file, write_scene_file, SceneObject};
use log::{debug, error, info, warn};
use tokio::time::sleep;

use super::{
    editor::{self, ObjectPatch},
    playback::{PlaybackHandle, PlaybackScheduler},
    scene_store::SceneStore,
    ControlError,
};
use crate::{
    config::Config,
    controls::{ControlValues, SharedControls},
    dmx::{ArtNetHandle, ArtNetReceiver},
    logging::LogSink,
    projector::{FrameBuffer, RenderLoop, RenderStats, Surface},
    stop::StopSignal,
};

/// The ShowManager is the control surface of the engine. Everything a UI can
/// do goes through it: loading and editing scenes, picking the current one,
/// starting and stopping projection, moving the sliders and turning playback
/// and the Control-Net receiver on and off.
///
/// Each moving part runs on its own: the render loop on a dedicated thread,
/// the playback scheduler and the receiver as tokio tasks. They only share
/// the scene store and the controls, so none of them can hold up another.
pub struct ShowManager {
    config: Config,
    store: Arc<SceneStore>,
    controls: Arc<SharedControls>,
    log: Arc<LogSink>,
    /// Where scenes were last loaded from, and where they are saved to
    scene_dir: PathBuf,
    /// The file each scene was last loaded from or saved to
    scene_files: HashMap<String, PathBuf>,
    receiver: Option<ArtNetHandle>,
    projection: Option<Projection>,
    playback: Option<PlaybackHandle>,
    /// Seconds per scene while playback is enabled. Playback only actually
    /// runs while projecting.
    playback_interval: Option<u64>,
}

/// A render loop running on its own thread.
struct Projection {
    /// Stopped by `stop`, and by the render thread itself when the display
    /// closes, so that anything tied to the projection ends with it
    stop: StopSignal,
    stats: Arc<RenderStats>,
    thread: thread::JoinHandle<()>,
}

impl ShowManager {
    pub fn new(config: Config, log: Arc<LogSink>) -> Self {
        let controls = Arc::new(SharedControls::new(config.controls));
        let playback_interval = config
            .playback
            .enabled
            .then_some(config.playback.interval_secs);

        Self {
            scene_dir: config.scenes.directory.clone(),
            scene_files: HashMap::new(),
            config,
            store: Arc::new(SceneStore::new()),
            controls,
            log,
            receiver: None,
            projection: None,
            playback: None,
            playback_interval,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<SceneStore> {
        self.store.clone()
    }

    pub fn controls(&self) -> Arc<SharedControls> {
        self.controls.clone()
    }

    pub fn log_sink(&self) -> Arc<LogSink> {
        self.log.clone()
    }

    pub fn scene_directory(&self) -> &Path {
        &self.scene_dir
    }

    /// Replace every loaded scene with the `*.spyLAZ` files of `dir`, read in
    /// file name order. Files that fail to decode are logged and skipped. The
    /// first scene becomes current.
    pub fn load_scenes_from_directory(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<usize, ControlError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            error!("Failed to read scene directory {}: {e}", dir.display());
            e
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_scene_file(path) && path.is_file())
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut scene_files = HashMap::new();
        let scenes: Vec<_> = paths
            .into_iter()
            .filter_map(|path| match read_scene_file(&path) {
                Ok(scene) => {
                    scene_files.insert(scene.name.clone(), path);
                    Some(scene)
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    None
                }
            })
            .collect();

        let count = self.store.replace_all(scenes);
        self.scene_dir = dir.to_path_buf();
        self.scene_files = scene_files;
        info!("Loaded {count} scenes from {}", dir.display());

        Ok(count)
    }

    pub fn list_scene_names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn current_scene(&self) -> Option<String> {
        self.store.current_name()
    }

    pub fn set_current_scene(&self, name: &str) -> Result<(), ControlError> {
        self.store.set_current(name)?;
        info!("Current scene: {name}");
        Ok(())
    }

    /// Start projecting onto an off-screen frame buffer of the configured
    /// size.
    pub async fn start(&mut self) -> Result<(), ControlError> {
        let (width, height) = (self.config.render.width, self.config.render.height);
        self.start_on(FrameBuffer::new(width, height)).await
    }

    /// Start projecting onto `surface`. Refused while already projecting, or
    /// when no valid scene is selected.
    pub async fn start_on<S>(&mut self, surface: S) -> Result<(), ControlError>
    where
        S: Surface + Send + 'static,
    {
        if self.is_running() {
            return Err(ControlError::AlreadyRunning);
        }
        // A projection that ended on its own still needs its thread joined
        self.stop().await;

        if self.store.current().is_none() {
            error!("No scene selected or invalid scene");
            return Err(ControlError::NoSceneSelected);
        }
        let scheduler = match self.playback_interval {
            Some(interval) => Some(
                PlaybackScheduler::new(self.store.clone(), interval).map_err(|e| {
                    error!("Not starting: {e}");
                    e
                })?,
            ),
            None => None,
        };

        let render = RenderLoop::new(
            surface,
            self.store.clone(),
            self.controls.clone(),
            &self.config.render,
        );
        let stats = render.stats();
        let stop = StopSignal::new();
        let signal = stop.clone();

        let thread = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                render.run(signal.token());
                signal.stop();
            })?;

        if let Some(scheduler) = scheduler {
            self.playback = Some(scheduler.spawn(stop.token()));
        }
        self.projection = Some(Projection {
            stop,
            stats,
            thread,
        });
        info!("Projection started");
        Ok(())
    }

    /// Stop projecting, and playback with it. Does nothing when idle.
    pub async fn stop(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.stop().await;
        }

        let Some(Projection { stop, stats, thread }) = self.projection.take() else {
            return;
        };
        stop.stop();

        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => info!("Projection stopped after {} frames", stats.frames()),
            Ok(Err(_)) => error!("Render thread panicked"),
            Err(e) => error!("Failed to join the render thread: {e}"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.projection
            .as_ref()
            .map_or(false, |projection| !projection.thread.is_finished())
    }

    /// Frames rendered by the running projection so far.
    pub fn frames_rendered(&self) -> u64 {
        self.projection
            .as_ref()
            .map_or(0, |projection| projection.stats.frames())
    }

    /// Wait until the projection ends by itself, e.g. because the display
    /// was closed, then clean up after it.
    pub async fn wait_for_projection_end(&mut self) {
        while self.is_running() {
            sleep(Duration::from_millis(100)).await;
        }
        self.stop().await;
    }

    pub fn control_values(&self) -> ControlValues {
        self.controls.snapshot()
    }

    pub fn set_intensity(&self, value: u8) {
        debug!("Intensity: {value}");
        self.controls.set_intensity(value);
    }

    pub fn set_rate(&self, value: u8) {
        debug!("Rate: {value}");
        self.controls.set_rate(value);
    }

    pub fn set_scale(&self, value: u8) {
        debug!("Scale: {value}");
        self.controls.set_scale(value);
    }

    /// Cycle through every scene, `interval_secs` each, for as long as the
    /// projection runs. Takes effect right away when already projecting.
    pub async fn enable_playback(&mut self, interval_secs: u64) -> Result<(), ControlError> {
        if interval_secs < 1 {
            error!("Playback interval must be at least 1 second, got {interval_secs}");
            return Err(ControlError::InvalidPlaybackInterval(interval_secs));
        }

        if let Some(playback) = self.playback.take() {
            playback.stop().await;
        }
        self.playback_interval = Some(interval_secs);
        info!("Playback enabled, {interval_secs} seconds per scene");

        self.spawn_playback(interval_secs)
    }

    pub async fn disable_playback(&mut self) {
        self.playback_interval = None;
        if let Some(playback) = self.playback.take() {
            playback.stop().await;
        }
        info!("Playback disabled");
    }

    pub fn is_playback_enabled(&self) -> bool {
        self.playback_interval.is_some()
    }

    pub fn is_playback_running(&self) -> bool {
        self.playback
            .as_ref()
            .map_or(false, |playback| !playback.is_finished())
    }

    fn spawn_playback(&mut self, interval_secs: u64) -> Result<(), ControlError> {
        let Some(projection) = self.projection.as_ref() else {
            return Ok(());
        };

        let scheduler = PlaybackScheduler::new(self.store.clone(), interval_secs)?;
        self.playback = Some(scheduler.spawn(projection.stop.token()));
        Ok(())
    }

    /// Start the Control-Net receiver on the configured address. Already
    /// listening is not an error. A bind failure only affects the receiver.
    pub async fn listen_control_net(&mut self) -> Result<SocketAddr, ControlError> {
        if let Some(receiver) = self.receiver.as_ref() {
            if !receiver.is_finished() {
                return Ok(receiver.local_addr());
            }
        }

        let addr = self.config.control_net.socket_addr();
        let receiver = ArtNetReceiver::bind(addr, self.controls.clone())
            .await
            .map_err(|e| {
                error!("Control-Net: failed to bind {addr}: {e}");
                e
            })?;

        let handle = receiver.spawn()?;
        let local_addr = handle.local_addr();
        self.receiver = Some(handle);

        Ok(local_addr)
    }

    pub async fn stop_control_net(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.stop().await;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.receiver
            .as_ref()
            .map_or(false, |receiver| !receiver.is_finished())
    }

    /// Append an object to a scene; the editor default when `object` is
    /// `None`. Returns the new object's index.
    pub fn add_object(
        &self,
        scene: &str,
        object: Option<SceneObject>,
    ) -> Result<usize, ControlError> {
        let index = self
            .store
            .update(scene, |body| editor::add_object(body, object))?;
        info!("Scene {scene}: added object {index}");
        Ok(index)
    }

    pub fn remove_object(&self, scene: &str, index: usize) -> Result<SceneObject, ControlError> {
        let removed = self
            .store
            .update(scene, |body| editor::remove_object(body, index))?;
        info!("Scene {scene}: removed object {index}");
        Ok(removed)
    }

    pub fn update_object(
        &self,
        scene: &str,
        index: usize,
        patch: &ObjectPatch,
    ) -> Result<(), ControlError> {
        self.store
            .update(scene, |body| editor::update_object(body, index, patch))?;
        info!("Scene {scene}: updated object {index}");
        Ok(())
    }

    pub fn rename_scene(&mut self, old: &str, new: &str) -> Result<(), ControlError> {
        self.store.rename(old, new)?;
        if let Some(path) = self.scene_files.remove(old) {
            self.scene_files.insert(new.trim().to_string(), path);
        }
        info!("Renamed scene {old} to {}", new.trim());
        Ok(())
    }

    /// Write a scene to the scene directory. Returns the file written. A
    /// renamed scene replaces the file it came from.
    pub fn save_scene(&mut self, name: &str) -> Result<PathBuf, ControlError> {
        let scene = self
            .store
            .get(name)
            .ok_or_else(|| ControlError::UnknownScene(name.to_string()))?;

        fs::create_dir_all(&self.scene_dir)?;
        let path = self.scene_dir.join(editor::scene_file_name(&scene.name));
        if let Ok(existing) = read_scene_file(&path) {
            if existing.name != scene.name {
                warn!(
                    "Saving scene {} over {}, which held scene {}",
                    scene.name,
                    path.display(),
                    existing.name
                );
            }
        }
        write_scene_file(&path, &scene)?;
        info!("Saved scene {} to {}", scene.name, path.display());

        if let Some(previous) = self.scene_files.insert(scene.name.clone(), path.clone()) {
            if previous != path && previous.is_file() {
                fs::remove_file(&previous)?;
                info!("Removed {}", previous.display());
            }
        }

        Ok(path)
    }

    /// Project until `shutdown` resolves or the projection ends by itself,
    /// then shut everything down. A refused start leaves the engine idle
    /// until `shutdown`.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let projecting = match self.start().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Not projecting: {e}");
                false
            }
        };

        tokio::select! {
            _ = shutdown => info!("Interrupted"),
            _ = self.wait_for_projection_end(), if projecting => info!("Projection ended"),
        }
        self.shutdown().await;
    }

    /// Stop everything: playback, projection and the receiver.
    pub async fn shutdown(&mut self) {
        self.stop().await;
        self.stop_control_net().await;
        info!("Shut down");
    }
}

impl Drop for ShowManager {
    fn drop(&mut self) {
        // The render thread only watches its token, so it has to be told
        if let Some(projection) = self.projection.as_ref() {
            projection.stop.stop();
        }
    }
}

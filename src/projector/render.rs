use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use common::{Rgb, Scene};
use log::{debug, error, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use super::{Surface, SurfaceEvent};
use crate::{
    config::RenderConfig,
    controls::SharedControls,
    motion::{self, MotionState, PathPolicy},
    show::prelude::{CurrentScene, SceneStore},
    stop::StopToken,
};

/// Counters a render loop publishes while it runs.
#[derive(Debug, Default)]
pub struct RenderStats {
    frames: AtomicU64,
    object_errors: AtomicU64,
}

impl RenderStats {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Objects that failed to evaluate, counted once per object per scene
    /// instance.
    pub fn object_errors(&self) -> u64 {
        self.object_errors.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

/// The scene being projected together with the motion state of each of its
/// objects. Thrown away whenever the store's current scene changes.
struct ActiveScene {
    name: String,
    generation: u64,
    scene: Arc<Scene>,
    motion: Vec<MotionState>,
    /// Whether the object's evaluation error has already been logged
    reported: Vec<bool>,
}

/// Draws the current scene onto a surface, one frame per `tick`.
///
/// The render loop is the only owner of motion state. It only reads the scene
/// store and the controls, so the scheduler, the control surface and the
/// receiver can change them at any time; changes show up on the next frame.
pub struct RenderLoop<S> {
    surface: S,
    store: Arc<SceneStore>,
    controls: Arc<SharedControls>,
    policy: PathPolicy,
    frame_time: Duration,
    rng: StdRng,
    active: Option<ActiveScene>,
    warned_no_scene: bool,
    stats: Arc<RenderStats>,
}

impl<S: Surface> RenderLoop<S> {
    pub fn new(
        surface: S,
        store: Arc<SceneStore>,
        controls: Arc<SharedControls>,
        render: &RenderConfig,
    ) -> Self {
        let rng = match render.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            surface,
            store,
            controls,
            policy: render.path_policy,
            frame_time: render.frame_time(),
            rng,
            active: None,
            warned_no_scene: false,
            stats: Arc::new(RenderStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RenderStats> {
        self.stats.clone()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    /// Motion state of the active scene's objects, in object order.
    pub fn motion_states(&self) -> &[MotionState] {
        self.active
            .as_ref()
            .map(|active| active.motion.as_slice())
            .unwrap_or_default()
    }

    /// Render one frame.
    pub fn tick(&mut self) -> TickOutcome {
        if self.surface.poll_events().contains(&SurfaceEvent::Quit) {
            return TickOutcome::Quit;
        }

        self.sync_scene();
        let controls = self.controls.snapshot();
        self.surface.clear(Rgb::BLACK);

        if let Some(active) = self.active.as_mut() {
            let objects = active
                .scene
                .objects
                .iter()
                .zip(active.motion.iter_mut())
                .zip(active.reported.iter_mut())
                .enumerate();

            for (index, ((object, state), reported)) in objects {
                match motion::evaluate(object, state, &controls) {
                    Ok(placement) => {
                        self.surface
                            .fill_circle(placement.position, placement.radius, placement.color)
                    }
                    Err(e) => {
                        if !*reported {
                            *reported = true;
                            self.stats.object_errors.fetch_add(1, Ordering::Relaxed);
                            warn!("Scene {}: skipping object {index}: {e}", active.name);
                        }
                    }
                }
            }
        }

        if let Err(e) = self.surface.present() {
            error!("Failed to present frame: {e}");
        }
        self.stats.frames.fetch_add(1, Ordering::Relaxed);

        TickOutcome::Continue
    }

    /// Render at the configured frame rate until `stop` fires or the surface
    /// asks to quit. Hands the surface back.
    pub fn run(mut self, stop: StopToken) -> S {
        let (width, height) = self.surface.size();
        info!(
            "Render loop started: {width}x{height}, {:?} per frame, {:?} paths",
            self.frame_time, self.policy
        );

        while !stop.is_stopped() {
            let started = Instant::now();
            if self.tick() == TickOutcome::Quit {
                info!("Display closed");
                break;
            }

            if let Some(rest) = self.frame_time.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        info!("Render loop stopped after {} frames", self.stats.frames());
        self.surface
    }

    /// Pick up a new current scene, or a new body for it, and start its
    /// motion from scratch.
    fn sync_scene(&mut self) {
        let Some(current) = self.store.current() else {
            if self.active.take().is_some() || !self.warned_no_scene {
                warn!("No scene selected or invalid scene");
            }
            self.warned_no_scene = true;
            return;
        };
        self.warned_no_scene = false;

        let stale = self
            .active
            .as_ref()
            .map_or(true, |active| active.generation != current.generation);
        if stale {
            self.instantiate(current);
        }
    }

    fn instantiate(&mut self, current: CurrentScene) {
        match &self.active {
            Some(previous) if previous.name == current.name => {
                debug!("Scene {} changed, restarting its motion", current.name)
            }
            _ => info!("Projecting scene: {}", current.name),
        }

        let motion: Vec<MotionState> = current
            .scene
            .objects
            .iter()
            .map(|object| MotionState::seed(object, self.policy, &mut self.rng))
            .collect();

        self.active = Some(ActiveScene {
            reported: vec![false; motion.len()],
            name: current.name,
            generation: current.generation,
            scene: current.scene,
            motion,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controls::ControlValues, motion::FRAME_DELTA, projector::FrameBuffer, stop::StopSignal};
    use common::{OrbitObject, PathObject, SceneObject};

    fn dot(center: (f64, f64)) -> SceneObject {
        SceneObject::Orbit(OrbitObject {
            center,
            path_radius: 0.0,
            radius: 10.0,
            ..OrbitObject::default()
        })
    }

    fn scene(name: &str, objects: Vec<SceneObject>) -> Scene {
        Scene {
            name: name.to_string(),
            objects,
        }
    }

    fn render_loop(store: Arc<SceneStore>) -> (RenderLoop<FrameBuffer>, Arc<SharedControls>) {
        let controls = Arc::new(SharedControls::default());
        let config = RenderConfig {
            width: 200,
            height: 100,
            seed: Some(11),
            ..RenderConfig::default()
        };
        let render = RenderLoop::new(FrameBuffer::new(200, 100), store, controls.clone(), &config);
        (render, controls)
    }

    fn two_scenes() -> Arc<SceneStore> {
        let store = Arc::new(SceneStore::new());
        store.replace_all(vec![
            scene("A", vec![SceneObject::default(); 3]),
            scene("B", vec![dot((50.0, 50.0))]),
        ]);
        store
    }

    #[test]
    fn test_draws_current_scene() {
        let store = Arc::new(SceneStore::new());
        store.replace_all(vec![scene("Dot", vec![dot((100.0, 50.0))])]);
        let (mut render, _) = render_loop(store);

        assert_eq!(TickOutcome::Continue, render.tick());
        assert_eq!(Some("Dot"), render.active_scene());
        assert_eq!(Some(Rgb::RED), render.surface().pixel(100, 50));
        assert_eq!(Some(Rgb::BLACK), render.surface().pixel(10, 10));
        assert_eq!(1, render.stats().frames());
    }

    #[test]
    fn test_intensity_zero_draws_black() {
        let store = Arc::new(SceneStore::new());
        store.replace_all(vec![scene("Dot", vec![dot((100.0, 50.0))])]);
        let (mut render, controls) = render_loop(store);

        controls.store(ControlValues {
            intensity: 0,
            ..ControlValues::default()
        });
        render.tick();

        assert_eq!(0, render.surface().lit_pixels());
    }

    #[test]
    fn test_no_scene_renders_empty_frames() {
        let (mut render, _) = render_loop(Arc::new(SceneStore::new()));

        assert_eq!(TickOutcome::Continue, render.tick());
        assert_eq!(TickOutcome::Continue, render.tick());
        assert!(render.active_scene().is_none());
        assert_eq!(0, render.surface().lit_pixels());
        assert_eq!(2, render.stats().frames());
    }

    #[test]
    fn test_switching_scenes_reseeds_motion() {
        let store = two_scenes();
        let (mut render, _) = render_loop(store.clone());

        for _ in 0..5 {
            render.tick();
        }
        let before: Vec<f64> = render
            .motion_states()
            .iter()
            .map(|state| state.phase_clock().unwrap())
            .collect();

        store.set_current("B").unwrap();
        render.tick();
        assert_eq!(Some("B"), render.active_scene());

        store.set_current("A").unwrap();
        render.tick();
        let after: Vec<f64> = render
            .motion_states()
            .iter()
            .map(|state| state.phase_clock().unwrap())
            .collect();

        // Continuing would have put every clock two frames further along
        assert_eq!(3, after.len());
        let resumed = before
            .iter()
            .zip(&after)
            .all(|(old, new)| (old + 2.0 * FRAME_DELTA - new).abs() < 1e-9);
        assert!(!resumed, "motion resumed: {before:?} -> {after:?}");
    }

    #[test]
    fn test_switch_back_between_frames_still_reseeds() {
        let store = two_scenes();
        let (mut render, _) = render_loop(store.clone());
        render.tick();
        let before = render.motion_states().to_vec();

        store.set_current("B").unwrap();
        store.set_current("A").unwrap();
        render.tick();

        let continued: Vec<f64> = before
            .iter()
            .map(|state| state.phase_clock().unwrap() + FRAME_DELTA)
            .collect();
        let after: Vec<f64> = render
            .motion_states()
            .iter()
            .map(|state| state.phase_clock().unwrap())
            .collect();
        assert_ne!(continued, after);
    }

    #[test]
    fn test_editing_another_scene_keeps_motion() {
        let store = two_scenes();
        let (mut render, _) = render_loop(store.clone());
        render.tick();
        let before = render.motion_states().to_vec();

        store
            .update("B", |scene| {
                scene.objects.push(SceneObject::default());
                Ok(())
            })
            .unwrap();
        render.tick();

        for (old, new) in before.iter().zip(render.motion_states()) {
            let expected = old.phase_clock().unwrap() + FRAME_DELTA;
            assert!((expected - new.phase_clock().unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_broken_object_is_skipped_and_reported_once() {
        let store = Arc::new(SceneStore::new());
        let broken = SceneObject::Path(PathObject {
            waypoints: vec![(5.0, 5.0)],
            ..PathObject::default()
        });
        store.replace_all(vec![scene("Mixed", vec![broken, dot((100.0, 50.0))])]);
        let (mut render, _) = render_loop(store);

        for _ in 0..10 {
            assert_eq!(TickOutcome::Continue, render.tick());
        }

        assert_eq!(Some(Rgb::RED), render.surface().pixel(100, 50));
        assert_eq!(1, render.stats().object_errors());
        assert_eq!(10, render.stats().frames());
    }

    #[test]
    fn test_quit_ends_the_loop() {
        let store = two_scenes();
        let (render, _) = render_loop(store);
        let close = render.surface().close_handle();
        let stop = StopSignal::new();

        let thread = thread::spawn(move || render.run(stop.token()));
        thread::sleep(Duration::from_millis(50));
        close.close();

        let surface = thread.join().unwrap();
        assert!(surface.frames_presented() > 0);
    }

    #[test]
    fn test_stop_ends_the_loop() {
        let store = two_scenes();
        let (render, _) = render_loop(store);
        let stats = render.stats();
        let stop = StopSignal::new();
        let token = stop.token();

        let thread = thread::spawn(move || render.run(token));
        thread::sleep(Duration::from_millis(100));
        stop.stop();

        thread.join().unwrap();
        assert!(stats.frames() > 1);
    }
}

use std::{sync::Arc, time::Duration};

use log::{error, info, warn};
use tokio::{
    task::JoinHandle,
    time::{sleep, Instant},
};

use super::{scene_store::SceneStore, ControlError};
use crate::stop::{StopSignal, StopToken};

/// How often a dwell wakes up to check whether it should give up early.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cycles the current scene through every loaded scene, in insertion order,
/// dwelling `interval` on each.
pub struct PlaybackScheduler {
    store: Arc<SceneStore>,
    interval: Duration,
}

/// A running scheduler. Stop it with `stop`; it also exits on its own once
/// the engine token it was spawned with fires.
pub struct PlaybackHandle {
    interval_secs: u64,
    stop: StopSignal,
    task: JoinHandle<()>,
}

impl PlaybackScheduler {
    pub fn new(store: Arc<SceneStore>, interval_secs: u64) -> Result<Self, ControlError> {
        if interval_secs < 1 {
            return Err(ControlError::InvalidPlaybackInterval(interval_secs));
        }

        Ok(Self {
            store,
            interval: Duration::from_secs(interval_secs),
        })
    }

    pub fn spawn(self, engine: StopToken) -> PlaybackHandle {
        let interval_secs = self.interval.as_secs();
        let stop = StopSignal::new();
        let token = stop.token();
        let task = tokio::spawn(async move { self.run(token, engine).await });

        PlaybackHandle {
            interval_secs,
            stop,
            task,
        }
    }

    pub async fn run(self, mut stop: StopToken, mut engine: StopToken) {
        info!(
            "Playback: cycling scenes every {} seconds",
            self.interval.as_secs()
        );
        let mut next = 0;

        loop {
            // Scenes may be loaded, renamed or removed while we play, so the
            // order is read fresh every cycle
            let names = self.store.names();

            if let Some(name) = names.get(next % names.len().max(1)) {
                match self.store.set_current(name) {
                    Ok(()) => info!("Playing scene: {name}"),
                    Err(e) => warn!("Playback: {e}"),
                }
                next = (next % names.len()) + 1;

                if !self.dwell(self.interval, &mut stop, &mut engine).await {
                    break;
                }
            } else if !self.dwell(POLL_INTERVAL, &mut stop, &mut engine).await {
                break;
            }
        }

        info!("Playback: stopped");
    }

    /// Wait out `duration`, waking at least every `POLL_INTERVAL`. Returns
    /// `false` if either token fired first.
    async fn dwell(&self, duration: Duration, stop: &mut StopToken, engine: &mut StopToken) -> bool {
        let deadline = Instant::now() + duration;

        loop {
            if stop.is_stopped() || engine.is_stopped() {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            let nap = (deadline - now).min(POLL_INTERVAL);
            tokio::select! {
                _ = stop.stopped() => return false,
                _ = engine.stopped() => return false,
                _ = sleep(nap) => {}
            }
        }
    }
}

impl PlaybackHandle {
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn stop(self) {
        self.stop.stop();
        if let Err(e) = self.task.await {
            error!("Playback: scheduler task failed: {e}");
        }
    }
}

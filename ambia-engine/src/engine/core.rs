//! Core looping engine - lifecycle and orchestration
//!
//! The facade owns the shared state, the backend, the track registry, and
//! the configuration. `start_loop`, `stop_loop`, and `change_theme` are the
//! public lifecycle surface; the position monitor and crossfade scheduler
//! tasks re-enter the same shared state and re-validate it before every
//! mutation, because callback and timer ordering is not guaranteed.

use crate::backend::{AudioBackend, SlotHandle};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::{Track, TrackRegistry};
use crate::slot::SlotPair;
use crate::state::EngineShared;
use ambia_common::events::{AmbiaEvent, PlaybackState};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Point-in-time engine status for host UIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub playback: PlaybackState,
    pub theme_id: Option<String>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub loop_count: u64,
}

/// Looping ambient-audio engine.
///
/// Cheap to clone; clones share one engine instance. All lifecycle
/// operations are safe to call concurrently: teardown is serialized by a
/// guard flag, and late calls into released state degrade to no-ops.
#[derive(Clone)]
pub struct AmbienceEngine {
    pub(crate) shared: Arc<EngineShared>,
    pub(crate) backend: Arc<dyn AudioBackend>,
    registry: Arc<TrackRegistry>,
    pub(crate) config: Arc<EngineConfig>,
}

impl AmbienceEngine {
    /// Create an engine over an explicit backend.
    pub fn new(
        config: EngineConfig,
        registry: TrackRegistry,
        backend: Arc<dyn AudioBackend>,
    ) -> Self {
        let config = config.normalized();
        info!(
            "Creating ambience engine (crossfade={}ms, steps={}, poll={}ms)",
            config.crossfade_duration_ms, config.fade_steps, config.status_update_interval_ms
        );
        Self {
            shared: Arc::new(EngineShared::new(config.base_volume)),
            backend,
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Create an engine over the default rodio output.
    #[cfg(feature = "rodio-output")]
    pub fn with_default_output(config: EngineConfig, registry: TrackRegistry) -> Self {
        Self::new(
            config,
            registry,
            Arc::new(crate::backend::RodioOutput::new()),
        )
    }

    /// Subscribe to diagnostic events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<AmbiaEvent> {
        self.shared.subscribe_events()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.shared.playback().await
    }

    /// Completed crossfades since engine creation.
    pub fn loop_count(&self) -> u64 {
        self.shared.loop_count()
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Snapshot of playback state, theme, position, and loop count.
    pub async fn status(&self) -> EngineStatus {
        let playback = self.shared.playback().await;
        let theme_id = self.shared.current_track().await.map(|t| t.id);
        let (position_ms, duration_ms) = if playback == PlaybackState::Playing {
            let slots = self.shared.slots.read().await;
            match slots.as_ref() {
                Some(pair) => match self.backend.status(pair.active().handle()) {
                    Ok(status) => (status.position_ms, status.duration_ms),
                    Err(_) => (0, pair.duration_ms()),
                },
                None => (0, 0),
            }
        } else {
            (0, 0)
        };

        EngineStatus {
            playback,
            theme_id,
            position_ms,
            duration_ms,
            loop_count: self.shared.loop_count(),
        }
    }

    /// Start looping the given theme.
    ///
    /// The silence theme (and any id that does not resolve) stops playback
    /// and returns Ok. A call that lands while teardown is in flight is
    /// rejected with [`Error::Busy`] rather than queued. Starting while
    /// another theme is playing restarts cleanly (equivalent to
    /// `change_theme`).
    pub async fn start_loop(&self, theme_id: &str, base_volume: Option<f64>) -> Result<()> {
        let track = match self.registry.resolve(theme_id) {
            Some(track) => track,
            None => {
                warn!("Unknown theme '{}'; stopping playback", theme_id);
                return self.stop_loop().await;
            }
        };

        if track.is_silent() {
            debug!("Theme '{}' has no asset; ensuring stopped", theme_id);
            return self.stop_loop().await;
        }

        // Serialize starts; a concurrent stop can still interleave and is
        // re-validated at the commit points below.
        let _start_gate = self.shared.start_gate.lock().await;

        if self.shared.is_releasing() {
            return Err(Error::Busy(
                "teardown in progress; retry start_loop".to_string(),
            ));
        }

        if self.shared.playback().await != PlaybackState::Stopped {
            self.stop_loop().await?;
            if self.shared.is_releasing() {
                return Err(Error::Busy(
                    "teardown in progress; retry start_loop".to_string(),
                ));
            }
        }

        if let Some(volume) = base_volume {
            self.shared.set_base_volume(volume).await;
        }

        // Best-effort, idempotent platform audio setup. Playback is
        // attempted regardless of the outcome.
        if let Err(e) = self.backend.configure() {
            warn!("Audio session configuration failed (continuing): {}", e);
        }

        info!("Starting loop for theme '{}'", track.id);
        self.shared.set_playback(PlaybackState::Loading).await;
        self.shared.set_current_track(Some(track.clone())).await;

        match self.load_and_start(&track).await {
            Ok(duration_ms) => {
                // Re-validate: a teardown may have raced the load and
                // already released the freshly committed slots.
                if self.shared.is_releasing() || self.shared.slots.read().await.is_none() {
                    self.shared.set_playback(PlaybackState::Stopped).await;
                    self.shared.set_current_track(None).await;
                    return Err(Error::Busy("teardown interrupted start".to_string()));
                }
                self.shared.set_playback(PlaybackState::Playing).await;
                self.spawn_position_monitor();
                self.shared.emit(AmbiaEvent::LoopStarted {
                    theme_id: track.id.clone(),
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });
                info!("Loop started for '{}' ({}ms)", track.id, duration_ms);
                Ok(())
            }
            Err(e) => {
                self.shared.set_playback(PlaybackState::Stopped).await;
                self.shared.set_current_track(None).await;
                self.shared.emit(AmbiaEvent::EngineError {
                    kind: e.kind().to_string(),
                    detail: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Load both slots, prime them, and start the active one.
    ///
    /// Returns the track duration on success. Any partially loaded handle
    /// is released before the error propagates.
    async fn load_and_start(&self, track: &Track) -> Result<u64> {
        let Some(asset) = track.asset.clone() else {
            return Err(Error::Load(format!("Theme '{}' has no asset", track.id)));
        };

        // Both instances load concurrently; asset decode is blocking I/O.
        let backend_a = Arc::clone(&self.backend);
        let asset_a = asset.clone();
        let backend_b = Arc::clone(&self.backend);
        let asset_b = asset.clone();
        let (active_load, standby_load) = tokio::join!(
            tokio::task::spawn_blocking(move || backend_a.load(&asset_a)),
            tokio::task::spawn_blocking(move || backend_b.load(&asset_b)),
        );

        let active_load =
            active_load.map_err(|e| Error::Load(format!("Load task failed: {}", e)))?;
        let standby_load =
            standby_load.map_err(|e| Error::Load(format!("Load task failed: {}", e)))?;

        let (active_handle, standby_handle) = match (active_load, standby_load) {
            (Ok(a), Ok(s)) => (a, s),
            (Ok(a), Err(e)) => {
                self.backend.unload(a);
                return Err(e);
            }
            (Err(e), Ok(s)) => {
                self.backend.unload(s);
                return Err(e);
            }
            (Err(e), Err(_)) => return Err(e),
        };

        let base = self.shared.base_volume().await;
        let setup = || -> Result<SlotPair> {
            let duration_ms = self.backend.status(active_handle)?.duration_ms;
            let mut pair = SlotPair::new(active_handle, standby_handle, duration_ms);
            pair.active_mut().set_volume(self.backend.as_ref(), base)?;
            pair.standby_mut().set_volume(self.backend.as_ref(), 0.0)?;
            self.backend.set_position(standby_handle, 0)?;
            self.backend.play(active_handle)?;
            Ok(pair)
        };

        match setup() {
            Ok(pair) => {
                let duration_ms = pair.duration_ms();
                {
                    let mut slots = self.shared.slots.write().await;
                    // A teardown that began while the assets were loading
                    // owns the slot state; hand the fresh handles back
                    // instead of committing them behind its back.
                    if self.shared.is_releasing() {
                        drop(slots);
                        self.backend.unload(active_handle);
                        self.backend.unload(standby_handle);
                        return Err(Error::Busy("teardown began during load".to_string()));
                    }
                    *slots = Some(pair);
                }
                self.shared.bind_monitor(Some(active_handle)).await;
                Ok(duration_ms)
            }
            Err(e) => {
                self.backend.unload(active_handle);
                self.backend.unload(standby_handle);
                Err(Error::Load(e.to_string()))
            }
        }
    }

    /// Stop the loop and release both slots.
    ///
    /// Idempotent and race-safe: the releasing guard serializes teardown,
    /// and a second call that arrives while one is in flight is dropped as
    /// a no-op. Always leaves the engine Stopped with no slots, no
    /// crossfade session, and no pending step timers able to act.
    pub async fn stop_loop(&self) -> Result<()> {
        if !self.shared.begin_release() {
            debug!("Teardown already in progress; dropping duplicate stop request");
            return Ok(());
        }

        let prior = self.shared.playback().await;

        // Invalidate monitors and cancel any in-flight crossfade before
        // touching the slots, so late timers see the guards first.
        self.shared.advance_monitor_epoch();
        self.shared.bind_monitor(None).await;
        if let Some(session) = self.shared.crossfade.write().await.take() {
            session.cancel();
            debug!(
                "Cancelled crossfade at step {}/{}",
                session.step_index(),
                session.total_steps()
            );
        }

        self.shared.set_playback(PlaybackState::Stopped).await;

        if let Some(pair) = self.shared.slots.write().await.take() {
            pair.release(self.backend.as_ref());
        }
        self.shared.set_current_track(None).await;

        self.shared.end_release();

        if prior != PlaybackState::Stopped {
            self.shared.emit(AmbiaEvent::LoopStopped {
                timestamp: chrono::Utc::now(),
            });
            info!("Loop stopped");
        }
        Ok(())
    }

    /// Switch to a different theme: full stop, then a fresh start. No slot
    /// or crossfade state survives the switch.
    pub async fn change_theme(&self, theme_id: &str) -> Result<()> {
        info!("Changing theme to '{}'", theme_id);
        self.stop_loop().await?;
        self.start_loop(theme_id, None).await
    }

    /// Update the steady-state volume.
    ///
    /// Applies to the audible slot immediately unless a crossfade is
    /// running, in which case the scheduler owns slot volumes and the new
    /// base takes effect at the next fade.
    pub async fn set_base_volume(&self, volume: f64) -> Result<()> {
        self.shared.set_base_volume(volume).await;
        let base = self.shared.base_volume().await;

        if self.shared.crossfade.read().await.is_some() {
            debug!("Crossfade in progress; base volume {} applies next fade", base);
            return Ok(());
        }
        if self.shared.playback().await == PlaybackState::Playing {
            let mut slots = self.shared.slots.write().await;
            if let Some(pair) = slots.as_mut() {
                pair.active_mut().set_volume(self.backend.as_ref(), base)?;
            }
        }
        Ok(())
    }

    /// Tear down after a mid-stream backend failure.
    ///
    /// Failures that race an already-running teardown are expected and
    /// logged at debug only.
    pub(crate) async fn handle_playback_failure(&self, error: Error) {
        if self.shared.is_releasing() || self.shared.playback().await != PlaybackState::Playing {
            debug!("Ignoring backend failure during teardown: {}", error);
            return;
        }
        warn!("Playback failure, tearing down: {}", error);
        self.shared.emit(AmbiaEvent::EngineError {
            kind: error.kind().to_string(),
            detail: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
        let _ = self.stop_loop().await;
    }

    pub(crate) async fn active_handle(&self) -> Option<SlotHandle> {
        self.shared.slots.read().await.as_ref().map(|p| p.active().handle())
    }
}

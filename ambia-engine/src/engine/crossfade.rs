//! Crossfade scheduling
//!
//! Once the position monitor reports that the active slot has entered its
//! end-of-track window, the scheduler primes the standby slot at position 0
//! and volume 0, walks both volumes through N discrete linear steps, and
//! swaps the roles on the final step. Step timers are not trusted to fire
//! in order relative to teardown: every step independently re-checks the
//! cancellation flag, the releasing guard, and the playback state before
//! touching a slot, and aborts silently when any of them trips.

use super::AmbienceEngine;
use crate::error::Result;
use ambia_common::events::{AmbiaEvent, PlaybackState};
use ambia_common::{fade, timing};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// Crossfade session lifecycle.
///
/// `Idle` is the notional no-session state; a constructed session starts
/// in `Scheduled` and becomes `Running` when the first step fires. There
/// is no terminal variant: completion or cancellation clears the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossfadeState {
    #[default]
    Idle,
    Scheduled,
    Running,
}

/// One in-flight fade-and-swap. At most one exists per engine instance.
#[derive(Debug)]
pub struct CrossfadeSession {
    state: CrossfadeState,
    step_index: u32,
    total_steps: u32,
    step_duration_ms: u64,
    cancelled: Arc<AtomicBool>,
}

impl CrossfadeSession {
    fn new(total_steps: u32, step_duration_ms: u64) -> Self {
        Self {
            state: CrossfadeState::Scheduled,
            step_index: 0,
            total_steps,
            step_duration_ms,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> CrossfadeState {
        self.state
    }

    pub fn step_index(&self) -> u32 {
        self.step_index
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn step_duration_ms(&self) -> u64 {
        self.step_duration_ms
    }

    /// Mark the session cancelled; in-flight step timers observe the flag
    /// before their next mutation and abort silently.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn mark_running(&mut self) {
        self.state = CrossfadeState::Running;
    }

    fn set_step(&mut self, step: u32) {
        self.step_index = step;
    }
}

impl AmbienceEngine {
    /// Claim and start a crossfade if none is in flight.
    ///
    /// The session-existence check under the write lock is the sole
    /// protection against double-triggering when two position callbacks
    /// land inside the window back to back.
    pub(crate) async fn try_begin_crossfade(&self, position_ms: u64) {
        if self.shared.is_releasing() {
            return;
        }
        let Some(track) = self.shared.current_track().await else {
            return;
        };

        {
            let mut crossfade = self.shared.crossfade.write().await;
            if crossfade.is_some() {
                return;
            }
            if self.shared.playback().await != PlaybackState::Playing {
                return;
            }
            let duration_ms = match self.shared.slots.read().await.as_ref() {
                Some(pair) => pair.duration_ms(),
                None => return,
            };
            let window_ms =
                timing::fade_window_ms(duration_ms, self.config.crossfade_duration_ms);
            if window_ms == 0 {
                return;
            }

            let session = CrossfadeSession::new(
                self.config.fade_steps,
                fade::step_duration_ms(window_ms, self.config.fade_steps),
            );
            let cancelled = session.cancel_flag();
            *crossfade = Some(session);

            let engine = self.clone();
            tokio::spawn(async move {
                engine.run_crossfade(cancelled).await;
            });
        }

        info!("Crossfade triggered at {}ms", position_ms);
        self.shared.emit(AmbiaEvent::CrossfadeStarted {
            theme_id: track.id,
            position_ms,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Execute one fade-and-swap.
    async fn run_crossfade(self, cancelled: Arc<AtomicBool>) {
        let (standby_handle, total_steps, step_ms) = {
            let slots = self.shared.slots.read().await;
            let Some(pair) = slots.as_ref() else {
                debug!("Crossfade start found no slots; aborting");
                return;
            };
            let crossfade = self.shared.crossfade.read().await;
            let Some(session) = crossfade.as_ref() else {
                return;
            };
            (
                pair.standby().handle(),
                session.total_steps(),
                session.step_duration_ms(),
            )
        };
        let base = self.shared.base_volume().await;

        // Prime the incoming slot: rewound, silent, playing.
        let primed: Result<()> = self
            .backend
            .set_position(standby_handle, 0)
            .and_then(|_| self.backend.set_volume(standby_handle, 0.0))
            .and_then(|_| self.backend.play(standby_handle));
        if let Err(e) = primed {
            if self.shared.is_releasing() {
                debug!("Crossfade prime raced teardown: {}", e);
                return;
            }
            *self.shared.crossfade.write().await = None;
            self.handle_playback_failure(e).await;
            return;
        }

        {
            let mut crossfade = self.shared.crossfade.write().await;
            match crossfade.as_mut() {
                Some(session) => session.mark_running(),
                None => return,
            }
        }

        for step in 1..=total_steps {
            sleep(timing::ms_to_duration(step_ms)).await;

            // Each step re-validates independently; a timer that fires
            // after teardown began must do nothing.
            if cancelled.load(Ordering::Acquire) || self.shared.is_releasing() {
                debug!("Crossfade step {} skipped after cancellation", step);
                return;
            }
            if self.shared.playback().await != PlaybackState::Playing {
                debug!("Crossfade step {} skipped: playback no longer active", step);
                return;
            }

            let step_result: Result<()> = {
                let mut slots = self.shared.slots.write().await;
                let Some(pair) = slots.as_mut() else {
                    debug!("Crossfade step {} found no slots; aborting", step);
                    return;
                };

                let fading_out = fade::fade_out_level(base, step, total_steps);
                let fading_in = fade::fade_in_level(base, step, total_steps);
                let backend = self.backend.as_ref();
                let mut apply = || -> Result<()> {
                    pair.active_mut().set_volume(backend, fading_out)?;
                    pair.standby_mut().set_volume(backend, fading_in)?;
                    if step == total_steps {
                        pair.swap_roles();
                        let retired = pair.standby().handle();
                        backend.stop(retired)?;
                        pair.standby_mut().set_volume(backend, 0.0)?;
                    }
                    Ok(())
                };
                apply()
            };

            {
                let mut crossfade = self.shared.crossfade.write().await;
                if let Some(session) = crossfade.as_mut() {
                    session.set_step(step);
                }
            }

            if let Err(e) = step_result {
                if self.shared.is_releasing() {
                    debug!("Crossfade step {} raced teardown: {}", step, e);
                    return;
                }
                *self.shared.crossfade.write().await = None;
                self.handle_playback_failure(e).await;
                return;
            }

            debug!(
                "Crossfade step {}/{}: out={:.3} in={:.3}",
                step,
                total_steps,
                fade::fade_out_level(base, step, total_steps),
                fade::fade_in_level(base, step, total_steps)
            );

            if step == total_steps {
                // Re-subscribe the monitor to whichever slot now holds the
                // Active role; the old binding points at the retired slot.
                if let Some(handle) = self.active_handle().await {
                    self.shared.bind_monitor(Some(handle)).await;
                }
                *self.shared.crossfade.write().await = None;

                let loop_count = self.shared.increment_loop_count();
                let theme_id = self
                    .shared
                    .current_track()
                    .await
                    .map(|t| t.id)
                    .unwrap_or_default();
                info!("Crossfade complete; loop {} of '{}'", loop_count, theme_id);
                self.shared.emit(AmbiaEvent::CrossfadeCompleted {
                    theme_id,
                    loop_count,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }
}

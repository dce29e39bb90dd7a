//! Position monitoring for the active slot
//!
//! A background task polls the bound slot handle at the configured status
//! interval and decides when the crossfade window has been entered. The
//! binding is explicit: after a role swap the crossfade scheduler must
//! re-bind the monitor to the new active slot, because a handle captured
//! at subscribe time would keep pointing at the retired instance.

use super::AmbienceEngine;
use ambia_common::events::PlaybackState;
use ambia_common::timing;
use std::time::Duration;
use tokio::time::interval;
use tracing::debug;

impl AmbienceEngine {
    /// Start the position monitor for the current loop.
    ///
    /// The task owns the engine's monitor epoch; any later start or
    /// teardown advances the epoch, and a task that no longer owns the
    /// current epoch exits at its next tick. That keeps exactly one live
    /// monitor per loop without join-handle bookkeeping.
    pub(crate) fn spawn_position_monitor(&self) {
        let engine = self.clone();
        let epoch = engine.shared.advance_monitor_epoch();
        let interval_ms = engine.config.status_update_interval_ms;

        tokio::spawn(async move {
            let mut tick = interval(Duration::from_millis(interval_ms));
            debug!(
                "Position monitor started ({}ms interval, epoch {})",
                interval_ms, epoch
            );

            loop {
                tick.tick().await;

                if engine.shared.monitor_epoch() != epoch {
                    break;
                }

                let playback = engine.shared.playback().await;
                if playback == PlaybackState::Stopped {
                    break;
                }
                if playback != PlaybackState::Playing {
                    continue;
                }

                let Some(handle) = engine.shared.monitor_target().await else {
                    continue;
                };

                let status = match engine.backend.status(handle) {
                    Ok(status) => status,
                    Err(e) => {
                        if engine.shared.is_releasing() {
                            debug!("Status poll raced teardown: {}", e);
                            continue;
                        }
                        engine.handle_playback_failure(e).await;
                        break;
                    }
                };

                if !status.is_playing {
                    continue;
                }

                let window_ms = timing::fade_window_ms(
                    status.duration_ms,
                    engine.config.crossfade_duration_ms,
                );
                if timing::in_fade_window(
                    status.position_ms,
                    status.duration_ms,
                    window_ms,
                    engine.config.tolerance_ms,
                ) {
                    engine.try_begin_crossfade(status.position_ms).await;
                }
            }

            debug!("Position monitor stopped (epoch {})", epoch);
        });
    }
}

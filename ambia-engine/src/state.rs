//! Shared engine state
//!
//! One owned state struct per engine instance; there are no module-level
//! references or process-wide singletons. Position callbacks and crossfade
//! step timers both re-enter this state, and their ordering is not
//! guaranteed, so every mutation path re-validates the playback state, the
//! crossfade session, and the releasing guard before acting.

use crate::backend::SlotHandle;
use crate::engine::CrossfadeSession;
use crate::registry::Track;
use crate::slot::SlotPair;
use ambia_common::events::{AmbiaEvent, EventBus, PlaybackState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

/// Shared state accessible by the facade, the position monitor, and the
/// crossfade scheduler.
pub struct EngineShared {
    /// Current playback state
    playback: RwLock<PlaybackState>,

    /// The dual-buffer pair; `Some` iff loading or playing a non-silent theme
    pub(crate) slots: RwLock<Option<SlotPair>>,

    /// The in-flight crossfade; at most one per engine instance
    pub(crate) crossfade: RwLock<Option<CrossfadeSession>>,

    /// Re-entrancy guard serializing teardown. A second teardown request
    /// while this is set is dropped, not queued.
    releasing: AtomicBool,

    /// Completed crossfades since engine creation
    loop_count: AtomicU64,

    /// Handle the position monitor is currently subscribed to. Re-bound
    /// explicitly after every role swap.
    monitor_target: RwLock<Option<SlotHandle>>,

    /// Monitor generation; a monitor task exits once it no longer owns the
    /// current epoch, so a stale task can never outlive a theme change.
    monitor_epoch: AtomicU64,

    /// Steady-state volume applied to the audible slot
    base_volume: RwLock<f64>,

    /// Track currently looping (None when stopped)
    current_track: RwLock<Option<Track>>,

    /// Serializes concurrent start requests. Teardown does not take this
    /// lock: a stop must be able to land while a start is mid-load.
    pub(crate) start_gate: tokio::sync::Mutex<()>,

    /// Diagnostic event broadcaster
    events: EventBus,
}

impl EngineShared {
    pub fn new(base_volume: f64) -> Self {
        Self {
            playback: RwLock::new(PlaybackState::Stopped),
            slots: RwLock::new(None),
            crossfade: RwLock::new(None),
            releasing: AtomicBool::new(false),
            loop_count: AtomicU64::new(0),
            monitor_target: RwLock::new(None),
            monitor_epoch: AtomicU64::new(0),
            base_volume: RwLock::new(base_volume),
            current_track: RwLock::new(None),
            start_gate: tokio::sync::Mutex::new(()),
            events: EventBus::new(100),
        }
    }

    pub async fn playback(&self) -> PlaybackState {
        *self.playback.read().await
    }

    pub async fn set_playback(&self, state: PlaybackState) {
        *self.playback.write().await = state;
    }

    /// Claim the teardown critical section. Returns false when another
    /// teardown already holds it.
    pub fn begin_release(&self) -> bool {
        self.releasing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_release(&self) {
        self.releasing.store(false, Ordering::Release);
    }

    pub fn is_releasing(&self) -> bool {
        self.releasing.load(Ordering::Acquire)
    }

    /// Subscribe the position monitor to a slot handle (or unbind with None).
    pub async fn bind_monitor(&self, handle: Option<SlotHandle>) {
        *self.monitor_target.write().await = handle;
    }

    pub async fn monitor_target(&self) -> Option<SlotHandle> {
        *self.monitor_target.read().await
    }

    /// Invalidate all running monitor tasks and return the new epoch.
    pub fn advance_monitor_epoch(&self) -> u64 {
        self.monitor_epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn monitor_epoch(&self) -> u64 {
        self.monitor_epoch.load(Ordering::Acquire)
    }

    pub async fn base_volume(&self) -> f64 {
        *self.base_volume.read().await
    }

    pub async fn set_base_volume(&self, volume: f64) {
        *self.base_volume.write().await = volume.clamp(0.0, 1.0);
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.current_track.read().await.clone()
    }

    pub async fn set_current_track(&self, track: Option<Track>) {
        *self.current_track.write().await = track;
    }

    /// Record a completed crossfade; returns the new loop count.
    pub fn increment_loop_count(&self) -> u64 {
        self.loop_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count.load(Ordering::Relaxed)
    }

    /// Broadcast a diagnostic event; never blocks, drops when unobserved.
    pub fn emit(&self, event: AmbiaEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AmbiaEvent> {
        self.events.subscribe()
    }
}

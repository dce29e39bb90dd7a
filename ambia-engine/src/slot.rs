//! Player slots
//!
//! The engine owns exactly two loaded instances of the current track. One
//! holds the Active role (audible), the other Standby (primed at volume 0
//! and position 0). A crossfade exchanges the roles; the handles stay with
//! their slots, so after a swap every caller must address slots by role,
//! never by a handle captured earlier.

use crate::backend::{AudioBackend, SlotHandle};
use crate::error::Result;

/// Role tag for one slot of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Active,
    Standby,
}

impl std::fmt::Display for SlotRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotRole::Active => write!(f, "active"),
            SlotRole::Standby => write!(f, "standby"),
        }
    }
}

/// One loaded playback instance.
#[derive(Debug)]
pub struct PlayerSlot {
    role: SlotRole,
    handle: SlotHandle,
    volume: f64,
}

impl PlayerSlot {
    fn new(role: SlotRole, handle: SlotHandle) -> Self {
        Self {
            role,
            handle,
            volume: 0.0,
        }
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// Last volume applied through this slot.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, backend: &dyn AudioBackend, volume: f64) -> Result<()> {
        backend.set_volume(self.handle, volume)?;
        self.volume = volume;
        Ok(())
    }
}

/// The dual-buffer pair for the current track.
#[derive(Debug)]
pub struct SlotPair {
    active: PlayerSlot,
    standby: PlayerSlot,
    duration_ms: u64,
}

impl SlotPair {
    pub fn new(active_handle: SlotHandle, standby_handle: SlotHandle, duration_ms: u64) -> Self {
        Self {
            active: PlayerSlot::new(SlotRole::Active, active_handle),
            standby: PlayerSlot::new(SlotRole::Standby, standby_handle),
            duration_ms,
        }
    }

    pub fn active(&self) -> &PlayerSlot {
        &self.active
    }

    pub fn standby(&self) -> &PlayerSlot {
        &self.standby
    }

    pub fn active_mut(&mut self) -> &mut PlayerSlot {
        &mut self.active
    }

    pub fn standby_mut(&mut self) -> &mut PlayerSlot {
        &mut self.standby
    }

    /// Track duration captured at load time.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Exchange the Active and Standby roles.
    ///
    /// Handles travel with their slots; only the role tags are rewritten.
    pub fn swap_roles(&mut self) {
        std::mem::swap(&mut self.active, &mut self.standby);
        self.active.role = SlotRole::Active;
        self.standby.role = SlotRole::Standby;
    }

    /// Stop and unload both slots. Unload is idempotent at the backend, so
    /// a repeated release of the same handles is harmless.
    pub fn release(&self, backend: &dyn AudioBackend) {
        for slot in [&self.active, &self.standby] {
            if let Err(e) = backend.stop(slot.handle) {
                tracing::debug!("Stop of {} slot during release: {}", slot.role, e);
            }
            backend.unload(slot.handle);
        }
    }
}

//! Audio backend abstraction
//!
//! The engine never decodes or mixes audio itself; it drives an
//! `AudioBackend` through a small set of per-handle operations. Every
//! operation performs external I/O and is fallible per-call. Handles are
//! opaque and owned by exactly one player slot at a time.

use crate::error::Result;
use std::path::Path;

#[cfg(feature = "rodio-output")]
mod probe;
#[cfg(feature = "rodio-output")]
mod rodio_output;

#[cfg(feature = "rodio-output")]
pub use rodio_output::RodioOutput;

/// Opaque identifier for one loaded playback instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle(u64);

impl SlotHandle {
    /// Mint a handle from a backend-chosen id. Handles are meaningful only
    /// to the backend that issued them.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Point-in-time playback status for one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
}

/// Platform audio I/O operations.
///
/// Implementations must be safe to call from any task: the engine invokes
/// `load` through `spawn_blocking` (it may read and decode files) and the
/// remaining operations directly from async context, so they must not
/// block beyond brief internal locking.
pub trait AudioBackend: Send + Sync + 'static {
    /// Prepare the platform audio output. Idempotent; repeat calls are
    /// cheap no-ops. Callers log failures and attempt playback regardless.
    fn configure(&self) -> Result<()>;

    /// Load one playback instance of an asset. No built-in retry.
    fn load(&self, asset: &Path) -> Result<SlotHandle>;

    /// Begin or resume playback of a loaded handle.
    fn play(&self, handle: SlotHandle) -> Result<()>;

    /// Halt playback of a loaded handle. The handle stays loaded and can be
    /// repositioned and replayed.
    fn stop(&self, handle: SlotHandle) -> Result<()>;

    /// Set playback volume, 0.0-1.0.
    fn set_volume(&self, handle: SlotHandle, volume: f64) -> Result<()>;

    /// Reposition playback. The engine only ever rewinds to 0; backends may
    /// reject other positions.
    fn set_position(&self, handle: SlotHandle, position_ms: u64) -> Result<()>;

    /// Release a loaded handle. Idempotent: unloading an unknown or
    /// already-unloaded handle is a no-op, not an error.
    fn unload(&self, handle: SlotHandle);

    /// Current position/duration/playing snapshot for a loaded handle.
    fn status(&self, handle: SlotHandle) -> Result<SlotStatus>;
}

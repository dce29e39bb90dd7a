//! # Ambia Engine
//!
//! Seamless looping ambient-audio engine. Plays one background soundscape
//! continuously for the duration of a session by keeping two buffered
//! instances of the track and crossfading between them just before the end,
//! so the listener never hears a click, gap, or restart.
//!
//! The engine exposes an in-process API only. It does not decode audio
//! itself: all platform I/O goes through the [`backend::AudioBackend`]
//! seam, with a rodio implementation behind the default `rodio-output`
//! feature.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod slot;
pub mod state;

pub use backend::{AudioBackend, SlotHandle, SlotStatus};
pub use config::{ConfigFile, EngineConfig};
pub use engine::{AmbienceEngine, CrossfadeSession, CrossfadeState, EngineStatus};
pub use error::{Error, Result};
pub use registry::{Track, TrackEntry, TrackRegistry, SILENCE_THEME_ID};

#[cfg(feature = "rodio-output")]
pub use backend::RodioOutput;

// Re-export the shared event vocabulary for hosts
pub use ambia_common::events::{AmbiaEvent, EventBus, PlaybackState};

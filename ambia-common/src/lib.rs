//! # Ambia Common Library
//!
//! Shared code for the Ambia ambient-audio engine:
//! - Event types (AmbiaEvent enum) and the broadcast EventBus
//! - Linear fade level calculations for stepped crossfades
//! - Millisecond timing helpers

pub mod events;
pub mod fade;
pub mod timing;

pub use events::{AmbiaEvent, EventBus, PlaybackState};

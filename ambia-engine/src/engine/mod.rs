//! Looping engine module
//!
//! **Module structure:**
//! - `core.rs`: engine facade, lifecycle (start_loop, stop_loop,
//!   change_theme), teardown and failure handling
//! - `monitor.rs`: position monitor task and trigger predicate
//! - `crossfade.rs`: crossfade session state machine and the stepped
//!   fade-and-swap task

mod core;
mod crossfade;
mod monitor;

pub use self::core::{AmbienceEngine, EngineStatus};
pub use self::crossfade::{CrossfadeSession, CrossfadeState};

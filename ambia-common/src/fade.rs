//! Linear fade level calculations for stepped crossfades
//!
//! The engine masks a loop restart by running N discrete, simultaneous
//! volume steps: the outgoing slot walks down from the base volume while
//! the incoming slot walks up, so the pair sums to the base volume at
//! every step.

/// Volume for the incoming (fading-in) slot at a given step.
///
/// `step` runs 1..=total_steps; step == total_steps yields exactly `base`.
/// Out-of-range steps clamp rather than overshoot.
pub fn fade_in_level(base: f64, step: u32, total_steps: u32) -> f64 {
    if total_steps == 0 {
        return base;
    }
    let t = (step.min(total_steps) as f64) / (total_steps as f64);
    base * t
}

/// Volume for the outgoing (fading-out) slot at a given step.
///
/// `step` runs 1..=total_steps; step == total_steps yields exactly 0.0.
pub fn fade_out_level(base: f64, step: u32, total_steps: u32) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    let t = (step.min(total_steps) as f64) / (total_steps as f64);
    base * (1.0 - t)
}

/// Nominal delay between fade steps.
///
/// Integer division truncates; a sub-millisecond result is pinned to 1 ms
/// so step timers always make forward progress.
pub fn step_duration_ms(fade_window_ms: u64, total_steps: u32) -> u64 {
    if total_steps == 0 {
        return fade_window_ms.max(1);
    }
    (fade_window_ms / total_steps as u64).max(1)
}

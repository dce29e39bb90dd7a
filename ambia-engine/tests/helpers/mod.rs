//! Shared test scaffolding: a scripted audio backend
//!
//! Positions only move when the test moves them, so window entry and
//! crossfade triggering are fully deterministic regardless of scheduler
//! jitter. Every backend call is journaled for later assertion.

use ambia_engine::{AudioBackend, Error, Result, SlotHandle, SlotStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Opt-in log output for test debugging (RUST_LOG=debug cargo test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// One journaled backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Configure,
    Load(PathBuf),
    Play(SlotHandle),
    Stop(SlotHandle),
    SetVolume(SlotHandle, f64),
    SetPosition(SlotHandle, u64),
    Unload(SlotHandle),
}

#[derive(Debug, Clone)]
struct MockSlot {
    position_ms: u64,
    duration_ms: u64,
    playing: bool,
    volume: f64,
}

#[derive(Debug, Default)]
struct Inner {
    next_handle: u64,
    duration_ms: u64,
    slots: HashMap<SlotHandle, MockSlot>,
    ops: Vec<Op>,
    configure_calls: u32,
    fail_next_load: bool,
    fail_status: bool,
}

/// Deterministic in-memory `AudioBackend`.
pub struct ScriptedBackend {
    inner: Mutex<Inner>,
}

impl ScriptedBackend {
    /// All tracks loaded through this backend report `duration_ms`.
    pub fn new(duration_ms: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_handle: 0,
                duration_ms,
                ..Default::default()
            }),
        }
    }

    pub fn op_count(&self) -> usize {
        self.inner.lock().unwrap().ops.len()
    }

    pub fn configure_calls(&self) -> u32 {
        self.inner.lock().unwrap().configure_calls
    }

    pub fn loaded_handles(&self) -> Vec<SlotHandle> {
        let mut handles: Vec<_> = self.inner.lock().unwrap().slots.keys().copied().collect();
        handles.sort_by_key(|h| h.raw());
        handles
    }

    pub fn playing_handles(&self) -> Vec<SlotHandle> {
        let inner = self.inner.lock().unwrap();
        let mut handles: Vec<_> = inner
            .slots
            .iter()
            .filter(|(_, slot)| slot.playing)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort_by_key(|h| h.raw());
        handles
    }

    pub fn volume_of(&self, handle: SlotHandle) -> Option<f64> {
        self.inner.lock().unwrap().slots.get(&handle).map(|s| s.volume)
    }

    pub fn position_of(&self, handle: SlotHandle) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .get(&handle)
            .map(|s| s.position_ms)
    }

    /// Journaled volume values for one handle, in call order.
    pub fn volume_ops_for(&self, handle: SlotHandle) -> Vec<f64> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::SetVolume(h, v) if *h == handle => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Count of journaled events matching a predicate.
    pub fn count_ops(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.inner.lock().unwrap().ops.iter().filter(|op| pred(op)).count()
    }

    /// Move a handle's playback position (test-driven clock).
    pub fn drive_position(&self, handle: SlotHandle, position_ms: u64) {
        if let Some(slot) = self.inner.lock().unwrap().slots.get_mut(&handle) {
            slot.position_ms = position_ms;
        }
    }

    /// Force a handle to report not-playing without going through the engine.
    pub fn force_pause(&self, handle: SlotHandle) {
        if let Some(slot) = self.inner.lock().unwrap().slots.get_mut(&handle) {
            slot.playing = false;
        }
    }

    /// Make the next load call fail.
    pub fn fail_next_load(&self) {
        self.inner.lock().unwrap().fail_next_load = true;
    }

    /// Make all status calls fail until cleared.
    pub fn set_fail_status(&self, fail: bool) {
        self.inner.lock().unwrap().fail_status = fail;
    }
}

impl AudioBackend for ScriptedBackend {
    fn configure(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.configure_calls += 1;
        inner.ops.push(Op::Configure);
        Ok(())
    }

    fn load(&self, asset: &Path) -> Result<SlotHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::Load(asset.to_path_buf()));
        if inner.fail_next_load {
            inner.fail_next_load = false;
            return Err(Error::Load(format!("scripted failure for {}", asset.display())));
        }
        inner.next_handle += 1;
        let handle = SlotHandle::new(inner.next_handle);
        let duration_ms = inner.duration_ms;
        inner.slots.insert(
            handle,
            MockSlot {
                position_ms: 0,
                duration_ms,
                playing: false,
                volume: 0.0,
            },
        );
        Ok(handle)
    }

    fn play(&self, handle: SlotHandle) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::Play(handle));
        match inner.slots.get_mut(&handle) {
            Some(slot) => {
                slot.playing = true;
                Ok(())
            }
            None => Err(Error::Playback(format!("play: unknown handle {}", handle))),
        }
    }

    fn stop(&self, handle: SlotHandle) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::Stop(handle));
        match inner.slots.get_mut(&handle) {
            Some(slot) => {
                slot.playing = false;
                Ok(())
            }
            None => Err(Error::Playback(format!("stop: unknown handle {}", handle))),
        }
    }

    fn set_volume(&self, handle: SlotHandle, volume: f64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::SetVolume(handle, volume));
        match inner.slots.get_mut(&handle) {
            Some(slot) => {
                slot.volume = volume;
                Ok(())
            }
            None => Err(Error::Playback(format!(
                "set_volume: unknown handle {}",
                handle
            ))),
        }
    }

    fn set_position(&self, handle: SlotHandle, position_ms: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::SetPosition(handle, position_ms));
        match inner.slots.get_mut(&handle) {
            Some(slot) => {
                slot.position_ms = position_ms;
                Ok(())
            }
            None => Err(Error::Playback(format!(
                "set_position: unknown handle {}",
                handle
            ))),
        }
    }

    fn unload(&self, handle: SlotHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(Op::Unload(handle));
        inner.slots.remove(&handle);
    }

    fn status(&self, handle: SlotHandle) -> Result<SlotStatus> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_status {
            return Err(Error::Playback("scripted status failure".to_string()));
        }
        inner
            .slots
            .get(&handle)
            .map(|slot| SlotStatus {
                position_ms: slot.position_ms,
                duration_ms: slot.duration_ms,
                is_playing: slot.playing,
            })
            .ok_or_else(|| Error::Playback(format!("status: unknown handle {}", handle)))
    }
}

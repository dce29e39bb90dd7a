//! rodio-backed audio output
//!
//! The platform output stream is opened once on a dedicated keepalive
//! thread (the stream handle is not `Send`, and must stay alive for audio
//! to flow); the mixer handle it hands back is cheap to clone and safe to
//! use from any thread. Each loaded slot owns a paused `Sink` plus a
//! buffered copy of the decoded source, so a slot that has been stopped or
//! has played out can be rewound to 0 by re-queueing the source.

use super::probe;
use super::{AudioBackend, SlotHandle, SlotStatus};
use crate::error::{Error, Result};
use ambia_common::timing::duration_to_ms;
use rodio::source::Source;
use rodio::{Decoder, OutputStreamBuilder, Sink};
use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;
use tracing::{debug, info};

type BufferedSource = rodio::source::Buffered<Decoder<BufReader<std::fs::File>>>;

struct LoadedSlot {
    sink: Sink,
    source: BufferedSource,
    duration_ms: u64,
}

struct OutputState {
    mixer: Option<rodio::mixer::Mixer>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    slots: HashMap<SlotHandle, LoadedSlot>,
}

/// Default `AudioBackend` over rodio.
pub struct RodioOutput {
    state: Mutex<OutputState>,
    next_handle: AtomicU64,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OutputState {
                mixer: None,
                shutdown_tx: None,
                slots: HashMap::new(),
            }),
            next_handle: AtomicU64::new(1),
        }
    }

    fn with_slot<T>(
        &self,
        handle: SlotHandle,
        op: &str,
        f: impl FnOnce(&LoadedSlot) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.lock().unwrap();
        let slot = state
            .slots
            .get(&handle)
            .ok_or_else(|| Error::Playback(format!("{}: unknown handle {}", op, handle)))?;
        f(slot)
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioOutput {
    fn configure(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.mixer.is_some() {
            debug!("Audio output already configured");
            return Ok(());
        }

        let (mixer_tx, mixer_rx) = mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        // The OutputStream must outlive all playback, so a dedicated thread
        // owns it and blocks until the backend is dropped.
        thread::Builder::new()
            .name("ambia-audio-output".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = mixer_tx.send(Err(format!("{}", e)));
                        return;
                    }
                };
                let _ = mixer_tx.send(Ok(stream.mixer().clone()));
                // Keep the stream alive until shutdown
                let _ = shutdown_rx.recv();
                debug!("Audio output thread shutting down");
            })
            .map_err(|e| Error::AudioSession(format!("Failed to spawn output thread: {}", e)))?;

        let mixer = mixer_rx
            .recv()
            .map_err(|_| Error::AudioSession("Output thread exited before reporting".to_string()))?
            .map_err(|e| Error::AudioSession(format!("Failed to open output stream: {}", e)))?;

        state.mixer = Some(mixer);
        state.shutdown_tx = Some(shutdown_tx);
        info!("Audio output configured");
        Ok(())
    }

    fn load(&self, asset: &Path) -> Result<SlotHandle> {
        let mixer = {
            let state = self.state.lock().unwrap();
            state
                .mixer
                .clone()
                .ok_or_else(|| Error::Load("Audio output not configured".to_string()))?
        };

        let file = std::fs::File::open(asset)
            .map_err(|e| Error::Load(format!("Failed to open {}: {}", asset.display(), e)))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| Error::Load(format!("Failed to decode {}: {}", asset.display(), e)))?;

        let source = decoder.buffered();
        let duration_ms = match source.total_duration() {
            Some(duration) => duration_to_ms(duration),
            None => probe::track_duration_ms(asset)?,
        };

        let sink = Sink::connect_new(&mixer);
        sink.pause();
        sink.set_volume(0.0);
        sink.append(source.clone());

        let handle = SlotHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.state.lock().unwrap().slots.insert(
            handle,
            LoadedSlot {
                sink,
                source,
                duration_ms,
            },
        );

        info!(
            "Loaded {} as {} ({}ms)",
            asset.display(),
            handle,
            duration_ms
        );
        Ok(handle)
    }

    fn play(&self, handle: SlotHandle) -> Result<()> {
        self.with_slot(handle, "play", |slot| {
            slot.sink.play();
            Ok(())
        })
    }

    fn stop(&self, handle: SlotHandle) -> Result<()> {
        self.with_slot(handle, "stop", |slot| {
            slot.sink.pause();
            Ok(())
        })
    }

    fn set_volume(&self, handle: SlotHandle, volume: f64) -> Result<()> {
        self.with_slot(handle, "set_volume", |slot| {
            slot.sink.set_volume(volume.clamp(0.0, 1.0) as f32);
            Ok(())
        })
    }

    fn set_position(&self, handle: SlotHandle, position_ms: u64) -> Result<()> {
        self.with_slot(handle, "set_position", |slot| {
            if position_ms == 0 {
                // Rewind by re-queueing the buffered source; try_seek is not
                // reliable across all decoders for backward seeks.
                let was_paused = slot.sink.is_paused();
                slot.sink.clear();
                slot.sink.append(slot.source.clone());
                if !was_paused {
                    slot.sink.play();
                }
                return Ok(());
            }
            slot.sink
                .try_seek(std::time::Duration::from_millis(position_ms))
                .map_err(|e| Error::Playback(format!("Seek to {}ms failed: {}", position_ms, e)))
        })
    }

    fn unload(&self, handle: SlotHandle) {
        let mut state = self.state.lock().unwrap();
        match state.slots.remove(&handle) {
            Some(slot) => {
                slot.sink.stop();
                debug!("Unloaded {}", handle);
            }
            None => {
                debug!("Unload of unknown handle {} ignored", handle);
            }
        }
    }

    fn status(&self, handle: SlotHandle) -> Result<SlotStatus> {
        self.with_slot(handle, "status", |slot| {
            Ok(SlotStatus {
                position_ms: duration_to_ms(slot.sink.get_pos()),
                duration_ms: slot.duration_ms,
                is_playing: !slot.sink.is_paused() && !slot.sink.empty(),
            })
        })
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.slots.clear();
        // Dropping the sender unblocks the keepalive thread
        if let Some(tx) = state.shutdown_tx.take() {
            drop(tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unload_unknown_handle_is_noop() {
        let output = RodioOutput::new();
        // Must not panic or error
        output.unload(SlotHandle(42));
    }

    #[test]
    fn test_ops_on_unknown_handle_fail() {
        let output = RodioOutput::new();
        assert!(output.play(SlotHandle(1)).is_err());
        assert!(output.status(SlotHandle(1)).is_err());
    }

    #[test]
    fn test_load_without_configure_fails() {
        let output = RodioOutput::new();
        let err = output.load(Path::new("/nonexistent.ogg")).unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }
}

//! Asset duration probing using symphonia
//!
//! rodio's decoder cannot always report a total duration (notably for some
//! MP3 and Vorbis streams), but the crossfade window calculation needs one
//! before playback starts. This probe reads only the container metadata.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Probe an audio file for its total duration in milliseconds.
pub fn track_duration_ms(path: &Path) -> Result<u64> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Load(format!("Failed to open {}: {}", path.display(), e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Load(format!("Failed to probe format: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Load(format!("No audio track in {}", path.display())))?;

    let params = &track.codec_params;
    let n_frames = params
        .n_frames
        .ok_or_else(|| Error::Load(format!("Unknown track length in {}", path.display())))?;

    let duration_ms = if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(n_frames);
        time.seconds * 1000 + (time.frac * 1000.0) as u64
    } else if let Some(sample_rate) = params.sample_rate {
        n_frames * 1000 / sample_rate as u64
    } else {
        return Err(Error::Load(format!(
            "Cannot derive duration for {}",
            path.display()
        )));
    };

    debug!("Probed {}: {}ms", path.display(), duration_ms);
    Ok(duration_ms)
}

//! In-memory PCM clips and WAV loading.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::error::AssetError;

/// Output format of every voice: signed 16-bit little-endian mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
}

impl PcmFormat {
    pub const CHANNELS: u16 = 1;
    pub const BYTES_PER_SAMPLE: usize = 2;

    pub fn new(sample_rate: u32) -> Self {
        PcmFormat { sample_rate }
    }

    /// Bytes per frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        Self::BYTES_PER_SAMPLE * Self::CHANNELS as usize
    }

    /// Byte count covering `millis` of audio, rounded down to whole frames.
    pub fn bytes_for_millis(&self, millis: u32) -> usize {
        let frames = self.sample_rate as usize * millis as usize / 1000;
        frames * self.frame_size()
    }

    /// Duration in milliseconds of `bytes` of audio.
    pub fn millis_for_bytes(&self, bytes: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (bytes / self.frame_size()) as u64 * 1000 / self.sample_rate as u64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        PcmFormat::new(22050)
    }
}

/// A decoded clip, cheap to clone and share between voices.
#[derive(Debug, Clone)]
pub struct Sound {
    samples: Arc<[u8]>,
}

impl Sound {
    pub fn from_bytes(samples: Vec<u8>) -> Self {
        Sound {
            samples: Arc::from(samples),
        }
    }

    pub fn from_samples(samples: &[i16]) -> Self {
        let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::from_bytes(bytes)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn shared_samples(&self) -> Arc<[u8]> {
        Arc::clone(&self.samples)
    }

    pub fn len_bytes(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fresh reader positioned at the start of the clip.
    pub fn reader(&self) -> Cursor<Arc<[u8]>> {
        Cursor::new(self.shared_samples())
    }

    /// Loads a WAV file and converts it to `format`.
    ///
    /// Integer PCM up to 16 bits is accepted. Multi-channel files are
    /// averaged down to mono and the sample rate is converted linearly.
    pub fn load_wav(path: &Path, format: PcmFormat) -> Result<Sound, AssetError> {
        if !path.exists() {
            return Err(AssetError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let unsupported = |reason: String| AssetError::UnsupportedSound {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => AssetError::Io(io),
            other => unsupported(other.to_string()),
        })?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample > 16 {
            return Err(unsupported(format!(
                "{:?} {}-bit samples",
                spec.sample_format, spec.bits_per_sample
            )));
        }
        let channels = spec.channels.max(1) as usize;

        let interleaved = reader
            .samples::<i16>()
            .collect::<Result<Vec<i16>, _>>()
            .map_err(|e| unsupported(e.to_string()))?;

        // 8-bit samples come back in the -128..127 range
        let scale: i32 = if spec.bits_per_sample <= 8 { 256 } else { 1 };
        let mono: Vec<i16> = interleaved
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|s| *s as i32 * scale).sum();
                (sum / frame.len() as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
            })
            .collect();

        let converted = resample_linear(&mono, spec.sample_rate, format.sample_rate);
        debug!(
            "Loaded {} ({} Hz, {} ch) as {} samples at {} Hz",
            path.display(),
            spec.sample_rate,
            spec.channels,
            converted.len(),
            format.sample_rate
        );
        Ok(Sound::from_samples(&converted))
    }
}

/// Linear-interpolation sample rate conversion.
pub fn resample_linear(input: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || input.is_empty() || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }
    let out_len = (input.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = input[idx.min(input.len() - 1)] as f64;
            let b = input[(idx + 1).min(input.len() - 1)] as f64;
            (a + (b - a) * frac).round() as i16
        })
        .collect()
}

//! Output devices for the voice pool.
//!
//! A voice opens one [`OutputLine`] on its own thread and writes PCM to it
//! with blocking calls, so the device's consumption rate paces playback.
//!
//! - [`CpalDevice`] plays through the default host output, converting mono
//!   16-bit PCM to the device rate and channel count
//! - [`NullDevice`] discards audio at real-time speed (muted runs, no hardware)

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};

use super::sound::PcmFormat;
use crate::error::AudioError;

/// Upper bound on how long `drain` waits for queued audio to play out.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Poll interval while waiting for ring buffer space.
const WRITE_POLL: Duration = Duration::from_millis(2);

/// Source of output lines, shared by all voice threads.
pub trait AudioDevice: Send + Sync {
    /// How many simultaneous lines the device supports, if it knows.
    fn max_lines(&self) -> Option<usize>;

    /// Opens a line that buffers roughly `buffer_bytes` of `format` audio.
    fn open_line(
        &self,
        format: PcmFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn OutputLine>, AudioError>;
}

/// One playback channel owned by a single thread.
pub trait OutputLine {
    /// Writes all of `bytes`, blocking until the device has room.
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError>;

    /// Waits for queued audio to finish playing.
    fn drain(&mut self) {}
}

/// Device that accepts and drops audio, sleeping for its playback duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDevice;

struct NullLine {
    format: PcmFormat,
}

impl AudioDevice for NullDevice {
    fn max_lines(&self) -> Option<usize> {
        None
    }

    fn open_line(
        &self,
        format: PcmFormat,
        _buffer_bytes: usize,
    ) -> Result<Box<dyn OutputLine>, AudioError> {
        Ok(Box::new(NullLine { format }))
    }
}

impl OutputLine for NullLine {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
        thread::sleep(Duration::from_millis(self.format.millis_for_bytes(bytes.len())));
        Ok(())
    }
}

/// Default output of the system audio host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDevice;

impl CpalDevice {
    /// Checks that an output device exists before the pool starts threads.
    pub fn probe() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        info!(
            "Audio output: {} channels, {} Hz",
            config.channels(),
            config.sample_rate().0
        );
        Ok(CpalDevice)
    }
}

impl AudioDevice for CpalDevice {
    fn max_lines(&self) -> Option<usize> {
        None
    }

    fn open_line(
        &self,
        format: PcmFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn OutputLine>, AudioError> {
        CpalLine::open(format, buffer_bytes).map(|line| Box::new(line) as Box<dyn OutputLine>)
    }
}

/// A cpal output stream fed through a ring buffer.
struct CpalLine {
    producer: ringbuf::HeapProd<f32>,
    _stream: cpal::Stream,
    channels: usize,
    /// Source samples consumed per device frame.
    step: f64,
    /// Fractional read position carried between writes.
    phase: f64,
    scratch: Vec<f32>,
}

impl CpalLine {
    fn open(format: PcmFormat, buffer_bytes: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::LineUnavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::LineUnavailable(e.to_string()))?;

        let device_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let buffer_ms = format.millis_for_bytes(buffer_bytes).max(10);
        let capacity = (device_rate as u64 * buffer_ms / 1000) as usize * channels;

        let ring = HeapRb::<f32>::new(capacity.max(channels));
        let (producer, mut consumer) = ring.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let config: cpal::StreamConfig = config.into();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let n = consumer.pop_slice(data);
                            data[n..].fill(0.0);
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| AudioError::LineUnavailable(e.to_string()))?
            }
            cpal::SampleFormat::I16 => {
                let config: cpal::StreamConfig = config.into();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            for sample in data.iter_mut() {
                                let f = consumer.try_pop().unwrap_or(0.0);
                                *sample = (f * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            }
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| AudioError::LineUnavailable(e.to_string()))?
            }
            cpal::SampleFormat::U16 => {
                let config: cpal::StreamConfig = config.into();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                            for sample in data.iter_mut() {
                                let f = consumer.try_pop().unwrap_or(0.0);
                                *sample = (f * 32767.0 + 32768.0).clamp(0.0, 65535.0) as u16;
                            }
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| AudioError::LineUnavailable(e.to_string()))?
            }
            other => {
                return Err(AudioError::LineUnavailable(format!(
                    "unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::LineUnavailable(e.to_string()))?;
        debug!(
            "Opened output line: {} Hz -> {} Hz, {} channels, {} samples buffered",
            format.sample_rate, device_rate, channels, capacity
        );

        Ok(CpalLine {
            producer,
            _stream: stream,
            channels,
            step: format.sample_rate as f64 / device_rate as f64,
            phase: 0.0,
            scratch: Vec::new(),
        })
    }

    /// Expands mono 16-bit PCM to interleaved device frames in `scratch`.
    fn convert(&mut self, bytes: &[u8]) {
        self.scratch.clear();
        let source: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        while (self.phase as usize) < source.len() {
            let s = source[self.phase as usize];
            for _ in 0..self.channels {
                self.scratch.push(s);
            }
            self.phase += self.step;
        }
        self.phase -= source.len() as f64;
    }
}

impl OutputLine for CpalLine {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
        self.convert(bytes);
        let mut pushed = 0;
        while pushed < self.scratch.len() {
            pushed += self.producer.push_slice(&self.scratch[pushed..]);
            if pushed < self.scratch.len() {
                thread::sleep(WRITE_POLL);
            }
        }
        Ok(())
    }

    fn drain(&mut self) {
        let start = Instant::now();
        while self.producer.occupied_len() > 0 && start.elapsed() < DRAIN_TIMEOUT {
            thread::sleep(WRITE_POLL);
        }
    }
}

//! Fixed pool of voice threads.
//!
//! Each worker opens one output line when it starts and keeps it for its
//! whole life. Play requests are queued on a bounded channel and picked up
//! by whichever worker is idle; a worker streams its source to the line
//! buffer by buffer until the source ends, then takes the next request.
//!
//! Pausing blocks every worker between buffers. Closing abandons queued
//! requests and stops running ones at the next buffer boundary; joining
//! lets the queue drain first.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, unbounded};
use log::{debug, error, info, warn};

use super::device::{AudioDevice, OutputLine};
use super::filter::SoundFilter;
use super::sound::{PcmFormat, Sound};
use super::stream::{FilteredSoundStream, LoopHandle, LoopingSource};
use crate::error::AudioError;

/// Voices used when the device cannot report a line count.
pub const DEFAULT_VOICES: usize = 16;

/// Queued requests allowed per voice before new ones are dropped.
const QUEUE_PER_VOICE: usize = 4;

type Job = Box<dyn Read + Send>;

struct Shared {
    paused: Mutex<bool>,
    resume: Condvar,
    stopping: AtomicBool,
}

impl Shared {
    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Blocks while paused. Returns false if the pool is stopping.
    fn wait_while_paused(&self) -> bool {
        let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        while *paused && !self.is_stopping() {
            paused = self
                .resume
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !self.is_stopping()
    }
}

/// Drains and releases the line when the worker exits, panicking or not.
struct LineGuard(Box<dyn OutputLine>);

impl Drop for LineGuard {
    fn drop(&mut self) {
        self.0.drain();
    }
}

/// Reports the worker index on exit so `close` can join without blocking forever.
struct ExitSignal(Sender<usize>, usize);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.send(self.1);
    }
}

/// Pool of threads that each play one sound at a time.
pub struct VoicePool {
    tx: Option<Sender<Job>>,
    /// Kept so `close` can discard requests nobody picked up.
    rx: Receiver<Job>,
    shared: Arc<Shared>,
    workers: Vec<Option<JoinHandle<()>>>,
    exited: Receiver<usize>,
    format: PcmFormat,
}

impl VoicePool {
    /// Starts `voices` workers (or the device's line count, or [`DEFAULT_VOICES`]
    /// when `voices` is 0). Each worker uses a line buffer of `buffer_ms`.
    pub fn new(
        device: Arc<dyn AudioDevice>,
        format: PcmFormat,
        voices: usize,
        buffer_ms: u32,
    ) -> Self {
        let size = if voices > 0 {
            voices
        } else {
            device.max_lines().unwrap_or(DEFAULT_VOICES).max(1)
        };
        let buffer_bytes = format.bytes_for_millis(buffer_ms).max(format.frame_size());

        let (tx, rx) = bounded::<Job>(size * QUEUE_PER_VOICE);
        let (exit_tx, exited) = unbounded();
        let shared = Arc::new(Shared {
            paused: Mutex::new(false),
            resume: Condvar::new(),
            stopping: AtomicBool::new(false),
        });

        let workers = (0..size)
            .map(|id| {
                let rx = rx.clone();
                let shared = Arc::clone(&shared);
                let device = Arc::clone(&device);
                let exit_tx = exit_tx.clone();
                thread::Builder::new()
                    .name(format!("voice-{id}"))
                    .spawn(move || {
                        let _signal = ExitSignal(exit_tx, id);
                        voice_worker(id, rx, shared, device, format, buffer_bytes);
                    })
                    .map_err(|e| error!("Failed to spawn voice {}: {}", id, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        info!(
            "Voice pool started: {} voices, {} byte buffers",
            workers.iter().flatten().count(),
            buffer_bytes
        );

        VoicePool {
            tx: Some(tx),
            rx,
            shared,
            workers,
            exited,
            format,
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn voices(&self) -> usize {
        self.workers.len()
    }

    /// Queues any PCM source. Never blocks.
    pub fn submit(&self, source: impl Read + Send + 'static) -> Result<(), AudioError> {
        let tx = self.tx.as_ref().ok_or(AudioError::PoolClosed)?;
        tx.try_send(Box::new(source)).map_err(|e| match e {
            TrySendError::Full(_) => AudioError::QueueFull,
            TrySendError::Disconnected(_) => AudioError::PoolClosed,
        })
    }

    pub fn play(&self, sound: &Sound) -> Result<(), AudioError> {
        self.submit(sound.reader())
    }

    pub fn play_filtered(
        &self,
        sound: &Sound,
        filter: impl SoundFilter + 'static,
    ) -> Result<(), AudioError> {
        self.submit(FilteredSoundStream::new(sound.reader(), filter))
    }

    /// Plays `sound` repeatedly until the returned handle is stopped.
    pub fn play_looped(&self, sound: &Sound) -> Result<LoopHandle, AudioError> {
        let source = LoopingSource::new(sound.shared_samples());
        let handle = source.handle();
        self.submit(source)?;
        Ok(handle)
    }

    pub fn set_paused(&self, paused: bool) {
        let mut guard = self
            .shared
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = paused;
        self.shared.resume.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self
            .shared
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// Stops accepting requests, lets queued and playing sounds finish,
    /// then joins every worker.
    pub fn join(&mut self) {
        self.tx = None;
        self.set_paused(false);
        for handle in self.workers.iter_mut().filter_map(Option::take) {
            if handle.join().is_err() {
                warn!("Voice thread panicked during join");
            }
        }
    }

    /// Abandons queued requests, interrupts playing ones and waits up to
    /// `timeout` for the workers. Returns false if some worker was still
    /// busy when the time ran out; those threads are left detached.
    pub fn close(&mut self, timeout: Duration) -> bool {
        if self.tx.is_none() && self.workers.iter().all(Option::is_none) {
            return true;
        }
        self.tx = None;
        self.shared.stopping.store(true, Ordering::Release);
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            debug!("Discarded {} queued sounds on close", dropped);
        }
        self.set_paused(false);

        let deadline = Instant::now() + timeout;
        while self.workers.iter().any(Option::is_some) {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.exited.recv_timeout(left) {
                Ok(id) => {
                    if let Some(handle) = self.workers.get_mut(id).and_then(Option::take) {
                        let _ = handle.join();
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let stuck = self.workers.iter_mut().filter_map(Option::take).count();
        if stuck > 0 {
            warn!("{} voice threads did not stop in time", stuck);
            return false;
        }
        true
    }
}

impl Drop for VoicePool {
    fn drop(&mut self) {
        self.close(Duration::from_secs(1));
    }
}

fn voice_worker(
    id: usize,
    rx: Receiver<Job>,
    shared: Arc<Shared>,
    device: Arc<dyn AudioDevice>,
    format: PcmFormat,
    buffer_bytes: usize,
) {
    let mut line = match device.open_line(format, buffer_bytes) {
        Ok(line) => LineGuard(line),
        Err(e) => {
            warn!("Voice {} disabled: {}", id, e);
            return;
        }
    };
    let mut buffer = vec![0u8; buffer_bytes];

    while let Ok(mut job) = rx.recv() {
        if shared.is_stopping() {
            break;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            play_source(&mut *job, line.0.as_mut(), &mut buffer, &shared)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Voice {}: {}", id, e),
            Err(_) => error!("Voice {}: sound source panicked", id),
        }
    }
    debug!("Voice {} exiting", id);
}

fn play_source(
    source: &mut dyn Read,
    line: &mut dyn OutputLine,
    buffer: &mut [u8],
    shared: &Shared,
) -> Result<(), String> {
    loop {
        if !shared.wait_while_paused() {
            return Ok(());
        }
        let n = source.read(buffer).map_err(|e| e.to_string())?;
        if n == 0 {
            return Ok(());
        }
        line.write(&buffer[..n]).map_err(|e| e.to_string())?;
    }
}

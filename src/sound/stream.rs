//! Readers that feed PCM bytes to a voice.
//!
//! - [`FilteredSoundStream`] runs every chunk through a [`SoundFilter`] and
//!   appends the filter's tail once the source is exhausted
//! - [`LoopingSource`] repeats a sample buffer until its [`LoopHandle`] stops it

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::filter::SoundFilter;

/// Wraps a reader and filters whatever it yields.
///
/// After the inner reader reports end of stream, the stream keeps emitting
/// zero bytes pushed through the filter until `remaining_size()` bytes
/// (rounded down to a multiple of 4) have been produced. Only then does it
/// report end of stream itself.
pub struct FilteredSoundStream<R, F> {
    inner: R,
    filter: F,
    remaining: Option<usize>,
}

impl<R: Read, F: SoundFilter> FilteredSoundStream<R, F> {
    pub fn new(inner: R, filter: F) -> Self {
        FilteredSoundStream {
            inner,
            filter,
            remaining: None,
        }
    }

    pub fn into_inner(self) -> (R, F) {
        (self.inner, self.filter)
    }
}

impl<R: Read, F: SoundFilter> Read for FilteredSoundStream<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.remaining.is_none() {
            let n = self.inner.read(buf)?;
            if n > 0 {
                self.filter.filter(&mut buf[..n]);
                return Ok(n);
            }
            self.remaining = Some(self.filter.remaining_size() / 4 * 4);
        }

        let remaining = self.remaining.unwrap_or(0);
        if remaining == 0 {
            return Ok(0);
        }
        let len = remaining.min(buf.len());
        let tail = &mut buf[..len];
        tail.fill(0);
        self.filter.filter(tail);
        self.remaining = Some(remaining - len);
        Ok(len)
    }
}

/// Stops a [`LoopingSource`] from another thread.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Replays a sample buffer from the start each time it runs out.
pub struct LoopingSource {
    data: Arc<[u8]>,
    pos: usize,
    handle: LoopHandle,
}

impl LoopingSource {
    pub fn new(data: Arc<[u8]>) -> Self {
        LoopingSource {
            data,
            pos: 0,
            handle: LoopHandle::default(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }
}

impl Read for LoopingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.handle.is_stopped() || self.data.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        while written < buf.len() {
            let chunk = (self.data.len() - self.pos).min(buf.len() - written);
            buf[written..written + chunk].copy_from_slice(&self.data[self.pos..self.pos + chunk]);
            written += chunk;
            self.pos += chunk;
            if self.pos == self.data.len() {
                self.pos = 0;
            }
        }
        Ok(written)
    }
}

//! Sampled sound playback.
//!
//! Clips are decoded once into 16-bit mono PCM ([`sound::Sound`]) and played
//! through a fixed pool of voice threads ([`pool::VoicePool`]), optionally
//! passing through stream filters on the way.
//!
//! Overview
//! - `device` – output device and line abstraction (cpal backend, null backend)
//! - `echo` – decaying feedback echo filter
//! - `filter` – filter trait, 16-bit sample helpers, filter sequences
//! - `filter3d` – distance attenuation between two moving positions
//! - `pool` – voice thread pool with pause, close and join
//! - `sound` – PCM format, in-memory clips, WAV decoding
//! - `stream` – filtered and looping readers

pub mod device;
pub mod echo;
pub mod filter;
pub mod filter3d;
pub mod pool;
pub mod sound;
pub mod stream;

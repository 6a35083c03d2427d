//! Error types shared by the asset loaders and the sound pipeline.
//!
//! Configuration keeps the `Result<(), String>` convention of
//! [`GameConfig`](crate::resources::gameconfig::GameConfig); everything that
//! touches files or audio hardware reports one of the enums below.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading maps, images or sounds from disk.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid image {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },
    #[error("invalid map {}: {reason}", path.display())]
    InvalidMap { path: PathBuf, reason: String },
    #[error("unsupported sound {}: {reason}", path.display())]
    UnsupportedSound { path: PathBuf, reason: String },
    #[error("no maps found in {}", dir.display())]
    NoMaps { dir: PathBuf },
}

/// Failure in the audio output layer.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("could not open output line: {0}")]
    LineUnavailable(String),
    #[error("voice pool is closed")]
    PoolClosed,
    #[error("voice pool queue is full")]
    QueueFull,
}

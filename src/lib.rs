//! Platformer library.
//!
//! This module exposes the game's sprite model, resources, systems, events
//! and the sound pipeline for use in integration tests and by the binary.

pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod resources;
pub mod sound;
pub mod systems;

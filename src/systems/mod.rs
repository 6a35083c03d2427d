//! Game systems.
//!
//! This module groups the ECS systems that read input, advance the
//! simulation, play audio and draw the frame.
//!
//! Submodules overview:
//! - `audio` – music thread, effect dispatch and message pumps
//! - `input` – keyboard polling into game actions
//! - `render` – camera, parallax and drawing
//! - `simulation` – physics, collisions, scoring and level flow
//! - `time` – advances the world clock

pub mod audio;
pub mod input;
pub mod render;
pub mod simulation;
pub mod time;

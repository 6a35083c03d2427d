//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world and
//! accessed by systems during execution: the level, round counters, input
//! actions, timing, rendering handles and asset stores.
//!
//! Submodules overview:
//! - `audio` – voice pool player, sound bank and the music thread bridge
//! - `gameconfig` – settings loaded from `config.ini`
//! - `input` – named game actions bound to keys
//! - `maploader` – sprite prototypes and the text map parser
//! - `rendertarget` – fixed-resolution framebuffer
//! - `roundstate` – lives, score, coins and transition counters
//! - `screensize` / `windowsize` – render and window dimensions
//! - `texturestore` – loaded textures by file name
//! - `tilemap` – tile grid, sprite list and the current level
//! - `worldtime` – millisecond game clock

pub mod audio;
pub mod gameconfig;
pub mod input;
pub mod maploader;
pub mod rendertarget;
pub mod roundstate;
pub mod screensize;
pub mod texturestore;
pub mod tilemap;
pub mod windowsize;
pub mod worldtime;

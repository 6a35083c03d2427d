//! Sprite model.
//!
//! Sprites, the creatures and power-ups built on them, and the animations
//! they show. These live inside the level's tile map rather than as separate
//! ECS entities: the simulation walks the map's sprite list in order each
//! frame.
//!
//! Submodules overview:
//! - `animation` – frame lists with a per-copy playhead
//! - `creature` – enemies and the player, with their life cycle and physics hooks
//! - `powerup` – coins, items and the goal star
//! - `sprite` – position, velocity and the shared capability traits

pub mod animation;
pub mod creature;
pub mod powerup;
pub mod sprite;

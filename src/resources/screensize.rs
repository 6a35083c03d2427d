//! Screen size resource.
//!
//! Stores the internal render resolution in pixels. The camera and the HUD
//! lay the level out against this size, not the window's.

use bevy_ecs::prelude::Resource;

/// Render resolution in pixels.
#[derive(Resource, Clone, Copy, Debug)]
pub struct ScreenSize {
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

//! Off-screen framebuffer the level is drawn into.
//!
//! Kept as a NonSend resource: the texture lives on the GPU and may only be
//! touched from the thread that opened the window.

use raylib::ffi::{self, TextureFilter};
use raylib::prelude::*;

use super::screensize::ScreenSize;

pub struct RenderTarget {
    pub texture: RenderTexture2D,
    pub size: ScreenSize,
}

impl RenderTarget {
    /// Allocates a `size` framebuffer sampled with point filtering, so
    /// scaled pixel art stays sharp.
    pub fn new(rl: &mut RaylibHandle, th: &RaylibThread, size: ScreenSize) -> Result<Self, String> {
        let texture = rl
            .load_render_texture(th, size.w.max(1) as u32, size.h.max(1) as u32)
            .map_err(|e| format!("cannot create {}x{} framebuffer: {}", size.w, size.h, e))?;
        unsafe {
            ffi::SetTextureFilter(texture.texture, TextureFilter::TEXTURE_FILTER_POINT as i32);
        }
        Ok(RenderTarget { texture, size })
    }

    /// Whole texture, upside down: render textures are stored bottom-up.
    pub fn source_rect(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.size.w as f32, -(self.size.h as f32))
    }
}

//! Window size in pixels, refreshed every frame since the window can be
//! resized. The game itself always renders at [`ScreenSize`].

use bevy_ecs::prelude::Resource;
use raylib::prelude::Rectangle;

use super::screensize::ScreenSize;

#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    pub w: i32,
    pub h: i32,
}

impl WindowSize {
    /// Largest rectangle with the screen's aspect ratio that fits the
    /// window, centred. The uncovered strips stay black.
    pub fn letterbox(&self, screen: ScreenSize) -> Rectangle {
        if screen.w <= 0 || screen.h <= 0 {
            return Rectangle::new(0.0, 0.0, self.w as f32, self.h as f32);
        }
        let scale = (self.w as f32 / screen.w as f32).min(self.h as f32 / screen.h as f32);
        let width = screen.w as f32 * scale;
        let height = screen.h as f32 * scale;
        Rectangle::new(
            (self.w as f32 - width) / 2.0,
            (self.h as f32 - height) / 2.0,
            width,
            height,
        )
    }
}

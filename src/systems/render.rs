//! Level rendering.
//!
//! The frame is drawn into the fixed-size [`RenderTarget`] and then scaled
//! into the window with letterboxing. The camera follows the player
//! horizontally and keeps the bottom of the map on the bottom of the screen.
//! The background scrolls slower than the tiles when it is narrower than the
//! map.
//!
//! Creatures start moving the first frame they show up on screen; see
//! [`wake_system`].

use std::ffi::CString;

use bevy_ecs::prelude::*;
use raylib::ffi;
use raylib::prelude::*;

use crate::components::animation::ImageRef;
use crate::components::sprite::round_px;
use crate::resources::rendertarget::RenderTarget;
use crate::resources::roundstate::{OPENING_FRAMES, RoundState};
use crate::resources::screensize::ScreenSize;
use crate::resources::texturestore::TextureStore;
use crate::resources::tilemap::{Level, TILE_SIZE, TileMap, pixels_to_tiles_i, tiles_to_pixels};
use crate::resources::windowsize::WindowSize;

const HUD_FONT: i32 = 20;
const TITLE_FONT: i32 = 40;

/// Pixel offset added to map coordinates to get screen coordinates.
///
/// The player is kept near the centre, but the view never scrolls past either
/// edge of the map.
pub fn camera_offsets(screen: ScreenSize, map: &TileMap) -> (i32, i32) {
    let map_width = tiles_to_pixels(map.width());
    let mut offset_x = screen.w / 2 - round_px(map.player.x()) - TILE_SIZE;
    offset_x = offset_x.min(0);
    offset_x = offset_x.max(screen.w - map_width);
    let offset_y = screen.h - tiles_to_pixels(map.height());
    (offset_x, offset_y)
}

/// Horizontal position of the background for a camera offset.
pub fn parallax_x(offset_x: i32, screen_w: i32, background_w: i32, map_w: i32) -> i32 {
    if screen_w == map_w {
        return 0;
    }
    offset_x * (screen_w - background_w) / (screen_w - map_w)
}

/// First and last tile column to draw, inclusive. One column of slack covers
/// a partially visible tile at the right edge.
pub fn visible_columns(offset_x: i32, screen_w: i32) -> (i32, i32) {
    let first = pixels_to_tiles_i(-offset_x);
    (first, first + pixels_to_tiles_i(screen_w) + 1)
}

/// Starts every creature whose left edge is on screen.
pub fn wake_visible_creatures(map: &mut TileMap, offset_x: i32, screen_w: i32) {
    for sprite in map.sprites.iter_mut() {
        let x = round_px(sprite.sprite().x()) + offset_x;
        if (0..screen_w).contains(&x)
            && let Some(creature) = sprite.as_creature_mut()
        {
            creature.wake_up();
        }
    }
}

/// Black box covering the screen at the given opening frame, shrinking to
/// nothing. `None` once the opening is over.
pub fn opening_box(screen: ScreenSize, frame: u32) -> Option<(i32, i32, i32, i32)> {
    let frames = OPENING_FRAMES as i32;
    let frame = frame as i32;
    if frame >= frames {
        return None;
    }
    let step_w = screen.w / frames;
    let step_h = screen.h / frames;
    let w = frames * step_w - frame * step_w;
    let h = frames * step_h - frame * step_h;
    Some(((screen.w - w) / 2, (screen.h - h) / 2, w, h))
}

/// Wakes creatures entering the view. Runs after the simulation and before
/// drawing so the camera matches the frame about to be shown.
pub fn wake_system(mut level: ResMut<Level>, screen: Res<ScreenSize>) {
    let (offset_x, _) = camera_offsets(*screen, &level.map);
    wake_visible_creatures(&mut level.map, offset_x, screen.w);
}

fn draw_image<D: RaylibDraw>(
    d: &mut D,
    textures: &TextureStore,
    image: &ImageRef,
    x: i32,
    y: i32,
) {
    let Some(tex) = textures.get(&image.texture) else {
        return;
    };
    let w = image.width as f32;
    let h = image.height as f32;
    // negative source width flips horizontally
    let src = Rectangle {
        x: 0.0,
        y: 0.0,
        width: if image.mirrored { -w } else { w },
        height: h,
    };
    let dest = if image.squashed {
        Rectangle::new(x as f32, y as f32 + h / 2.0, w, h / 2.0)
    } else {
        Rectangle::new(x as f32, y as f32, w, h)
    };
    d.draw_texture_pro(tex, src, dest, Vector2::zero(), 0.0, Color::WHITE);
}

fn draw_level<D: RaylibDraw>(d: &mut D, level: &Level, textures: &TextureStore, screen: ScreenSize) {
    let map = &level.map;
    let map_width = tiles_to_pixels(map.width());
    let (offset_x, offset_y) = camera_offsets(screen, map);

    d.clear_background(Color::BLACK);

    if let Some(bg) = &level.background {
        let x = parallax_x(offset_x, screen.w, bg.width, map_width);
        let y = screen.h - bg.height;
        draw_image(d, textures, bg, x, y);
    }

    let (first, last) = visible_columns(offset_x, screen.w);
    for y in 0..map.height() {
        for x in first..=last {
            if let Some(tile) = map.grid.get_tile(x, y) {
                draw_image(
                    d,
                    textures,
                    tile,
                    tiles_to_pixels(x) + offset_x,
                    tiles_to_pixels(y) + offset_y,
                );
            }
        }
    }

    if let Some(image) = map.player.sprite.image() {
        draw_image(
            d,
            textures,
            image,
            round_px(map.player.x()) + offset_x,
            round_px(map.player.y()) + offset_y,
        );
    }

    for sprite in map.sprites.iter() {
        let s = sprite.sprite();
        if let Some(image) = s.image() {
            draw_image(
                d,
                textures,
                image,
                round_px(s.x()) + offset_x,
                round_px(s.y()) + offset_y,
            );
        }
    }
}

fn text_width(text: &str, size: i32) -> i32 {
    let Ok(c) = CString::new(text) else {
        return 0;
    };
    unsafe { ffi::MeasureText(c.as_ptr(), size) }
}

fn draw_centered<D: RaylibDraw>(d: &mut D, text: &str, y: i32, size: i32, screen: ScreenSize) {
    let w = text_width(text, size);
    d.draw_text(text, (screen.w - w) / 2, y, size, Color::WHITE);
}

fn draw_hud<D: RaylibDraw>(d: &mut D, round: &RoundState) {
    let items = [
        format!("LIVES x {}", round.lives),
        format!("STARS x {}", round.stars),
        format!("COINS x {}", round.coins),
        format!("LEVEL x {}", round.level_score),
        format!("TOTAL x {}", round.score),
    ];
    for (i, text) in items.iter().enumerate() {
        d.draw_text(text, 20 + 150 * i as i32, 22, HUD_FONT, Color::WHITE);
    }
}

fn draw_overlays<D: RaylibDraw>(d: &mut D, round: &RoundState, screen: ScreenSize) {
    if !round.advancing
        && let Some((x, y, w, h)) = opening_box(screen, round.opening_frame)
    {
        d.draw_rectangle(x, y, w, h, Color::BLACK);
    }

    if round.advancing {
        d.draw_rectangle(0, 0, screen.w, screen.h, Color::BLACK);
        let title = if round.game_complete() {
            "GAME COMPLETE"
        } else {
            "STAGE CLEAR"
        };
        draw_centered(d, title, 100, TITLE_FONT, screen);
        draw_centered(
            d,
            &format!("LEVEL x {}", round.level_score),
            screen.h / 2 - 20,
            HUD_FONT,
            screen,
        );
        draw_centered(
            d,
            &format!("TOTAL x {}", round.score),
            screen.h / 2 + 30,
            HUD_FONT,
            screen,
        );
    }

    if round.game_over {
        d.draw_rectangle(0, 0, screen.w, screen.h, Color::BLACK);
        draw_centered(d, "GAME OVER", screen.h / 2 - TITLE_FONT / 2, TITLE_FONT, screen);
    }

    if round.paused {
        d.draw_rectangle(0, 0, screen.w, screen.h, Color::new(0, 0, 0, 50));
        draw_centered(d, "PAUSED", screen.h / 2 - TITLE_FONT / 2, TITLE_FONT, screen);
    }
}

/// Draws the level, the HUD and any transition screen, then presents the
/// frame scaled to the window.
#[allow(clippy::too_many_arguments)]
pub fn render_system(
    mut rl: NonSendMut<RaylibHandle>,
    th: NonSend<RaylibThread>,
    mut target: NonSendMut<RenderTarget>,
    textures: Res<TextureStore>,
    level: Res<Level>,
    round: Res<RoundState>,
    screen: Res<ScreenSize>,
    window: Res<WindowSize>,
) {
    let screen = *screen;
    let mut d = rl.begin_drawing(&th);
    {
        let mut t = d.begin_texture_mode(&th, &mut target.texture);
        draw_level(&mut t, &level, &textures, screen);
        draw_hud(&mut t, &round);
        draw_overlays(&mut t, &round, screen);
    }

    d.clear_background(Color::BLACK);
    let dest = window.letterbox(target.size);
    d.draw_texture_pro(
        &target.texture,
        target.source_rect(),
        dest,
        Vector2::zero(),
        0.0,
        Color::WHITE,
    );
}

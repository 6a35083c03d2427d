//! The active level: a grid of static tiles, the sprites placed on it and
//! the player.
//!
//! Tile coordinates convert to pixels by multiplying by [`TILE_SIZE`].
//! Pixel coordinates round to the nearest pixel before converting back, so
//! a sprite at x = 31.6 is already in column 1.

use bevy_ecs::prelude::Resource;

use crate::components::animation::ImageRef;
use crate::components::creature::Creature;
use crate::components::powerup::PowerUp;
use crate::components::sprite::{Collidable, Positioned, Sprite, round_px};

pub const TILE_SIZE: i32 = 32;
const TILE_SIZE_BITS: u32 = 5;

/// Tile column or row containing pixel `px`. Floors for negative values.
pub fn pixels_to_tiles(px: f32) -> i32 {
    round_px(px) >> TILE_SIZE_BITS
}

/// Integer variant of [`pixels_to_tiles`].
pub fn pixels_to_tiles_i(px: i32) -> i32 {
    px >> TILE_SIZE_BITS
}

/// Left or top pixel edge of a tile.
pub fn tiles_to_pixels(tiles: i32) -> i32 {
    tiles << TILE_SIZE_BITS
}

/// Fixed-size grid of optional tile images.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<Option<ImageRef>>,
}

impl TileGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        TileGrid {
            width,
            height,
            tiles: vec![None; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn width_pixels(&self) -> i32 {
        tiles_to_pixels(self.width)
    }

    pub fn height_pixels(&self) -> i32 {
        tiles_to_pixels(self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            None
        } else {
            Some((y * self.width + x) as usize)
        }
    }

    /// Tile at `(x, y)`, `None` when empty or outside the grid.
    pub fn get_tile(&self, x: i32, y: i32) -> Option<&ImageRef> {
        self.index(x, y).and_then(|i| self.tiles[i].as_ref())
    }

    /// Ignored outside the grid.
    pub fn set_tile(&mut self, x: i32, y: i32, tile: Option<ImageRef>) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = tile;
        }
    }

    /// Columns left and right of the map act as walls. Rows above and
    /// below it are open, so creatures can jump off the top and fall out
    /// of the bottom.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        x < 0 || x >= self.width || self.get_tile(x, y).is_some()
    }
}

/// Anything other than the player that lives on a map.
#[derive(Debug)]
pub enum MapSprite {
    Creature(Creature),
    PowerUp(PowerUp),
}

impl MapSprite {
    pub fn sprite(&self) -> &Sprite {
        match self {
            MapSprite::Creature(c) => &c.sprite,
            MapSprite::PowerUp(p) => &p.sprite,
        }
    }

    pub fn sprite_mut(&mut self) -> &mut Sprite {
        match self {
            MapSprite::Creature(c) => &mut c.sprite,
            MapSprite::PowerUp(p) => &mut p.sprite,
        }
    }

    pub fn as_collidable(&self) -> &dyn Collidable {
        match self {
            MapSprite::Creature(c) => c,
            MapSprite::PowerUp(p) => p,
        }
    }

    pub fn as_creature_mut(&mut self) -> Option<&mut Creature> {
        match self {
            MapSprite::Creature(c) => Some(c),
            MapSprite::PowerUp(_) => None,
        }
    }
}

impl Positioned for MapSprite {
    fn sprite(&self) -> &Sprite {
        MapSprite::sprite(self)
    }
}

impl From<Creature> for MapSprite {
    fn from(c: Creature) -> Self {
        MapSprite::Creature(c)
    }
}

impl From<PowerUp> for MapSprite {
    fn from(p: PowerUp) -> Self {
        MapSprite::PowerUp(p)
    }
}

/// A parsed level ready to play.
#[derive(Debug)]
pub struct TileMap {
    pub grid: TileGrid,
    /// Drawn and updated in insertion order.
    pub sprites: Vec<MapSprite>,
    pub player: Creature,
}

impl TileMap {
    pub fn new(grid: TileGrid, player: Creature) -> Self {
        TileMap {
            grid,
            sprites: Vec::new(),
            player,
        }
    }

    pub fn add_sprite(&mut self, sprite: impl Into<MapSprite>) {
        self.sprites.push(sprite.into());
    }

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }
}

/// The map being played and the background drawn behind it.
#[derive(Resource, Debug)]
pub struct Level {
    pub map: TileMap,
    pub background: Option<ImageRef>,
}

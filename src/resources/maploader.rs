//! Loading levels from text maps.
//!
//! Every creature and power-up kind is built once as a prototype from its
//! images. Parsing a map then instantiates a prototype for each placed
//! sprite, sharing the animation frames and giving each copy its own
//! playhead.
//!
//! # Map format
//!
//! One line per tile row. Lines starting with `#` are comments. A letter
//! from `A` up to the last loaded tile places that tile; `o ! f u *` place
//! power-ups and `1`-`9 @ $ %` place enemies. Anything else is empty.
//!
//! ```text
//! # a tiny level
//!      o o
//!   1      *
//! AAAAAAAAAAA
//! ```

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::Resource;
use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::components::animation::{Animation, ImageRef};
use crate::components::creature::{Creature, CreatureAnimations, CreatureKind, PlayerAnimations};
use crate::components::powerup::{PowerUp, PowerUpKind};
use crate::components::sprite::{Prototype, Sprite};
use crate::error::AssetError;
use crate::resources::tilemap::{TILE_SIZE, TileGrid, TileMap, tiles_to_pixels};

/// Column where the player appears on every map.
pub const PLAYER_START_TILE: i32 = 3;

const ENEMY_FRAME_MS: u64 = 200;
const COIN_FRAME_MS: u64 = 100;
const ITEM_FRAME_MS: u64 = 150;
const GOAL_FRAMES: [(&str, u64); 12] = [
    ("star1.png", 20),
    ("star2.png", 40),
    ("star3.png", 60),
    ("star4.png", 80),
    ("star5.png", 100),
    ("star6.png", 120),
    ("star7.png", 150),
    ("star6.png", 120),
    ("star5.png", 100),
    ("star4.png", 80),
    ("star3.png", 60),
    ("star2.png", 40),
];

/// Provides images by file name.
///
/// The game loads textures through raylib; tests hand out sized
/// placeholders.
pub trait ImageSource {
    fn load_image(&mut self, name: &str) -> Result<ImageRef, AssetError>;
}

fn animation(
    images: &mut dyn ImageSource,
    frames: &[(&str, u64)],
) -> Result<Animation, AssetError> {
    let mut anim = Animation::new();
    for (name, duration) in frames {
        anim.add_frame(images.load_image(name)?, *duration);
    }
    Ok(anim)
}

fn mirrored(anim: &Animation) -> Animation {
    anim.map_images(ImageRef::mirrored)
}

fn squashed(anim: &Animation) -> Animation {
    anim.map_images(ImageRef::squashed)
}

/// One prototype per sprite kind.
#[derive(Debug)]
pub struct Prototypes {
    pub player: Creature,
    pub creatures: FxHashMap<CreatureKind, Creature>,
    pub power_ups: FxHashMap<PowerUpKind, PowerUp>,
}

impl Prototypes {
    pub fn load(images: &mut dyn ImageSource) -> Result<Self, AssetError> {
        let player = Self::load_player(images)?;

        let mut creatures = FxHashMap::default();
        for kind in CreatureKind::ENEMIES {
            let names: Vec<String> = (1..=kind.frame_count())
                .map(|i| format!("{}{}.png", kind.image_name(), i))
                .collect();
            let frames: Vec<(&str, u64)> = names
                .iter()
                .map(|n| (n.as_str(), ENEMY_FRAME_MS))
                .collect();
            let left = animation(images, &frames)?;
            let right = mirrored(&left);
            let anims = CreatureAnimations {
                dead_left: squashed(&left),
                dead_right: squashed(&right),
                left,
                right,
            };
            creatures.insert(kind, Creature::new(kind, anims));
        }

        let mut power_ups = FxHashMap::default();
        for kind in PowerUpKind::ALL {
            let anim = match kind {
                PowerUpKind::Goal => animation(images, &GOAL_FRAMES)?,
                PowerUpKind::Coin => animation(
                    images,
                    &[
                        ("coin1.png", COIN_FRAME_MS),
                        ("coin2.png", COIN_FRAME_MS),
                        ("coin3.png", COIN_FRAME_MS),
                        ("coin4.png", COIN_FRAME_MS),
                        ("coin5.png", COIN_FRAME_MS),
                    ],
                )?,
                PowerUpKind::Mushroom => animation(images, &[("mushroom.png", ITEM_FRAME_MS)])?,
                PowerUpKind::OneUp => animation(images, &[("oneUp.png", ITEM_FRAME_MS)])?,
                PowerUpKind::FireFlower => {
                    animation(images, &[("fireFlower.png", ITEM_FRAME_MS)])?
                }
            };
            power_ups.insert(kind, PowerUp::new(kind, anim));
        }

        Ok(Prototypes {
            player,
            creatures,
            power_ups,
        })
    }

    fn load_player(images: &mut dyn ImageSource) -> Result<Creature, AssetError> {
        let stand = animation(images, &[("player1.png", 250)])?;
        let walk = animation(images, &[("player1.png", 100), ("player2.png", 100)])?;
        let jump = animation(images, &[("playerJump1.png", 250), ("playerJump2.png", 5000)])?;
        let dying = animation(
            images,
            &[("playerDying1.png", 100), ("playerDying2.png", 100)],
        )?;
        let crouch = animation(images, &[("playerDown1.png", 250)])?;

        let anims = CreatureAnimations {
            right: mirrored(&stand),
            left: stand,
            dead_right: mirrored(&dying),
            dead_left: dying,
        };
        let extra = PlayerAnimations {
            run_right: mirrored(&walk),
            run_left: walk,
            jump_right: mirrored(&jump),
            jump_left: jump,
            crouch_right: mirrored(&crouch),
            crouch_left: crouch,
        };
        Ok(Creature::new_player(anims, extra))
    }
}

/// Loads tile images and prototypes once, then parses `map<N>.txt` files.
#[derive(Resource)]
pub struct MapLoader {
    dir: PathBuf,
    tiles: Vec<ImageRef>,
    prototypes: Prototypes,
    backgrounds: FxHashMap<u32, ImageRef>,
    current: u32,
}

impl MapLoader {
    /// Loads `tile_A.png` up to `tile_<max_tile>.png`, stopping at the first
    /// missing file, and every sprite prototype.
    pub fn new(
        dir: impl Into<PathBuf>,
        max_tile: char,
        images: &mut dyn ImageSource,
    ) -> Result<Self, AssetError> {
        let mut tiles = Vec::new();
        for ch in 'A'..=max_tile {
            match images.load_image(&format!("tile_{}.png", ch)) {
                Ok(image) => tiles.push(image),
                Err(AssetError::NotFound { path }) => {
                    warn!("tile {} missing ({}), stopping at {} tiles", ch, path.display(), tiles.len());
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        info!("loaded {} tile images", tiles.len());
        Ok(MapLoader {
            dir: dir.into(),
            tiles,
            prototypes: Prototypes::load(images)?,
            backgrounds: FxHashMap::default(),
            current: 0,
        })
    }

    /// Loads `background0.png` up to `background<count - 1>.png`. Missing
    /// backgrounds leave the level on a black fill.
    pub fn load_backgrounds(&mut self, images: &mut dyn ImageSource, count: u32) {
        for n in 0..count.max(1) {
            match images.load_image(&format!("background{}.png", n)) {
                Ok(image) => {
                    self.backgrounds.insert(n, image);
                }
                Err(e) => warn!("background {} unavailable: {}", n, e),
            }
        }
    }

    pub fn background(&self, n: u32) -> Option<ImageRef> {
        self.backgrounds.get(&n).cloned()
    }

    /// For callers that already hold the tiles and prototypes.
    pub fn with_parts(dir: impl Into<PathBuf>, tiles: Vec<ImageRef>, prototypes: Prototypes) -> Self {
        MapLoader {
            dir: dir.into(),
            tiles,
            prototypes,
            backgrounds: FxHashMap::default(),
            current: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn prototypes(&self) -> &Prototypes {
        &self.prototypes
    }

    /// Number of the map most recently loaded, 0 before the first.
    pub fn current(&self) -> u32 {
        self.current
    }

    fn map_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("map{}.txt", n))
    }

    /// Advances to the next map, going back to map 1 after the last one.
    pub fn load_next(&mut self) -> Result<TileMap, AssetError> {
        let next = self.current + 1;
        match self.load_map(next) {
            Err(AssetError::NotFound { .. }) if next > 1 => {
                info!("no map {}, starting over", next);
                self.load_map(1)
            }
            Err(AssetError::NotFound { .. }) => Err(AssetError::NoMaps {
                dir: self.dir.clone(),
            }),
            other => other,
        }
    }

    /// Parses the current map again, with every sprite back in place.
    pub fn reload(&mut self) -> Result<TileMap, AssetError> {
        self.load_map(self.current.max(1))
    }

    pub fn load_map(&mut self, n: u32) -> Result<TileMap, AssetError> {
        let path = self.map_path(n);
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound { path: path.clone() },
            _ => AssetError::Io(e),
        })?;
        let map = self.parse_map(&text).map_err(|e| match e {
            AssetError::InvalidMap { reason, .. } => AssetError::InvalidMap {
                path: path.clone(),
                reason,
            },
            other => other,
        })?;
        self.current = n;
        info!(
            "loaded {} ({}x{} tiles, {} sprites)",
            path.display(),
            map.width(),
            map.height(),
            map.sprites.len()
        );
        Ok(map)
    }

    /// Builds a map from its text.
    pub fn parse_map(&self, text: &str) -> Result<TileMap, AssetError> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        if lines.is_empty() || width == 0 {
            return Err(AssetError::InvalidMap {
                path: PathBuf::new(),
                reason: "map has no tiles".into(),
            });
        }

        let mut player = self.prototypes.player.instantiate();
        player.sprite.set_position(tiles_to_pixels(PLAYER_START_TILE) as f32, 0.0);
        let mut map = TileMap::new(TileGrid::new(width as i32, lines.len() as i32), player);

        for (y, line) in lines.iter().enumerate() {
            let (y, mut x) = (y as i32, 0i32);
            for ch in line.chars() {
                let tile = (ch as u32).wrapping_sub('A' as u32) as usize;
                if tile < self.tiles.len() {
                    map.grid.set_tile(x, y, Some(self.tiles[tile].clone()));
                } else if let Some(kind) = PowerUpKind::from_map_char(ch) {
                    if let Some(proto) = self.prototypes.power_ups.get(&kind) {
                        let mut p = proto.instantiate();
                        place(&mut p.sprite, x, y);
                        map.add_sprite(p);
                    }
                } else if let Some(kind) = CreatureKind::from_map_char(ch)
                    && let Some(proto) = self.prototypes.creatures.get(&kind)
                {
                    let mut c = proto.instantiate();
                    place(&mut c.sprite, x, y);
                    map.add_sprite(c);
                }
                x += 1;
            }
        }
        Ok(map)
    }
}

/// Centres the sprite in its cell, standing on the cell's floor.
fn place(sprite: &mut Sprite, tx: i32, ty: i32) {
    let x = tiles_to_pixels(tx) + (TILE_SIZE - sprite.width()) / 2;
    let y = tiles_to_pixels(ty + 1) - sprite.height();
    sprite.set_position(x as f32, y as f32);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::components::creature::CreatureState;
    use crate::resources::tilemap::MapSprite;

    /// Every image is 16x24 except tiles, which fill a cell.
    pub(crate) struct FakeImages {
        pub loaded: Vec<String>,
        pub max_tile: char,
    }

    impl FakeImages {
        pub(crate) fn new() -> Self {
            FakeImages {
                loaded: Vec::new(),
                max_tile: 'C',
            }
        }
    }

    impl ImageSource for FakeImages {
        fn load_image(&mut self, name: &str) -> Result<ImageRef, AssetError> {
            if let Some(rest) = name.strip_prefix("tile_") {
                let ch = rest.chars().next().unwrap_or('?');
                if ch > self.max_tile {
                    return Err(AssetError::NotFound { path: name.into() });
                }
                self.loaded.push(name.to_string());
                return Ok(ImageRef::new(name, TILE_SIZE, TILE_SIZE));
            }
            self.loaded.push(name.to_string());
            Ok(ImageRef::new(name, 16, 24))
        }
    }

    fn loader(dir: &Path) -> MapLoader {
        MapLoader::new(dir, 'Z', &mut FakeImages::new()).unwrap()
    }

    #[test]
    fn test_tiles_stop_at_first_missing() {
        let l = loader(Path::new("."));
        assert_eq!(l.tile_count(), 3);
    }

    #[test]
    fn test_prototype_images() {
        let mut images = FakeImages::new();
        let protos = Prototypes::load(&mut images).unwrap();
        assert!(images.loaded.contains(&"goomba2.png".to_string()));
        assert!(images.loaded.contains(&"bullet1.png".to_string()));
        assert!(!images.loaded.contains(&"bullet2.png".to_string()));
        assert_eq!(protos.creatures.len(), 12);
        assert_eq!(protos.power_ups.len(), 5);

        let goal = &protos.power_ups[&PowerUpKind::Goal];
        assert_eq!(goal.sprite.anim.frame_count(), 12);
        assert_eq!(goal.sprite.anim.total_duration(), 970);
        let coin = &protos.power_ups[&PowerUpKind::Coin];
        assert_eq!(coin.sprite.anim.total_duration(), 500);
    }

    #[test]
    fn test_parse_places_tiles_and_sprites() {
        let l = loader(Path::new("."));
        let map = l
            .parse_map("# comment\n  o     1\nABC  D\n")
            .unwrap();
        assert_eq!(map.width(), 9);
        assert_eq!(map.height(), 2);
        assert!(map.grid.get_tile(0, 1).is_some());
        assert!(map.grid.get_tile(2, 1).is_some());
        // D is past the loaded tiles
        assert!(map.grid.get_tile(5, 1).is_none());
        assert_eq!(map.sprites.len(), 2);

        let coin = &map.sprites[0];
        assert!(matches!(coin, MapSprite::PowerUp(p) if p.kind() == PowerUpKind::Coin));
        assert_eq!(coin.sprite().x(), (64 + 8) as f32);
        assert_eq!(coin.sprite().y(), (32 - 24) as f32);

        let MapSprite::Creature(goomba) = &map.sprites[1] else {
            panic!("expected a creature");
        };
        assert_eq!(goomba.kind(), CreatureKind::Goomba);
        assert_eq!(goomba.state(), CreatureState::Normal);
        assert_eq!(goomba.x(), (8 * 32 + 8) as f32);

        assert_eq!(map.player.x(), 96.0);
        assert_eq!(map.player.y(), 0.0);
    }

    #[test]
    fn test_empty_map_is_invalid() {
        let l = loader(Path::new("."));
        assert!(matches!(
            l.parse_map("# nothing\n"),
            Err(AssetError::InvalidMap { .. })
        ));
    }

    #[test]
    fn test_load_next_wraps_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map1.txt"), "A\n").unwrap();
        std::fs::write(dir.path().join("map2.txt"), "AB\n").unwrap();
        let mut l = loader(dir.path());

        assert_eq!(l.load_next().unwrap().width(), 1);
        assert_eq!(l.current(), 1);
        assert_eq!(l.load_next().unwrap().width(), 2);
        assert_eq!(l.load_next().unwrap().width(), 1);
        assert_eq!(l.current(), 1);
        assert_eq!(l.reload().unwrap().width(), 1);
    }

    #[test]
    fn test_backgrounds() {
        let mut images = FakeImages::new();
        let mut l = MapLoader::new(".", 'A', &mut images).unwrap();
        l.load_backgrounds(&mut images, 2);
        assert!(l.background(0).is_some());
        assert!(l.background(1).is_some());
        assert!(l.background(2).is_none());
    }

    #[test]
    fn test_no_maps() {
        let dir = tempfile::tempdir().unwrap();
        let mut l = loader(dir.path());
        assert!(matches!(l.load_next(), Err(AssetError::NoMaps { .. })));
    }
}

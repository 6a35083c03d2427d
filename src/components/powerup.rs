//! Collectible items. They animate and drift with their velocity but have
//! no behaviour of their own; the player consumes them on contact.

use super::animation::Animation;
use super::sprite::{Animated, Collidable, Positioned, Prototype, Sprite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    Coin,
    Mushroom,
    OneUp,
    FireFlower,
    /// Star that ends the level.
    Goal,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Coin,
        PowerUpKind::Mushroom,
        PowerUpKind::OneUp,
        PowerUpKind::FireFlower,
        PowerUpKind::Goal,
    ];

    pub fn from_map_char(c: char) -> Option<PowerUpKind> {
        match c {
            'o' => Some(PowerUpKind::Coin),
            '!' => Some(PowerUpKind::Mushroom),
            'f' => Some(PowerUpKind::FireFlower),
            'u' => Some(PowerUpKind::OneUp),
            '*' => Some(PowerUpKind::Goal),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PowerUp {
    pub sprite: Sprite,
    kind: PowerUpKind,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, anim: Animation) -> Self {
        PowerUp {
            sprite: Sprite::new(anim),
            kind,
        }
    }

    pub fn kind(&self) -> PowerUpKind {
        self.kind
    }
}

impl Prototype for PowerUp {
    fn instantiate(&self) -> Self {
        PowerUp {
            sprite: self.sprite.respawn(),
            kind: self.kind,
        }
    }
}

impl Positioned for PowerUp {
    fn sprite(&self) -> &Sprite {
        &self.sprite
    }
}

impl Animated for PowerUp {
    fn update(&mut self, elapsed: u64) {
        self.sprite.update(elapsed);
    }
}

impl Collidable for PowerUp {}

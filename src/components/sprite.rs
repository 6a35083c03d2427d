//! Moving, animated sprites and the capability traits shared by everything
//! that lives on a map.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::animation::{Animation, ImageRef};

/// Rounds half up, so -0.5 becomes 0 and 0.5 becomes 1.
pub fn round_px(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}

/// Position readable from other threads.
///
/// A sprite publishes its coordinates here on every move so that sound
/// filters running on voice threads can follow it. Clones observe the same
/// position.
#[derive(Debug, Clone)]
pub struct SharedPosition(Arc<AtomicU64>);

impl SharedPosition {
    pub fn new(x: f32, y: f32) -> Self {
        SharedPosition(Arc::new(AtomicU64::new(Self::pack(x, y))))
    }

    fn pack(x: f32, y: f32) -> u64 {
        ((x.to_bits() as u64) << 32) | y.to_bits() as u64
    }

    pub fn get(&self) -> (f32, f32) {
        let bits = self.0.load(Ordering::Relaxed);
        (f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
    }

    pub fn set(&self, x: f32, y: f32) {
        self.0.store(Self::pack(x, y), Ordering::Relaxed);
    }
}

impl Default for SharedPosition {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Position, velocity (pixels per millisecond) and the current animation.
#[derive(Debug)]
pub struct Sprite {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    pub anim: Animation,
    anchor: SharedPosition,
}

impl Sprite {
    pub fn new(anim: Animation) -> Self {
        Sprite {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            anim,
            anchor: SharedPosition::default(),
        }
    }

    /// Moves by velocity times `elapsed` and advances the animation.
    pub fn update(&mut self, elapsed: u64) {
        let dt = elapsed as f32;
        self.set_position(self.x + self.vx * dt, self.y + self.vy * dt);
        self.anim.update(elapsed);
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.set_position(x, self.y);
    }

    pub fn set_y(&mut self, y: f32) {
        self.set_position(self.x, y);
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.anchor.set(x, y);
    }

    pub fn vx(&self) -> f32 {
        self.vx
    }

    pub fn vy(&self) -> f32 {
        self.vy
    }

    pub fn set_vx(&mut self, vx: f32) {
        self.vx = vx;
    }

    pub fn set_vy(&mut self, vy: f32) {
        self.vy = vy;
    }

    /// Width of the current frame, 0 with no image.
    pub fn width(&self) -> i32 {
        self.anim.image().map_or(0, |i| i.width)
    }

    pub fn height(&self) -> i32 {
        self.anim.image().map_or(0, |i| i.height)
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.anim.image()
    }

    /// Handle that tracks this sprite's position across threads.
    pub fn anchor(&self) -> SharedPosition {
        self.anchor.clone()
    }

    /// Fresh sprite with the same animation frames, at the origin and at rest.
    pub fn respawn(&self) -> Sprite {
        Sprite::new(self.anim.clone())
    }
}

/// Has a position in map pixels.
pub trait Positioned {
    fn sprite(&self) -> &Sprite;

    fn position(&self) -> (f32, f32) {
        (self.sprite().x(), self.sprite().y())
    }
}

/// Shows a frame that changes over time.
pub trait Animated: Positioned {
    fn update(&mut self, elapsed: u64);

    fn image(&self) -> Option<&ImageRef> {
        self.sprite().image()
    }
}

/// Takes part in sprite-to-sprite collision checks.
pub trait Collidable: Positioned {
    /// Creatures stop colliding once they start dying.
    fn is_collidable(&self) -> bool {
        true
    }

    /// Rounded `(left, top, right, bottom)`, right and bottom exclusive.
    fn bounds(&self) -> (i32, i32, i32, i32) {
        let s = self.sprite();
        let left = round_px(s.x());
        let top = round_px(s.y());
        (left, top, left + s.width(), top + s.height())
    }
}

/// Copies itself from a prototype with fresh animation playheads.
pub trait Prototype {
    fn instantiate(&self) -> Self;
}

/// True if the two boxes strictly overlap. Sharing an edge is not a collision.
pub fn sprites_collide(a: &dyn Collidable, b: &dyn Collidable) -> bool {
    if std::ptr::addr_eq(a, b) || !a.is_collidable() || !b.is_collidable() {
        return false;
    }
    let (al, at, ar, ab) = a.bounds();
    let (bl, bt, br, bb) = b.bounds();
    al < br && bl < ar && at < bb && bt < ab
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Block(Sprite, bool);

    impl Positioned for Block {
        fn sprite(&self) -> &Sprite {
            &self.0
        }
    }

    impl Collidable for Block {
        fn is_collidable(&self) -> bool {
            self.1
        }
    }

    fn block(x: f32, y: f32, size: i32) -> Block {
        let anim = Animation::from_frames([(ImageRef::new("b", size, size), 100)]);
        let mut sprite = Sprite::new(anim);
        sprite.set_position(x, y);
        Block(sprite, true)
    }

    #[test]
    fn test_round_px_half_up() {
        assert_eq!(round_px(0.5), 1);
        assert_eq!(round_px(0.49), 0);
        assert_eq!(round_px(-0.5), 0);
        assert_eq!(round_px(-0.51), -1);
    }

    #[test]
    fn test_shared_position_follows_sprite() {
        let mut sprite = block(0.0, 0.0, 8).0;
        let anchor = sprite.anchor();
        sprite.set_position(12.5, -3.0);
        assert_eq!(anchor.get(), (12.5, -3.0));
        sprite.set_vx(0.5);
        sprite.update(10);
        assert_eq!(anchor.get(), (17.5, -3.0));
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        let a = block(0.0, 0.0, 10);
        let b = block(10.0, 0.0, 10);
        assert!(!sprites_collide(&a, &b));
        let c = block(9.0, 9.0, 10);
        assert!(sprites_collide(&a, &c));
    }

    #[test]
    fn test_same_instance_never_collides() {
        let a = block(0.0, 0.0, 10);
        assert!(!sprites_collide(&a, &a));
    }

    #[test]
    fn test_inactive_never_collides() {
        let a = block(0.0, 0.0, 10);
        let mut b = block(5.0, 5.0, 10);
        b.1 = false;
        assert!(!sprites_collide(&a, &b));
    }

    #[test]
    fn test_positions_rounded_before_overlap() {
        let a = block(0.0, 0.0, 10);
        // 9.6 rounds to 10, exactly touching
        let b = block(9.6, 0.0, 10);
        assert!(!sprites_collide(&a, &b));
    }

    #[test]
    fn test_respawn_resets_motion() {
        let mut s = block(3.0, 4.0, 8).0;
        s.set_vy(1.0);
        let fresh = s.respawn();
        assert_eq!((fresh.x(), fresh.y(), fresh.vy()), (0.0, 0.0, 0.0));
        assert_eq!(fresh.width(), 8);
    }
}

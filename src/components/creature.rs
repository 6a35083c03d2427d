//! Creatures: the player and the enemies that walk or fly around a map.
//!
//! A creature cycles through four animations (left, right and the two
//! squashed "dead" variants). The player adds running, jumping and
//! crouching animations plus ground tracking, kept in [`PlayerState`].

use super::animation::Animation;
use super::sprite::{Animated, Collidable, Positioned, Prototype, Sprite, round_px};

/// Time a normal creature spends dying before it is removed, in ms.
pub const DIE_TIME: u64 = 500;
/// Time the player spends dying before the level restarts, in ms.
pub const PLAYER_DIE_TIME: u64 = 3500;
/// Initial vertical speed of a jump (pixels per ms, negative is up).
pub const JUMP_SPEED: f32 = -0.77;
/// Horizontal speed of the player while walking.
pub const PLAYER_WALK_SPEED: f32 = 0.3;
/// Horizontal speed of the player while running.
pub const PLAYER_RUN_SPEED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatureKind {
    Player,
    Goomba,
    FlyGoomba,
    GreenKoopa,
    RedKoopa,
    BlueKoopa,
    YellowKoopa,
    Bomb,
    Bullet,
    Bat,
    Turtle,
    MummyTurtle,
    BlueDragon,
}

impl CreatureKind {
    /// Every kind that can be placed on a map.
    pub const ENEMIES: [CreatureKind; 12] = [
        CreatureKind::Goomba,
        CreatureKind::FlyGoomba,
        CreatureKind::GreenKoopa,
        CreatureKind::RedKoopa,
        CreatureKind::BlueKoopa,
        CreatureKind::YellowKoopa,
        CreatureKind::Bomb,
        CreatureKind::Bullet,
        CreatureKind::Bat,
        CreatureKind::Turtle,
        CreatureKind::MummyTurtle,
        CreatureKind::BlueDragon,
    ];

    pub fn max_speed(self) -> f32 {
        match self {
            CreatureKind::FlyGoomba | CreatureKind::Bat => 0.2,
            CreatureKind::Bullet => 0.25,
            _ => 0.1,
        }
    }

    /// Fliers ignore gravity while alive.
    pub fn is_flier(self) -> bool {
        matches!(
            self,
            CreatureKind::FlyGoomba | CreatureKind::Bat | CreatureKind::Bullet
        )
    }

    pub fn die_time(self) -> u64 {
        match self {
            CreatureKind::Player => PLAYER_DIE_TIME,
            _ => DIE_TIME,
        }
    }

    /// Enemy placed by a map character.
    pub fn from_map_char(c: char) -> Option<CreatureKind> {
        let kind = match c {
            '1' => CreatureKind::Goomba,
            '2' => CreatureKind::FlyGoomba,
            '3' => CreatureKind::GreenKoopa,
            '4' => CreatureKind::RedKoopa,
            '5' => CreatureKind::BlueKoopa,
            '6' => CreatureKind::YellowKoopa,
            '7' => CreatureKind::Bomb,
            '8' => CreatureKind::Bullet,
            '9' => CreatureKind::Bat,
            '@' => CreatureKind::Turtle,
            '$' => CreatureKind::MummyTurtle,
            '%' => CreatureKind::BlueDragon,
            _ => return None,
        };
        Some(kind)
    }

    /// Prefix of the image files for this kind (`goomba1.png`, `goomba2.png`).
    pub fn image_name(self) -> &'static str {
        match self {
            CreatureKind::Player => "player",
            CreatureKind::Goomba => "goomba",
            CreatureKind::FlyGoomba => "flyGoomba",
            CreatureKind::GreenKoopa => "greenKoopa",
            CreatureKind::RedKoopa => "redKoopa",
            CreatureKind::BlueKoopa => "blueKoopa",
            CreatureKind::YellowKoopa => "yellowKoopa",
            CreatureKind::Bomb => "bomb",
            CreatureKind::Bullet => "bullet",
            CreatureKind::Bat => "bat",
            CreatureKind::Turtle => "turtle",
            CreatureKind::MummyTurtle => "mummyTurtle",
            CreatureKind::BlueDragon => "blueDragon",
        }
    }

    /// Number of walking frames in the image set.
    pub fn frame_count(self) -> usize {
        match self {
            CreatureKind::Bullet => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureState {
    Normal,
    Dying,
    Dead,
}

/// Which of a creature's animations is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimSlot {
    Left,
    Right,
    DeadLeft,
    DeadRight,
    RunLeft,
    RunRight,
    JumpLeft,
    JumpRight,
    CrouchLeft,
    CrouchRight,
}

#[derive(Debug, Clone, Default)]
pub struct CreatureAnimations {
    pub left: Animation,
    pub right: Animation,
    pub dead_left: Animation,
    pub dead_right: Animation,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerAnimations {
    pub run_left: Animation,
    pub run_right: Animation,
    pub jump_left: Animation,
    pub jump_right: Animation,
    pub crouch_left: Animation,
    pub crouch_right: Animation,
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub on_ground: bool,
    pub facing_right: bool,
    pub crouching: bool,
    pub airborne: bool,
    anims: PlayerAnimations,
}

#[derive(Debug)]
pub struct Creature {
    pub sprite: Sprite,
    kind: CreatureKind,
    state: CreatureState,
    state_time: u64,
    max_speed: f32,
    anims: CreatureAnimations,
    slot: AnimSlot,
    player: Option<PlayerState>,
}

impl Creature {
    /// Enemy facing right until it wakes up and walks left.
    pub fn new(kind: CreatureKind, anims: CreatureAnimations) -> Self {
        Creature {
            sprite: Sprite::new(anims.right.clone()),
            kind,
            state: CreatureState::Normal,
            state_time: 0,
            max_speed: kind.max_speed(),
            anims,
            slot: AnimSlot::Right,
            player: None,
        }
    }

    /// Player starting in its right-facing standing animation.
    pub fn new_player(anims: CreatureAnimations, extra: PlayerAnimations) -> Self {
        Creature {
            sprite: Sprite::new(anims.right.clone()),
            kind: CreatureKind::Player,
            state: CreatureState::Normal,
            state_time: 0,
            max_speed: CreatureKind::Player.max_speed(),
            anims,
            slot: AnimSlot::Right,
            player: Some(PlayerState {
                on_ground: false,
                facing_right: true,
                crouching: false,
                airborne: false,
                anims: extra,
            }),
        }
    }

    pub fn kind(&self) -> CreatureKind {
        self.kind
    }

    pub fn is_player(&self) -> bool {
        self.player.is_some()
    }

    pub fn player_state(&self) -> Option<&PlayerState> {
        self.player.as_ref()
    }

    pub fn state(&self) -> CreatureState {
        self.state
    }

    pub fn state_time(&self) -> u64 {
        self.state_time
    }

    /// Changing state restarts the state timer; dying also stops all motion.
    pub fn set_state(&mut self, state: CreatureState) {
        if self.state != state {
            self.state = state;
            self.state_time = 0;
            if state == CreatureState::Dying {
                self.sprite.set_vx(0.0);
                self.sprite.set_vy(0.0);
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == CreatureState::Normal
    }

    pub fn is_flying(&self) -> bool {
        self.kind.is_flier() && self.is_alive()
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn set_max_speed(&mut self, speed: f32) {
        self.max_speed = speed;
    }

    pub fn anim_slot(&self) -> AnimSlot {
        self.slot
    }

    pub fn x(&self) -> f32 {
        self.sprite.x()
    }

    pub fn y(&self) -> f32 {
        self.sprite.y()
    }

    pub fn width(&self) -> i32 {
        self.sprite.width()
    }

    pub fn height(&self) -> i32 {
        self.sprite.height()
    }

    pub fn set_x(&mut self, x: f32) {
        self.sprite.set_x(x);
    }

    /// Moving the player down by at least a whole pixel means it left the ground.
    pub fn set_y(&mut self, y: f32) {
        if let Some(p) = self.player.as_mut()
            && round_px(y) > round_px(self.sprite.y())
        {
            p.on_ground = false;
        }
        self.sprite.set_y(y);
    }

    /// Enemies start walking left when they come into view.
    pub fn wake_up(&mut self) {
        if self.player.is_none() && self.is_alive() && self.sprite.vx() == 0.0 {
            self.sprite.set_vx(-self.max_speed);
        }
    }

    /// Hit a wall. Enemies turn around; the player stops.
    pub fn collide_horizontal(&mut self) {
        if self.player.is_some() {
            self.sprite.set_vx(0.0);
        } else {
            self.sprite.set_vx(-self.sprite.vx());
        }
    }

    /// Hit a floor or ceiling. Landing puts the player on the ground.
    pub fn collide_vertical(&mut self) {
        if let Some(p) = self.player.as_mut()
            && self.sprite.vy() > 0.0
        {
            p.on_ground = true;
            p.airborne = false;
        }
        self.sprite.set_vy(0.0);
    }

    /// Starts a jump if the player stands on something, or unconditionally
    /// when `force` is set (bouncing off a stomped enemy).
    pub fn jump(&mut self, force: bool) {
        let Some(p) = self.player.as_mut() else {
            return;
        };
        if p.on_ground || force {
            p.on_ground = false;
            self.sprite.set_vy(JUMP_SPEED);
        }
        p.airborne = !p.on_ground;
    }

    pub fn set_crouching(&mut self, crouching: bool) {
        if let Some(p) = self.player.as_mut() {
            p.crouching = crouching;
        }
    }

    pub fn is_crouching(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.crouching)
    }

    pub fn is_airborne(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.airborne)
    }

    pub fn is_on_ground(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.on_ground)
    }

    fn animation_for(&self, slot: AnimSlot) -> &Animation {
        let extra = self.player.as_ref().map(|p| &p.anims);
        match (slot, extra) {
            (AnimSlot::Left, _) => &self.anims.left,
            (AnimSlot::Right, _) => &self.anims.right,
            (AnimSlot::DeadLeft, _) => &self.anims.dead_left,
            (AnimSlot::DeadRight, _) => &self.anims.dead_right,
            (AnimSlot::RunLeft, Some(a)) => &a.run_left,
            (AnimSlot::RunRight, Some(a)) => &a.run_right,
            (AnimSlot::JumpLeft, Some(a)) => &a.jump_left,
            (AnimSlot::JumpRight, Some(a)) => &a.jump_right,
            (AnimSlot::CrouchLeft, Some(a)) => &a.crouch_left,
            (AnimSlot::CrouchRight, Some(a)) => &a.crouch_right,
            (_, None) => &self.anims.left,
        }
    }

    fn enemy_slot(&self) -> AnimSlot {
        let mut slot = self.slot;
        if self.sprite.vx() < 0.0 {
            slot = AnimSlot::Left;
        } else if self.sprite.vx() > 0.0 {
            slot = AnimSlot::Right;
        }
        if self.state == CreatureState::Dying {
            slot = match slot {
                AnimSlot::Left => AnimSlot::DeadLeft,
                AnimSlot::Right => AnimSlot::DeadRight,
                other => other,
            };
        }
        slot
    }

    fn player_slot(&mut self) -> AnimSlot {
        let vx = self.sprite.vx();
        let vy = self.sprite.vy();
        let dying = self.state == CreatureState::Dying;
        let mut slot = self.slot;
        let Some(p) = self.player.as_mut() else {
            return slot;
        };

        if vx < 0.0 {
            if !p.airborne {
                slot = AnimSlot::RunLeft;
            }
            p.facing_right = false;
        } else if vx > 0.0 {
            if !p.airborne {
                slot = AnimSlot::RunRight;
            }
            p.facing_right = true;
        } else {
            slot = match (p.facing_right, p.crouching, p.airborne) {
                (true, true, _) => AnimSlot::CrouchRight,
                (false, true, _) => AnimSlot::CrouchLeft,
                (true, false, true) => AnimSlot::JumpRight,
                (false, false, true) => AnimSlot::JumpLeft,
                (true, false, false) => AnimSlot::Right,
                (false, false, false) => AnimSlot::Left,
            };
        }

        if vy < 0.0 {
            slot = if p.facing_right {
                AnimSlot::JumpRight
            } else {
                AnimSlot::JumpLeft
            };
            p.airborne = true;
        }

        if dying {
            slot = if p.facing_right {
                AnimSlot::DeadRight
            } else {
                AnimSlot::DeadLeft
            };
        }
        slot
    }

    /// Picks the animation for the current motion, advances it and the
    /// state timer. A creature that has been dying long enough becomes dead.
    pub fn update(&mut self, elapsed: u64) {
        let slot = if self.player.is_some() {
            self.player_slot()
        } else {
            self.enemy_slot()
        };

        if slot != self.slot {
            self.slot = slot;
            self.sprite.anim = self.animation_for(slot).clone();
        } else {
            self.sprite.anim.update(elapsed);
        }

        self.state_time += elapsed;
        if self.state == CreatureState::Dying && self.state_time >= self.kind.die_time() {
            self.set_state(CreatureState::Dead);
        }
    }
}

impl Prototype for Creature {
    fn instantiate(&self) -> Self {
        match &self.player {
            Some(p) => Creature::new_player(self.anims.clone(), p.anims.clone()),
            None => Creature::new(self.kind, self.anims.clone()),
        }
    }
}

impl Positioned for Creature {
    fn sprite(&self) -> &Sprite {
        &self.sprite
    }
}

impl Animated for Creature {
    fn update(&mut self, elapsed: u64) {
        Creature::update(self, elapsed);
    }
}

impl Collidable for Creature {
    fn is_collidable(&self) -> bool {
        self.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::animation::ImageRef;

    fn anim(name: &str) -> Animation {
        Animation::from_frames([
            (ImageRef::new(format!("{name}1"), 20, 24), 200),
            (ImageRef::new(format!("{name}2"), 20, 24), 200),
        ])
    }

    fn enemy(kind: CreatureKind) -> Creature {
        Creature::new(
            kind,
            CreatureAnimations {
                left: anim("l"),
                right: anim("r"),
                dead_left: anim("dl"),
                dead_right: anim("dr"),
            },
        )
    }

    fn player() -> Creature {
        Creature::new_player(
            CreatureAnimations {
                left: anim("l"),
                right: anim("r"),
                dead_left: anim("dl"),
                dead_right: anim("dr"),
            },
            PlayerAnimations {
                run_left: anim("rl"),
                run_right: anim("rr"),
                jump_left: anim("jl"),
                jump_right: anim("jr"),
                crouch_left: anim("cl"),
                crouch_right: anim("cr"),
            },
        )
    }

    fn land(p: &mut Creature) {
        p.sprite.set_vy(0.1);
        p.collide_vertical();
    }

    #[test]
    fn test_kind_speeds_and_fliers() {
        assert_eq!(CreatureKind::Goomba.max_speed(), 0.1);
        assert_eq!(CreatureKind::Bat.max_speed(), 0.2);
        assert_eq!(CreatureKind::Bullet.max_speed(), 0.25);
        assert!(CreatureKind::FlyGoomba.is_flier());
        assert!(!CreatureKind::Turtle.is_flier());
        assert_eq!(CreatureKind::from_map_char('%'), Some(CreatureKind::BlueDragon));
        assert_eq!(CreatureKind::from_map_char('x'), None);
    }

    #[test]
    fn test_dying_zeroes_velocity_and_times_out() {
        let mut g = enemy(CreatureKind::Goomba);
        g.sprite.set_vx(-0.1);
        g.set_state(CreatureState::Dying);
        assert_eq!(g.sprite.vx(), 0.0);
        assert!(!g.is_alive());
        g.update(499);
        assert_eq!(g.state(), CreatureState::Dying);
        g.update(1);
        assert_eq!(g.state(), CreatureState::Dead);
    }

    #[test]
    fn test_flier_falls_once_dying() {
        let mut bat = enemy(CreatureKind::Bat);
        assert!(bat.is_flying());
        bat.set_state(CreatureState::Dying);
        assert!(!bat.is_flying());
    }

    #[test]
    fn test_wake_up_only_when_resting() {
        let mut g = enemy(CreatureKind::Goomba);
        g.wake_up();
        assert_eq!(g.sprite.vx(), -0.1);
        g.sprite.set_vx(0.1);
        g.wake_up();
        assert_eq!(g.sprite.vx(), 0.1);

        let mut p = player();
        p.wake_up();
        assert_eq!(p.sprite.vx(), 0.0);
    }

    #[test]
    fn test_enemy_bounces_player_stops() {
        let mut g = enemy(CreatureKind::Goomba);
        g.sprite.set_vx(-0.1);
        g.collide_horizontal();
        assert_eq!(g.sprite.vx(), 0.1);

        let mut p = player();
        p.sprite.set_vx(0.3);
        p.collide_horizontal();
        assert_eq!(p.sprite.vx(), 0.0);
    }

    #[test]
    fn test_enemy_animation_follows_direction() {
        let mut g = enemy(CreatureKind::Goomba);
        g.sprite.set_vx(0.1);
        g.update(10);
        assert_eq!(g.anim_slot(), AnimSlot::Right);
        g.set_state(CreatureState::Dying);
        g.update(10);
        assert_eq!(g.anim_slot(), AnimSlot::DeadRight);
        assert_eq!(&*g.sprite.image().unwrap().texture, "dr1");
    }

    #[test]
    fn test_enemy_faces_right_until_woken() {
        let mut g = enemy(CreatureKind::Goomba);
        assert_eq!(g.anim_slot(), AnimSlot::Right);
        assert_eq!(&*g.sprite.image().unwrap().texture, "r1");
        g.update(10);
        assert_eq!(g.anim_slot(), AnimSlot::Right);

        g.wake_up();
        g.update(10);
        assert_eq!(g.anim_slot(), AnimSlot::Left);
        assert_eq!(&*g.sprite.image().unwrap().texture, "l1");
    }

    #[test]
    fn test_animation_switch_restarts_playhead() {
        let mut g = enemy(CreatureKind::Goomba);
        g.update(300);
        assert_eq!(g.sprite.anim.frame_index(), 1);
        g.sprite.set_vx(-0.1);
        g.update(300);
        assert_eq!(g.anim_slot(), AnimSlot::Left);
        assert_eq!(g.sprite.anim.frame_index(), 0);
    }

    #[test]
    fn test_player_jump_from_ground_only() {
        let mut p = player();
        p.jump(false);
        assert_eq!(p.sprite.vy(), 0.0);
        assert!(p.is_airborne());

        land(&mut p);
        assert!(p.is_on_ground());
        assert!(!p.is_airborne());
        p.jump(false);
        assert_eq!(p.sprite.vy(), JUMP_SPEED);
        assert!(!p.is_on_ground());
        assert!(p.is_airborne());
    }

    #[test]
    fn test_player_forced_jump_in_air() {
        let mut p = player();
        p.jump(true);
        assert_eq!(p.sprite.vy(), JUMP_SPEED);
    }

    #[test]
    fn test_player_falling_leaves_ground() {
        let mut p = player();
        land(&mut p);
        p.set_y(0.4);
        assert!(p.is_on_ground());
        p.set_y(1.0);
        assert!(!p.is_on_ground());
    }

    #[test]
    fn test_player_animation_selection() {
        let mut p = player();
        land(&mut p);
        p.sprite.set_vx(-0.3);
        p.update(10);
        assert_eq!(p.anim_slot(), AnimSlot::RunLeft);

        p.sprite.set_vx(0.0);
        p.set_crouching(true);
        p.update(10);
        assert_eq!(p.anim_slot(), AnimSlot::CrouchLeft);

        p.set_crouching(false);
        p.sprite.set_vy(-0.5);
        p.update(10);
        assert_eq!(p.anim_slot(), AnimSlot::JumpLeft);
        assert!(p.is_airborne());

        p.set_state(CreatureState::Dying);
        p.update(10);
        assert_eq!(p.anim_slot(), AnimSlot::DeadLeft);
    }

    #[test]
    fn test_player_dies_slowly() {
        let mut p = player();
        p.set_state(CreatureState::Dying);
        p.update(3499);
        assert_eq!(p.state(), CreatureState::Dying);
        p.update(1);
        assert_eq!(p.state(), CreatureState::Dead);
    }

    #[test]
    fn test_instantiate_is_fresh() {
        let mut g = enemy(CreatureKind::RedKoopa);
        g.sprite.set_position(40.0, 50.0);
        g.set_state(CreatureState::Dying);
        let copy = g.instantiate();
        assert_eq!(copy.kind(), CreatureKind::RedKoopa);
        assert!(copy.is_alive());
        assert_eq!(copy.x(), 0.0);
        assert!(!copy.is_player());
        assert!(player().instantiate().is_player());
    }
}

//! Game actions and their keyboard bindings.
//!
//! Keys are not read directly by the game logic. Each key drives a
//! [`GameAction`], and the simulation asks the action whether it fired since
//! the last check. Reading an action consumes it, so every action should be
//! queried at most once per frame.
use bevy_ecs::prelude::*;
use raylib::prelude::*;

/// How an action reports a key that stays held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBehavior {
    /// Reports pressed on every check while held.
    Normal,
    /// Reports pressed once, then waits for a release.
    InitialPressOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionState {
    Released,
    Pressed,
    WaitingForRelease,
}

/// A named input with an accumulated press amount.
#[derive(Debug, Clone)]
pub struct GameAction {
    name: &'static str,
    behavior: ActionBehavior,
    amount: u32,
    state: ActionState,
    /// The key bound to this action.
    pub key_binding: KeyboardKey,
}

impl GameAction {
    pub fn new(name: &'static str, behavior: ActionBehavior, key_binding: KeyboardKey) -> Self {
        GameAction {
            name,
            behavior,
            amount: 0,
            state: ActionState::Released,
            key_binding,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn behavior(&self) -> ActionBehavior {
        self.behavior
    }

    /// Clears the action as if the key had never been pressed.
    pub fn reset(&mut self) {
        self.state = ActionState::Released;
        self.amount = 0;
    }

    /// Press and release in one go.
    pub fn tap(&mut self) {
        self.press();
        self.release();
    }

    pub fn press(&mut self) {
        self.press_amount(1);
    }

    /// Ignored while an initial-press-only action waits for its release.
    pub fn press_amount(&mut self, amount: u32) {
        if self.state != ActionState::WaitingForRelease {
            self.amount += amount;
            self.state = ActionState::Pressed;
        }
    }

    pub fn release(&mut self) {
        self.state = ActionState::Released;
    }

    /// Whether the action fired since the last check. Consumes the press.
    pub fn is_pressed(&mut self) -> bool {
        self.amount() != 0
    }

    /// Presses accumulated since the last check. Consumes them unless the
    /// key is still held on a normal action.
    pub fn amount(&mut self) -> u32 {
        let value = self.amount;
        if value != 0 {
            if self.state == ActionState::Released {
                self.amount = 0;
            } else if self.behavior == ActionBehavior::InitialPressOnly {
                self.state = ActionState::WaitingForRelease;
                self.amount = 0;
            }
        }
        value
    }
}

/// Every action the game reads, each bound to one key.
#[derive(Resource, Debug, Clone)]
pub struct InputState {
    pub move_left: GameAction,
    pub move_right: GameAction,
    pub move_down: GameAction,
    pub jump: GameAction,
    pub exit: GameAction,
    pub run: GameAction,
    pub pause: GameAction,
}

impl Default for InputState {
    fn default() -> Self {
        use ActionBehavior::{InitialPressOnly, Normal};
        Self {
            move_left: GameAction::new("moveLeft", Normal, KeyboardKey::KEY_LEFT),
            move_right: GameAction::new("moveRight", Normal, KeyboardKey::KEY_RIGHT),
            move_down: GameAction::new("moveDown", Normal, KeyboardKey::KEY_DOWN),
            jump: GameAction::new("jump", InitialPressOnly, KeyboardKey::KEY_SPACE),
            exit: GameAction::new("exit", InitialPressOnly, KeyboardKey::KEY_ESCAPE),
            run: GameAction::new("run", Normal, KeyboardKey::KEY_LEFT_CONTROL),
            pause: GameAction::new("pause", InitialPressOnly, KeyboardKey::KEY_P),
        }
    }
}

impl InputState {
    pub fn actions_mut(&mut self) -> [&mut GameAction; 7] {
        [
            &mut self.move_left,
            &mut self.move_right,
            &mut self.move_down,
            &mut self.jump,
            &mut self.exit,
            &mut self.run,
            &mut self.pause,
        ]
    }

    pub fn reset_all(&mut self) {
        for action in self.actions_mut() {
            action.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal() -> GameAction {
        GameAction::new("n", ActionBehavior::Normal, KeyboardKey::KEY_NULL)
    }

    fn edge() -> GameAction {
        GameAction::new("e", ActionBehavior::InitialPressOnly, KeyboardKey::KEY_NULL)
    }

    #[test]
    fn test_normal_repeats_while_held() {
        let mut a = normal();
        a.press();
        assert!(a.is_pressed());
        assert!(a.is_pressed());
        a.release();
        // the press before the release is still reported once
        assert!(a.is_pressed());
        assert!(!a.is_pressed());
    }

    #[test]
    fn test_initial_press_fires_once() {
        let mut a = edge();
        a.press();
        assert!(a.is_pressed());
        assert!(!a.is_pressed());
        // held key repeats are ignored until release
        a.press();
        assert!(!a.is_pressed());
        a.release();
        a.press();
        assert!(a.is_pressed());
    }

    #[test]
    fn test_tap_reports_once() {
        let mut a = normal();
        a.tap();
        assert_eq!(a.amount(), 1);
        assert_eq!(a.amount(), 0);
    }

    #[test]
    fn test_amount_accumulates() {
        let mut a = normal();
        a.press_amount(3);
        a.press();
        a.release();
        assert_eq!(a.amount(), 4);
    }

    #[test]
    fn test_reset_all_clears_everything() {
        let mut input = InputState::default();
        input.jump.press();
        input.move_left.press();
        input.reset_all();
        assert!(!input.jump.is_pressed());
        assert!(!input.move_left.is_pressed());
    }

    #[test]
    fn test_default_key_bindings() {
        let input = InputState::default();
        assert_eq!(input.move_left.key_binding, KeyboardKey::KEY_LEFT);
        assert_eq!(input.jump.key_binding, KeyboardKey::KEY_SPACE);
        assert_eq!(input.exit.key_binding, KeyboardKey::KEY_ESCAPE);
        assert_eq!(input.run.key_binding, KeyboardKey::KEY_LEFT_CONTROL);
        assert_eq!(input.pause.key_binding, KeyboardKey::KEY_P);
        assert_eq!(input.pause.behavior(), ActionBehavior::InitialPressOnly);
        assert_eq!(input.run.behavior(), ActionBehavior::Normal);
    }
}

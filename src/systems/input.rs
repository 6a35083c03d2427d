//! Input systems.
//!
//! [`update_input_state`] reads hardware input from Raylib each frame and
//! feeds key transitions into the actions of
//! [`crate::resources::input::InputState`].
use bevy_ecs::prelude::*;

use crate::resources::input::InputState;

/// Poll Raylib for keyboard input and update the `InputState` resource.
///
/// Only transitions are forwarded: a key going down presses its action and a
/// key coming up releases it. Holding is tracked by the action itself.
pub fn update_input_state(mut input: ResMut<InputState>, rl: NonSendMut<raylib::RaylibHandle>) {
    for action in input.actions_mut() {
        let key = action.key_binding;
        if rl.is_key_pressed(key) {
            action.press();
        }
        if rl.is_key_released(key) {
            action.release();
        }
    }
}

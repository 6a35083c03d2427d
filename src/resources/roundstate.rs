//! Counters and flags of the game in progress.
//!
//! The simulation receives the round state by exclusive reference for the
//! whole frame. Collision handlers update the counters and queue sounds and
//! music changes in [`RoundState::effects`]; the audio dispatch system
//! drains them once the frame's update is done.
use bevy_ecs::prelude::Resource;

use crate::events::effects::{GameEffect, MusicCue, SoundCue};

/// Length of the opening transition, in frames.
pub const OPENING_FRAMES: u32 = 50;
/// How long the game-over screen stays up, in frames.
pub const GAME_OVER_FRAMES: u32 = 120;
pub const DEFAULT_LIVES: u32 = 5;
/// Points moved from the level score to the total per frame while advancing.
pub const POINT_TRANSFER_STEP: u32 = 10;

#[derive(Resource, Debug, Clone)]
pub struct RoundState {
    pub lives: u32,
    /// Points banked from finished levels.
    pub score: u32,
    /// Points earned on the current level.
    pub level_score: u32,
    pub coins: u32,
    /// Goals reached; picks the next level's music and background.
    pub stars: u32,
    pub paused: bool,
    /// Between touching the goal and loading the next map.
    pub advancing: bool,
    pub game_over: bool,
    pub quit: bool,
    /// The level-end fanfare has been started and not reported finished.
    pub fanfare_playing: bool,
    pub opening_frame: u32,
    pub game_over_frame: u32,
    /// Number of levels before the game reports completion.
    pub level_count: u32,
    pub effects: Vec<GameEffect>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(DEFAULT_LIVES, 3)
    }
}

impl RoundState {
    pub fn new(lives: u32, level_count: u32) -> Self {
        RoundState {
            lives,
            score: 0,
            level_score: 0,
            coins: 0,
            stars: 0,
            paused: false,
            advancing: false,
            game_over: false,
            quit: false,
            fanfare_playing: false,
            opening_frame: 0,
            game_over_frame: 0,
            level_count,
            effects: Vec::new(),
        }
    }

    pub fn push(&mut self, effect: GameEffect) {
        self.effects.push(effect);
    }

    pub fn play(&mut self, cue: SoundCue) {
        self.push(GameEffect::Sound(cue));
    }

    pub fn play_music(&mut self, cue: MusicCue, looped: bool) {
        self.push(GameEffect::PlayMusic { cue, looped });
    }

    pub fn stop_music(&mut self) {
        self.push(GameEffect::StopMusic);
    }

    pub fn drain_effects(&mut self) -> Vec<GameEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn opening_finished(&self) -> bool {
        self.opening_frame >= OPENING_FRAMES
    }

    /// Index used to pick the current level's music and background. Wraps
    /// once every level has been played.
    pub fn theme_index(&self) -> u32 {
        match self.level_count {
            0 => self.stars,
            n => self.stars % n,
        }
    }

    /// Id of the music for the current level.
    pub fn level_music_id(&self) -> String {
        format!("music{}", self.theme_index())
    }

    /// Every level has been finished at least once.
    pub fn game_complete(&self) -> bool {
        self.level_count > 0 && self.stars >= self.level_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round() {
        let round = RoundState::default();
        assert_eq!(round.lives, DEFAULT_LIVES);
        assert_eq!(round.score, 0);
        assert!(!round.opening_finished());
        assert_eq!(round.level_music_id(), "music0");
    }

    #[test]
    fn test_drain_effects_empties_queue() {
        let mut round = RoundState::default();
        round.play(SoundCue::Coin);
        round.stop_music();
        let drained = round.drain_effects();
        assert_eq!(
            drained,
            vec![GameEffect::Sound(SoundCue::Coin), GameEffect::StopMusic]
        );
        assert!(round.effects.is_empty());
    }

    #[test]
    fn test_game_complete() {
        let mut round = RoundState::new(5, 2);
        round.stars = 1;
        assert!(!round.game_complete());
        round.stars = 2;
        assert!(round.game_complete());
        assert_eq!(round.level_music_id(), "music0");
        round.stars = 3;
        assert_eq!(round.level_music_id(), "music1");
    }
}

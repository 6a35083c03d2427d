//! Side effects requested by the simulation.
//!
//! Collision handlers and input code never talk to the audio backends
//! directly. They queue a [`GameEffect`] on the round state and the audio
//! dispatch system plays it after the frame's update has run.
use crate::components::sprite::SharedPosition;

/// Short sampled sounds played through the voice pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Coin,
    Stomp,
    OneUp,
    Death,
    Jump,
    PowerUp,
}

impl SoundCue {
    pub const ALL: [SoundCue; 6] = [
        SoundCue::Coin,
        SoundCue::Stomp,
        SoundCue::OneUp,
        SoundCue::Death,
        SoundCue::Jump,
        SoundCue::PowerUp,
    ];

    /// File name under the `sounds` asset folder.
    pub fn file_name(self) -> &'static str {
        match self {
            SoundCue::Coin => "coin.wav",
            SoundCue::Stomp => "stomp.wav",
            SoundCue::OneUp => "1-up.wav",
            SoundCue::Death => "death.wav",
            SoundCue::Jump => "jump.wav",
            SoundCue::PowerUp => "powerup.wav",
        }
    }
}

/// Which piece of music to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicCue {
    /// The music of the current level, chosen by the number of stars.
    Level,
    LevelEnd,
    GameOver,
}

#[derive(Debug, Clone)]
pub enum GameEffect {
    Sound(SoundCue),
    /// Played through an echo filter.
    EchoSound(SoundCue),
    /// Attenuated by the distance between `source` and `listener`.
    PositionalSound {
        cue: SoundCue,
        source: SharedPosition,
        listener: SharedPosition,
    },
    StopMusic,
    PlayMusic { cue: MusicCue, looped: bool },
    PauseVoices(bool),
}

impl PartialEq for GameEffect {
    /// Positional sounds compare by cue only.
    fn eq(&self, other: &Self) -> bool {
        use GameEffect::*;
        match (self, other) {
            (Sound(a), Sound(b)) | (EchoSound(a), EchoSound(b)) => a == b,
            (PositionalSound { cue: a, .. }, PositionalSound { cue: b, .. }) => a == b,
            (StopMusic, StopMusic) => true,
            (
                PlayMusic { cue: a, looped: la },
                PlayMusic { cue: b, looped: lb },
            ) => a == b && la == lb,
            (PauseVoices(a), PauseVoices(b)) => a == b,
            _ => false,
        }
    }
}

impl GameEffect {
    /// The sound this effect plays, if any.
    pub fn sound_cue(&self) -> Option<SoundCue> {
        match self {
            GameEffect::Sound(cue)
            | GameEffect::EchoSound(cue)
            | GameEffect::PositionalSound { cue, .. } => Some(*cue),
            _ => None,
        }
    }
}

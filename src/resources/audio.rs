//! ECS resources for sound effects and the background music thread.
//!
//! Use [`setup_music`] once during initialization to spawn the music thread
//! and insert the [`MusicBridge`], [`MusicState`] and message resources.
//! Call [`shutdown_music`] during teardown to stop the thread and free its
//! streams.
//!
//! Sampled effects go through [`SoundPlayer`], which owns the voice pool
//! and the decoded clips.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::components::sprite::SharedPosition;
use crate::events::audio::{MusicCmd, MusicMessage};
use crate::events::effects::SoundCue;
use crate::sound::device::AudioDevice;
use crate::sound::echo::EchoFilter;
use crate::sound::filter3d::Filter3d;
use crate::sound::pool::VoicePool;
use crate::sound::sound::{PcmFormat, Sound};
use crate::systems::audio::music_thread;

/// Id of the tune played after reaching a goal.
pub const LEVEL_END_MUSIC: &str = "musicLevelEnd";
/// Id of the tune played on the game-over screen.
pub const GAME_OVER_MUSIC: &str = "musicGameOver";
/// Stem muted when the game starts.
pub const DRUM_TRACK: &str = "drums";
/// Distance in pixels at which positional sounds fade out completely.
pub const MAX_SOUND_DISTANCE: f32 = 500.0;

/// Shared bridge between the ECS world and the music thread.
///
/// This resource is created by [`setup_music`]. Systems send commands via
/// [`MusicBridge::tx_cmd`] and poll replies via [`MusicBridge::rx_msg`].
#[derive(Resource)]
pub struct MusicBridge {
    /// Sender for [`MusicCmd`] messages (ECS -> music thread).
    pub tx_cmd: Sender<MusicCmd>,
    /// Receiver for [`MusicMessage`] messages (music thread -> ECS).
    pub rx_msg: Receiver<MusicMessage>,
    /// Join handle for the background music thread.
    pub handle: std::thread::JoinHandle<()>,
}

/// The piece of music the game last started.
#[derive(Resource, Debug, Default, Clone)]
pub struct MusicState {
    pub current: Option<String>,
}

/// Spawn the music thread and register bridge resources.
pub fn setup_music(world: &mut World) {
    let (tx_cmd, rx_cmd) = unbounded::<MusicCmd>();
    let (tx_msg, rx_msg) = unbounded::<MusicMessage>();

    let handle = std::thread::spawn(move || music_thread(rx_cmd, tx_msg));

    world.insert_resource(MusicBridge {
        tx_cmd,
        rx_msg,
        handle,
    });
    world.insert_resource(MusicState::default());
    world.insert_resource(Messages::<MusicMessage>::default());
    world.insert_resource(Messages::<MusicCmd>::default());
}

/// Gracefully request shutdown of the music thread and join it.
pub fn shutdown_music(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<MusicBridge>() {
        let _ = bridge.tx_cmd.send(MusicCmd::Shutdown);
        let _ = bridge.handle.join();
    }
}

/// Load commands for every piece of music found in `dir`.
///
/// Level tunes are `music0.ogg` .. `music<level_count - 1>.ogg`; stems sit
/// next to them as `<id>.<track>.ogg`. Missing files are skipped, so asking
/// to play them later just fails. Drums start muted.
pub fn music_load_commands(dir: &Path, level_count: u32) -> Vec<MusicCmd> {
    let mut ids: Vec<String> = (0..level_count.max(1)).map(|n| format!("music{}", n)).collect();
    ids.push(LEVEL_END_MUSIC.to_string());
    ids.push(GAME_OVER_MUSIC.to_string());

    let mut cmds = Vec::new();
    for id in ids {
        let path = dir.join(format!("{}.ogg", id));
        if !path.is_file() {
            warn!("music '{}' not found at {}", id, path.display());
            continue;
        }
        cmds.push(MusicCmd::LoadMusic {
            id: id.clone(),
            path: path.display().to_string(),
        });
        let stem = dir.join(format!("{}.{}.ogg", id, DRUM_TRACK));
        if stem.is_file() {
            cmds.push(MusicCmd::LoadStem {
                id: id.clone(),
                track: DRUM_TRACK.to_string(),
                path: stem.display().to_string(),
            });
            cmds.push(MusicCmd::MuteTrack {
                id,
                track: DRUM_TRACK.to_string(),
                muted: true,
            });
        }
    }
    cmds
}

/// Decoded clips for every [`SoundCue`] that could be loaded.
#[derive(Debug, Default, Clone)]
pub struct SoundBank {
    sounds: FxHashMap<SoundCue, Sound>,
}

impl SoundBank {
    /// Missing or unreadable files are logged and left out.
    pub fn load(dir: &Path, format: PcmFormat) -> Self {
        let mut sounds = FxHashMap::default();
        for cue in SoundCue::ALL {
            match Sound::load_wav(&dir.join(cue.file_name()), format) {
                Ok(sound) => {
                    sounds.insert(cue, sound);
                }
                Err(e) => warn!("sound {:?} unavailable: {}", cue, e),
            }
        }
        info!("loaded {} of {} sounds", sounds.len(), SoundCue::ALL.len());
        SoundBank { sounds }
    }

    pub fn insert(&mut self, cue: SoundCue, sound: Sound) {
        self.sounds.insert(cue, sound);
    }

    pub fn get(&self, cue: SoundCue) -> Option<&Sound> {
        self.sounds.get(&cue)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

/// Plays sound cues through the voice pool.
///
/// Without a pool (audio disabled) every call is a no-op. Failures to queue
/// a sound are logged and the sound is dropped.
#[derive(Resource)]
pub struct SoundPlayer {
    pool: Option<VoicePool>,
    bank: SoundBank,
    echo_delay_ms: u32,
    echo_decay: f32,
}

impl SoundPlayer {
    pub fn new(
        device: Arc<dyn AudioDevice>,
        bank: SoundBank,
        format: PcmFormat,
        voices: usize,
        buffer_ms: u32,
    ) -> Self {
        SoundPlayer {
            pool: Some(VoicePool::new(device, format, voices, buffer_ms)),
            bank,
            echo_delay_ms: 250,
            echo_decay: 0.5,
        }
    }

    pub fn disabled() -> Self {
        SoundPlayer {
            pool: None,
            bank: SoundBank::default(),
            echo_delay_ms: 250,
            echo_decay: 0.5,
        }
    }

    /// Echo applied to [`SoundPlayer::play_echo`]. `decay` must be in (0, 1).
    pub fn with_echo(mut self, delay_ms: u32, decay: f32) -> Self {
        self.echo_delay_ms = delay_ms;
        self.echo_decay = decay;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    fn clip(&self, cue: SoundCue) -> Option<(&VoicePool, &Sound)> {
        let pool = self.pool.as_ref()?;
        match self.bank.get(cue) {
            Some(sound) => Some((pool, sound)),
            None => {
                debug!("no clip for {:?}", cue);
                None
            }
        }
    }

    pub fn play(&self, cue: SoundCue) {
        if let Some((pool, sound)) = self.clip(cue)
            && let Err(e) = pool.play(sound)
        {
            debug!("dropped {:?}: {}", cue, e);
        }
    }

    pub fn play_echo(&self, cue: SoundCue) {
        if let Some((pool, sound)) = self.clip(cue) {
            let rate = pool.format().sample_rate;
            let echo = EchoFilter::from_millis(self.echo_delay_ms, rate, self.echo_decay);
            if let Err(e) = pool.play_filtered(sound, echo) {
                debug!("dropped {:?}: {}", cue, e);
            }
        }
    }

    pub fn play_positional(&self, cue: SoundCue, source: SharedPosition, listener: SharedPosition) {
        if let Some((pool, sound)) = self.clip(cue) {
            let filter = Filter3d::new(source, listener, MAX_SOUND_DISTANCE);
            if let Err(e) = pool.play_filtered(sound, filter) {
                debug!("dropped {:?}: {}", cue, e);
            }
        }
    }

    pub fn set_paused(&self, paused: bool) {
        if let Some(pool) = &self.pool {
            pool.set_paused(paused);
        }
    }

    /// Stops the pool. Returns false if a voice thread did not stop in time.
    pub fn close(&mut self, timeout: Duration) -> bool {
        match self.pool.as_mut() {
            Some(pool) => pool.close(timeout),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_commands_skip_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("music0.ogg"), b"x").unwrap();
        std::fs::write(dir.path().join("music0.drums.ogg"), b"x").unwrap();
        std::fs::write(dir.path().join("musicLevelEnd.ogg"), b"x").unwrap();

        let cmds = music_load_commands(dir.path(), 2);
        assert_eq!(cmds.len(), 4);
        assert!(matches!(&cmds[0], MusicCmd::LoadMusic { id, .. } if id == "music0"));
        assert!(matches!(&cmds[1], MusicCmd::LoadStem { track, .. } if track == DRUM_TRACK));
        assert!(matches!(&cmds[2], MusicCmd::MuteTrack { muted: true, .. }));
        assert!(matches!(&cmds[3], MusicCmd::LoadMusic { id, .. } if id == LEVEL_END_MUSIC));
    }

    #[test]
    fn test_bank_skips_missing_sounds() {
        let dir = tempfile::tempdir().unwrap();
        let bank = SoundBank::load(dir.path(), PcmFormat::default());
        assert!(bank.is_empty());
    }

    #[test]
    fn test_disabled_player_ignores_requests() {
        let mut player = SoundPlayer::disabled();
        player.play(SoundCue::Coin);
        player.play_echo(SoundCue::Death);
        player.set_paused(true);
        assert!(!player.is_enabled());
        assert!(player.close(Duration::from_millis(10)));
    }
}

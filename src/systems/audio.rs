//! Audio systems backed by a dedicated music thread and the voice pool.
//!
//! This module hosts the background music thread and the systems that bridge
//! it and the voice pool with the ECS world:
//! - [`music_thread`] runs on its own OS thread, owns the Raylib audio device,
//!   and processes [`MusicCmd`] messages, emitting [`MusicMessage`] replies.
//! - [`dispatch_effects`] turns the sounds and music changes queued on the
//!   round state into voice pool requests and music commands.
//! - [`forward_music_cmds`] and [`poll_music_messages`] move messages across
//!   the channels; [`track_fanfare`] notices when the level-end tune stops.
//!
//! Notes
//! - The music thread must be created once via
//!   [`crate::resources::audio::setup_music`] and joined via
//!   [`crate::resources::audio::shutdown_music`].
//! - Music streaming requires periodic `update_stream()` calls; the thread's
//!   loop takes care of it while tracks are playing.
//! - A piece of music may carry stems that start, stop and loop with it.
//!   Muted stems keep playing at zero volume so they stay in sync.

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use raylib::core::audio::{Music, RaylibAudio};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::events::audio::{MusicCmd, MusicMessage};
use crate::events::effects::{GameEffect, MusicCue};
use crate::resources::audio::{
    GAME_OVER_MUSIC, LEVEL_END_MUSIC, MusicBridge, MusicState, SoundPlayer,
};
use crate::resources::roundstate::RoundState;

/// Drain pending replies from the music thread into the ECS
/// [`Messages<MusicMessage>`] mailbox.
pub fn poll_music_messages(bridge: Res<MusicBridge>, mut writer: MessageWriter<MusicMessage>) {
    writer.write_batch(bridge.rx_msg.try_iter());
}

/// Advance the ECS message queue for [`MusicMessage`].
pub fn update_bevy_music_messages(mut msgs: ResMut<Messages<MusicMessage>>) {
    msgs.update();
}

/// Forward ECS MusicCmd messages to the music thread via the bridge sender.
pub fn forward_music_cmds(bridge: Res<MusicBridge>, mut reader: MessageReader<MusicCmd>) {
    for cmd in reader.read() {
        // ignore send error on shutdown
        let _ = bridge.tx_cmd.send(cmd.clone());
    }
}

/// Advance the ECS message queue for MusicCmd so same-frame readers can observe writes.
pub fn update_bevy_music_cmds(mut msgs: ResMut<Messages<MusicCmd>>) {
    msgs.update();
}

/// Music id for a cue, given the current round.
pub fn music_id(cue: MusicCue, round: &RoundState) -> String {
    match cue {
        MusicCue::Level => round.level_music_id(),
        MusicCue::LevelEnd => LEVEL_END_MUSIC.to_string(),
        MusicCue::GameOver => GAME_OVER_MUSIC.to_string(),
    }
}

/// Music commands for one effect, updating what is considered playing.
pub fn music_commands(
    effect: &GameEffect,
    round: &RoundState,
    state: &mut MusicState,
) -> Vec<MusicCmd> {
    match effect {
        GameEffect::StopMusic => state
            .current
            .take()
            .map(|id| vec![MusicCmd::StopMusic { id }])
            .unwrap_or_default(),
        GameEffect::PlayMusic { cue, looped } => {
            let id = music_id(*cue, round);
            let mut cmds = Vec::with_capacity(2);
            if let Some(old) = state.current.take()
                && old != id
            {
                cmds.push(MusicCmd::StopMusic { id: old });
            }
            cmds.push(MusicCmd::PlayMusic {
                id: id.clone(),
                looped: *looped,
            });
            state.current = Some(id);
            cmds
        }
        _ => Vec::new(),
    }
}

/// Plays everything the simulation queued this frame.
///
/// Without a music thread the level-end fanfare counts as finished at once
/// so level advance does not wait for it.
pub fn dispatch_effects(
    mut round: ResMut<RoundState>,
    player: Res<SoundPlayer>,
    mut music: Option<ResMut<MusicState>>,
    mut cmds: MessageWriter<MusicCmd>,
) {
    let effects = round.drain_effects();
    for effect in &effects {
        match effect {
            GameEffect::Sound(cue) => player.play(*cue),
            GameEffect::EchoSound(cue) => player.play_echo(*cue),
            GameEffect::PositionalSound {
                cue,
                source,
                listener,
            } => player.play_positional(*cue, source.clone(), listener.clone()),
            GameEffect::PauseVoices(paused) => player.set_paused(*paused),
            GameEffect::StopMusic | GameEffect::PlayMusic { .. } => match music.as_deref_mut() {
                Some(state) => {
                    cmds.write_batch(music_commands(effect, &round, state));
                }
                None => {
                    if matches!(
                        effect,
                        GameEffect::PlayMusic {
                            cue: MusicCue::LevelEnd,
                            ..
                        }
                    ) {
                        round.fanfare_playing = false;
                    }
                }
            },
        }
    }
}

/// Clears the fanfare flag once the level-end tune ends or cannot play.
pub fn track_fanfare(mut reader: MessageReader<MusicMessage>, mut round: ResMut<RoundState>) {
    for msg in reader.read() {
        match msg {
            MusicMessage::MusicFinished { id } | MusicMessage::MusicPlayFailed { id, .. }
                if id == LEVEL_END_MUSIC =>
            {
                round.fanfare_playing = false;
            }
            MusicMessage::MusicStopped { id } if id == LEVEL_END_MUSIC => {
                round.fanfare_playing = false;
            }
            _ => {}
        }
    }
}

struct Stem<'a> {
    name: String,
    music: Music<'a>,
    muted: bool,
}

/// A piece of music and the stems that play along with it.
struct Piece<'a> {
    main: Music<'a>,
    stems: Vec<Stem<'a>>,
    volume: f32,
}

impl Piece<'_> {
    fn restart(&self) {
        self.main.seek_stream(0.0);
        self.main.play_stream();
        for stem in &self.stems {
            stem.music.seek_stream(0.0);
            stem.music.play_stream();
        }
        self.apply_volume();
    }

    fn stop(&self) {
        self.main.stop_stream();
        self.stems.iter().for_each(|s| s.music.stop_stream());
    }

    fn pause(&self) {
        self.main.pause_stream();
        self.stems.iter().for_each(|s| s.music.pause_stream());
    }

    fn resume(&self) {
        self.main.resume_stream();
        self.stems.iter().for_each(|s| s.music.resume_stream());
    }

    fn apply_volume(&self) {
        self.main.set_volume(self.volume);
        for stem in &self.stems {
            stem.music.set_volume(if stem.muted { 0.0 } else { self.volume });
        }
    }

    fn pump(&self) {
        self.main.update_stream();
        self.stems.iter().for_each(|s| s.music.update_stream());
    }
}

/// Answers every command with a failure until told to shut down.
fn run_without_device(rx_cmd: Receiver<MusicCmd>, tx_evt: Sender<MusicMessage>, reason: String) {
    for cmd in rx_cmd.iter() {
        let reply = match cmd {
            MusicCmd::LoadMusic { id, .. } | MusicCmd::LoadStem { id, .. } => {
                MusicMessage::MusicLoadFailed {
                    id,
                    error: reason.clone(),
                }
            }
            MusicCmd::PlayMusic { id, .. } => MusicMessage::MusicPlayFailed {
                id,
                error: reason.clone(),
            },
            MusicCmd::Shutdown => break,
            _ => continue,
        };
        let _ = tx_evt.send(reply);
    }
}

/// Entry point of the dedicated music thread.
///
/// Responsibilities:
/// - Initialize the Raylib audio device once for the life of the thread.
/// - Own all `Music` handles, preventing use from other threads.
/// - React to [`MusicCmd`] inputs to load, unload and control playback.
/// - Emit [`MusicMessage`] outputs for state changes.
/// - Periodically pump music streams, restart looped pieces and report
///   non-looped ones finishing.
///
/// When the audio device cannot be opened, the thread keeps running and
/// reports every load and play request as failed.
///
/// This function blocks until it receives [`MusicCmd::Shutdown`].
pub fn music_thread(rx_cmd: Receiver<MusicCmd>, tx_evt: Sender<MusicMessage>) {
    let audio = match RaylibAudio::init_audio_device() {
        Ok(device) => device,
        Err(e) => {
            error!("music disabled, audio device failed: {}", e);
            run_without_device(rx_cmd, tx_evt, e.to_string());
            return;
        }
    };

    info!("music thread starting (id={:?})", std::thread::current().id());

    let mut pieces: FxHashMap<String, Piece> = FxHashMap::default();
    let mut playing: FxHashSet<String> = FxHashSet::default();
    let mut looped: FxHashSet<String> = FxHashSet::default();

    'run: loop {
        // 1) Drain commands
        for cmd in rx_cmd.try_iter() {
            match cmd {
                MusicCmd::LoadMusic { id, path } => match audio.new_music(&path) {
                    Ok(music) => {
                        debug!("music loaded id='{}' path='{}'", id, path);
                        pieces.insert(
                            id.clone(),
                            Piece {
                                main: music,
                                stems: Vec::new(),
                                volume: 1.0,
                            },
                        );
                        let _ = tx_evt.send(MusicMessage::MusicLoaded { id });
                    }
                    Err(e) => {
                        warn!("music load failed id='{}' path='{}' error='{}'", id, path, e);
                        let _ = tx_evt.send(MusicMessage::MusicLoadFailed {
                            id,
                            error: e.to_string(),
                        });
                    }
                },
                MusicCmd::LoadStem { id, track, path } => {
                    let Some(piece) = pieces.get_mut(&id) else {
                        let _ = tx_evt.send(MusicMessage::MusicLoadFailed {
                            id,
                            error: format!("stem '{}' for music that is not loaded", track),
                        });
                        continue;
                    };
                    match audio.new_music(&path) {
                        Ok(music) => {
                            debug!("stem loaded id='{}' track='{}'", id, track);
                            piece.stems.push(Stem {
                                name: track,
                                music,
                                muted: false,
                            });
                        }
                        Err(e) => {
                            warn!("stem load failed id='{}' track='{}' error='{}'", id, track, e);
                            let _ = tx_evt.send(MusicMessage::MusicLoadFailed {
                                id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                MusicCmd::PlayMusic {
                    id,
                    looped: want_loop,
                } => {
                    if let Some(piece) = pieces.get(&id) {
                        debug!("music play id='{}' looped={}", id, want_loop);
                        piece.restart();
                        playing.insert(id.clone());
                        if want_loop {
                            looped.insert(id.clone());
                        } else {
                            looped.remove(&id);
                        }
                        let _ = tx_evt.send(MusicMessage::MusicPlayStarted { id });
                    } else {
                        warn!("music play failed id='{}' reason='not loaded'", id);
                        let _ = tx_evt.send(MusicMessage::MusicPlayFailed {
                            id,
                            error: "not loaded".into(),
                        });
                    }
                }
                MusicCmd::StopMusic { id } => {
                    if let Some(piece) = pieces.get(&id) {
                        debug!("music stop id='{}'", id);
                        piece.stop();
                        playing.remove(&id);
                        looped.remove(&id);
                        let _ = tx_evt.send(MusicMessage::MusicStopped { id });
                    }
                }
                MusicCmd::PauseMusic { id } => {
                    if let Some(piece) = pieces.get(&id) {
                        piece.pause();
                        playing.remove(&id);
                        let _ = tx_evt.send(MusicMessage::MusicStopped { id });
                    }
                }
                MusicCmd::ResumeMusic { id } => {
                    if let Some(piece) = pieces.get(&id) {
                        piece.resume();
                        playing.insert(id.clone());
                        let _ = tx_evt.send(MusicMessage::MusicPlayStarted { id });
                    }
                }
                MusicCmd::VolumeMusic { id, vol } => {
                    if let Some(piece) = pieces.get_mut(&id) {
                        piece.volume = vol.clamp(0.0, 1.0);
                        piece.apply_volume();
                        let _ = tx_evt.send(MusicMessage::MusicVolumeChanged { id, vol });
                    }
                }
                MusicCmd::MuteTrack { id, track, muted } => {
                    if let Some(piece) = pieces.get_mut(&id) {
                        let mut found = false;
                        for stem in piece.stems.iter_mut().filter(|s| s.name == track) {
                            stem.muted = muted;
                            found = true;
                        }
                        if found {
                            piece.apply_volume();
                            let _ = tx_evt.send(MusicMessage::TrackMuted { id, track, muted });
                        }
                    }
                }
                MusicCmd::UnloadMusic { id } => {
                    if pieces.remove(&id).is_some() {
                        playing.remove(&id);
                        looped.remove(&id);
                        let _ = tx_evt.send(MusicMessage::MusicUnloaded { id });
                    }
                }
                MusicCmd::UnloadAllMusic => {
                    pieces.clear();
                    playing.clear();
                    looped.clear();
                    let _ = tx_evt.send(MusicMessage::MusicUnloadedAll);
                }
                MusicCmd::Shutdown => {
                    info!("music shutdown requested");
                    pieces.clear();
                    playing.clear();
                    looped.clear();
                    let _ = tx_evt.send(MusicMessage::MusicUnloadedAll);
                    break 'run;
                }
            }
        }

        // 2) Pump streaming + detect ends
        //    If a piece ended and isn't looped, emit Finished exactly once.
        let mut ended: Vec<String> = Vec::new();
        for id in playing.iter() {
            if let Some(piece) = pieces.get(id) {
                if piece.main.is_stream_playing() {
                    piece.pump();
                } else {
                    let len = piece.main.get_time_length();
                    let played = piece.main.get_time_played();
                    if played >= len - 0.01 {
                        ended.push(id.clone());
                    }
                }
            }
        }
        for id in ended.iter() {
            if looped.contains(id) {
                if let Some(piece) = pieces.get(id) {
                    debug!("music restarting looped id='{}'", id);
                    piece.restart();
                }
            } else {
                debug!("music finished id='{}'", id);
                if let Some(piece) = pieces.get(id) {
                    piece.stop();
                }
                playing.remove(id);
                let _ = tx_evt.send(MusicMessage::MusicFinished { id: id.clone() });
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(10));
    } // 'run

    info!("music thread exiting (id={:?})", std::thread::current().id());

    // pieces drop before `audio`, satisfying lifetimes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_stops_previous_piece() {
        let round = RoundState::default();
        let mut state = MusicState::default();

        let cmds = music_commands(
            &GameEffect::PlayMusic {
                cue: MusicCue::Level,
                looped: true,
            },
            &round,
            &mut state,
        );
        assert_eq!(cmds.len(), 1);
        assert_eq!(state.current.as_deref(), Some("music0"));

        let cmds = music_commands(
            &GameEffect::PlayMusic {
                cue: MusicCue::LevelEnd,
                looped: false,
            },
            &round,
            &mut state,
        );
        assert!(matches!(&cmds[0], MusicCmd::StopMusic { id } if id == "music0"));
        assert!(
            matches!(&cmds[1], MusicCmd::PlayMusic { id, looped: false } if id == LEVEL_END_MUSIC)
        );
    }

    #[test]
    fn test_stop_without_music_is_silent() {
        let round = RoundState::default();
        let mut state = MusicState::default();
        assert!(music_commands(&GameEffect::StopMusic, &round, &mut state).is_empty());

        state.current = Some("music1".into());
        let cmds = music_commands(&GameEffect::StopMusic, &round, &mut state);
        assert!(matches!(&cmds[0], MusicCmd::StopMusic { id } if id == "music1"));
        assert!(state.current.is_none());
    }

    #[test]
    fn test_dispatch_without_music_clears_fanfare() {
        let mut world = World::new();
        let mut round = RoundState::default();
        round.fanfare_playing = true;
        round.play_music(MusicCue::LevelEnd, false);
        world.insert_resource(round);
        world.insert_resource(SoundPlayer::disabled());
        world.init_resource::<Messages<MusicCmd>>();

        let mut schedule = Schedule::default();
        schedule.add_systems(dispatch_effects);
        schedule.run(&mut world);

        let round = world.resource::<RoundState>();
        assert!(!round.fanfare_playing);
        assert!(round.effects.is_empty());
    }

    #[test]
    fn test_fanfare_cleared_by_finish_message() {
        let mut world = World::new();
        let mut round = RoundState::default();
        round.fanfare_playing = true;
        world.insert_resource(round);
        world.init_resource::<Messages<MusicMessage>>();

        let mut schedule = Schedule::default();
        schedule.add_systems(track_fanfare);

        world
            .resource_mut::<Messages<MusicMessage>>()
            .write(MusicMessage::MusicFinished {
                id: "music0".into(),
            });
        schedule.run(&mut world);
        assert!(world.resource::<RoundState>().fanfare_playing);

        world
            .resource_mut::<Messages<MusicMessage>>()
            .write(MusicMessage::MusicFinished {
                id: LEVEL_END_MUSIC.into(),
            });
        schedule.run(&mut world);
        assert!(!world.resource::<RoundState>().fanfare_playing);
    }
}

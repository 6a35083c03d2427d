use bevy_ecs::message::Message;

/// Commands sent *to* the music thread.
///
/// A piece of music is one main file plus optional stems (named tracks such
/// as `drums`) that play in lockstep with it and can be muted on their own.
#[derive(Message, Debug, Clone)]
pub enum MusicCmd {
    LoadMusic { id: String, path: String },
    LoadStem { id: String, track: String, path: String },
    UnloadMusic { id: String },
    UnloadAllMusic,
    PlayMusic { id: String, looped: bool },
    StopMusic { id: String },
    PauseMusic { id: String },
    ResumeMusic { id: String },
    VolumeMusic { id: String, vol: f32 },
    MuteTrack { id: String, track: String, muted: bool },
    Shutdown,
}

/// Messages sent *back* from the music thread
#[derive(Message, Debug, Clone, PartialEq)]
pub enum MusicMessage {
    MusicLoaded { id: String },
    MusicLoadFailed { id: String, error: String },
    MusicUnloaded { id: String },
    MusicUnloadedAll,
    MusicPlayStarted { id: String },
    MusicPlayFailed { id: String, error: String },
    MusicStopped { id: String },
    MusicFinished { id: String }, // reached end for non looping
    MusicVolumeChanged { id: String, vol: f32 },
    TrackMuted { id: String, track: String, muted: bool },
}

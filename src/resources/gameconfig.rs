//! Game configuration resource.
//!
//! Manages game settings loaded from an INI configuration file. Provides
//! defaults for safe startup and loads overrides from the file.
//!
//! # Configuration File Format
//!
//! ```ini
//! [render]
//! width = 800
//! height = 600
//!
//! [window]
//! width = 800
//! height = 600
//! fullscreen = false
//! vsync = false
//! target_fps = 0
//!
//! [audio]
//! enabled = true
//! sample_rate = 22050
//! max_voices = 0
//! buffer_ms = 100
//! echo_delay_ms = 250
//! echo_decay = 0.5
//!
//! [game]
//! assets = ./assets
//! lives = 5
//! level_count = 3
//! max_tile = Z
//! ```
//!
//! `target_fps = 0` leaves the frame rate uncapped and `max_voices = 0` asks
//! the audio device how many sounds it can mix.

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use super::screensize::ScreenSize;

/// Default safe values for startup
const DEFAULT_RENDER_WIDTH: u32 = 800;
const DEFAULT_RENDER_HEIGHT: u32 = 600;
const DEFAULT_WINDOW_WIDTH: u32 = 800;
const DEFAULT_WINDOW_HEIGHT: u32 = 600;
const DEFAULT_TARGET_FPS: u32 = 0;
const DEFAULT_VSYNC: bool = false;
const DEFAULT_FULLSCREEN: bool = false;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";
const DEFAULT_SAMPLE_RATE: u32 = 22050;
const DEFAULT_BUFFER_MS: u32 = 100;
const DEFAULT_ECHO_DELAY_MS: u32 = 250;
const DEFAULT_ECHO_DECAY: f32 = 0.5;
const DEFAULT_ASSETS: &str = "./assets";
const DEFAULT_LIVES: u32 = 5;
const DEFAULT_LEVEL_COUNT: u32 = 3;
const DEFAULT_MAX_TILE: char = 'Z';

/// Game configuration resource.
#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    /// Internal render width in pixels.
    pub render_width: u32,
    /// Internal render height in pixels.
    pub render_height: u32,
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
    /// Target frames per second, 0 for uncapped.
    pub target_fps: u32,
    /// Enable vertical sync.
    pub vsync: bool,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    pub audio_enabled: bool,
    /// Rate every sound is converted to on load.
    pub sample_rate: u32,
    /// Simultaneous sounds, 0 to ask the device.
    pub max_voices: u32,
    /// Size of each voice's output buffer.
    pub buffer_ms: u32,
    pub echo_delay_ms: u32,
    /// Must be in (0, 1).
    pub echo_decay: f32,
    /// Root folder holding `images/`, `maps/`, `sounds/` and `music/`.
    pub assets: PathBuf,
    pub lives: u32,
    pub level_count: u32,
    /// Last tile letter to load.
    pub max_tile: char,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            render_width: DEFAULT_RENDER_WIDTH,
            render_height: DEFAULT_RENDER_HEIGHT,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            vsync: DEFAULT_VSYNC,
            fullscreen: DEFAULT_FULLSCREEN,
            audio_enabled: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_voices: 0,
            buffer_ms: DEFAULT_BUFFER_MS,
            echo_delay_ms: DEFAULT_ECHO_DELAY_MS,
            echo_decay: DEFAULT_ECHO_DECAY,
            assets: PathBuf::from(DEFAULT_ASSETS),
            lives: DEFAULT_LIVES,
            level_count: DEFAULT_LEVEL_COUNT,
            max_tile: DEFAULT_MAX_TILE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [render] section
        if let Some(width) = config.getuint("render", "width").ok().flatten() {
            self.render_width = width as u32;
        }
        if let Some(height) = config.getuint("render", "height").ok().flatten() {
            self.render_height = height as u32;
        }

        // [window] section
        if let Some(width) = config.getuint("window", "width").ok().flatten() {
            self.window_width = width as u32;
        }
        if let Some(height) = config.getuint("window", "height").ok().flatten() {
            self.window_height = height as u32;
        }
        if let Some(fps) = config.getuint("window", "target_fps").ok().flatten() {
            self.target_fps = fps as u32;
        }
        if let Some(vsync) = config.getbool("window", "vsync").ok().flatten() {
            self.vsync = vsync;
        }
        if let Some(fullscreen) = config.getbool("window", "fullscreen").ok().flatten() {
            self.fullscreen = fullscreen;
        }

        // [audio] section
        if let Some(enabled) = config.getbool("audio", "enabled").ok().flatten() {
            self.audio_enabled = enabled;
        }
        if let Some(rate) = config.getuint("audio", "sample_rate").ok().flatten() {
            self.sample_rate = rate as u32;
        }
        if let Some(voices) = config.getuint("audio", "max_voices").ok().flatten() {
            self.max_voices = voices as u32;
        }
        if let Some(ms) = config.getuint("audio", "buffer_ms").ok().flatten() {
            self.buffer_ms = ms as u32;
        }
        if let Some(ms) = config.getuint("audio", "echo_delay_ms").ok().flatten() {
            self.echo_delay_ms = ms as u32;
        }
        if let Some(decay) = config.getfloat("audio", "echo_decay").ok().flatten() {
            if decay > 0.0 && decay < 1.0 {
                self.echo_decay = decay as f32;
            } else {
                log::warn!("echo_decay {} outside (0, 1), keeping {}", decay, self.echo_decay);
            }
        }

        // [game] section
        if let Some(assets) = config.get("game", "assets") {
            self.assets = PathBuf::from(assets);
        }
        if let Some(lives) = config.getuint("game", "lives").ok().flatten() {
            self.lives = lives as u32;
        }
        if let Some(count) = config.getuint("game", "level_count").ok().flatten() {
            self.level_count = count as u32;
        }
        if let Some(max_tile) = config.get("game", "max_tile")
            && let Some(ch) = max_tile.trim().chars().next()
            && ch.is_ascii_uppercase()
        {
            self.max_tile = ch;
        }

        info!(
            "Loaded config: {}x{} render, {}x{} window, fps={}, vsync={}, fullscreen={}",
            self.render_width,
            self.render_height,
            self.window_width,
            self.window_height,
            self.target_fps,
            self.vsync,
            self.fullscreen
        );
        info!(
            "audio: enabled={} rate={} voices={} buffer={}ms, assets={}",
            self.audio_enabled,
            self.sample_rate,
            self.max_voices,
            self.buffer_ms,
            self.assets.display()
        );

        Ok(())
    }

    /// Get the window size.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Resolution the level is drawn at before scaling to the window.
    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize {
            w: self.render_width as i32,
            h: self.render_height as i32,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.assets.join("images")
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.assets.join("maps")
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.assets.join("sounds")
    }

    pub fn music_dir(&self) -> PathBuf {
        self.assets.join("music")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = GameConfig::new();
        assert_eq!(c.window_size(), (800, 600));
        assert_eq!(c.target_fps, 0);
        assert_eq!(c.sample_rate, 22050);
        assert_eq!(c.lives, 5);
        assert_eq!(c.max_tile, 'Z');
        assert_eq!(c.maps_dir(), PathBuf::from("./assets/maps"));
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = GameConfig::with_path(dir.path().join("absent.ini"));
        assert!(c.load_from_file().is_err());
        assert_eq!(c.render_width, 800);
    }

    #[test]
    fn test_load_overrides_present_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[window]\nwidth = 1024\ntarget_fps = 60\n\n[audio]\nmax_voices = 4\necho_decay = 2.0\n\n[game]\nmax_tile = M\nlevel_count = 5\n",
        )
        .unwrap();

        let mut c = GameConfig::with_path(&path);
        c.load_from_file().unwrap();
        assert_eq!(c.window_width, 1024);
        assert_eq!(c.window_height, 600);
        assert_eq!(c.target_fps, 60);
        assert_eq!(c.max_voices, 4);
        // out of range decay is rejected
        assert_eq!(c.echo_decay, 0.5);
        assert_eq!(c.max_tile, 'M');
        assert_eq!(c.level_count, 5);
        // keys absent from the file keep their defaults
        assert_eq!(c.sample_rate, 22050);
        assert!(c.audio_enabled);
    }
}

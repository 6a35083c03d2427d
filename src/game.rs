//! Game setup.
//!
//! Loads every texture, clip, tune and map the level needs and inserts the
//! resources the schedule runs on. Textures go through raylib, so setup runs
//! on the main thread before the loop starts.

use std::path::PathBuf;
use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::{info, warn};
use raylib::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::animation::ImageRef;
use crate::error::AssetError;
use crate::events::audio::{MusicCmd, MusicMessage};
use crate::events::effects::MusicCue;
use crate::resources::audio::{
    MusicBridge, SoundBank, SoundPlayer, music_load_commands, setup_music,
};
use crate::resources::gameconfig::GameConfig;
use crate::resources::input::InputState;
use crate::resources::maploader::{ImageSource, MapLoader};
use crate::resources::roundstate::RoundState;
use crate::resources::texturestore::TextureStore;
use crate::resources::tilemap::Level;
use crate::resources::worldtime::WorldTime;
use crate::sound::device::{AudioDevice, CpalDevice, NullDevice};
use crate::sound::sound::PcmFormat;

/// Loads images as raylib textures, keyed by file name in a [`TextureStore`].
///
/// Loading the same name twice reuses the first texture.
pub struct RaylibImageLoader<'a> {
    rl: &'a mut RaylibHandle,
    th: &'a RaylibThread,
    dir: PathBuf,
    textures: &'a mut TextureStore,
    loaded: FxHashMap<String, ImageRef>,
}

impl<'a> RaylibImageLoader<'a> {
    pub fn new(
        rl: &'a mut RaylibHandle,
        th: &'a RaylibThread,
        dir: impl Into<PathBuf>,
        textures: &'a mut TextureStore,
    ) -> Self {
        RaylibImageLoader {
            rl,
            th,
            dir: dir.into(),
            textures,
            loaded: FxHashMap::default(),
        }
    }
}

impl ImageSource for RaylibImageLoader<'_> {
    fn load_image(&mut self, name: &str) -> Result<ImageRef, AssetError> {
        if let Some(image) = self.loaded.get(name) {
            return Ok(image.clone());
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(AssetError::NotFound { path });
        }
        let texture = self
            .rl
            .load_texture(self.th, &path.to_string_lossy())
            .map_err(|e| AssetError::InvalidImage {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let key: Arc<str> = Arc::from(name);
        let image = ImageRef::new(Arc::clone(&key), texture.width, texture.height);
        self.textures.insert(&*key, texture);
        self.loaded.insert(name.to_string(), image.clone());
        Ok(image)
    }
}

/// Loads tiles, sprites, backgrounds and the first map, then inserts the
/// level, round and input resources.
///
/// Fails only when the sprite images or the first map cannot be loaded.
pub fn setup_level(
    world: &mut World,
    rl: &mut RaylibHandle,
    th: &RaylibThread,
    config: &GameConfig,
) -> Result<(), AssetError> {
    let mut textures = TextureStore::new();
    let (loader, level) = {
        let mut images = RaylibImageLoader::new(rl, th, config.images_dir(), &mut textures);
        let mut loader = MapLoader::new(config.maps_dir(), config.max_tile, &mut images)?;
        loader.load_backgrounds(&mut images, config.level_count);
        let map = loader.load_next()?;
        let level = Level {
            map,
            background: loader.background(0),
        };
        (loader, level)
    };
    info!("loaded {} textures", textures.map.len());

    let mut round = RoundState::new(config.lives, config.level_count);
    round.play_music(MusicCue::Level, true);

    world.insert_resource(textures);
    world.insert_resource(loader);
    world.insert_resource(level);
    world.insert_resource(round);
    world.insert_resource(InputState::default());
    world.insert_resource(WorldTime::default());
    world.insert_resource(config.screen_size());
    Ok(())
}

/// Starts the voice pool and the music thread, or silent stand-ins when
/// audio is off.
///
/// A missing output device keeps the pool running on a [`NullDevice`] so
/// the game keeps its timing.
pub fn setup_audio(world: &mut World, config: &GameConfig) {
    world.insert_resource(Messages::<MusicCmd>::default());
    world.insert_resource(Messages::<MusicMessage>::default());

    if !config.audio_enabled {
        info!("audio disabled");
        world.insert_resource(SoundPlayer::disabled());
        return;
    }

    let format = PcmFormat::new(config.sample_rate);
    let device: Arc<dyn AudioDevice> = match CpalDevice::probe() {
        Ok(device) => Arc::new(device),
        Err(e) => {
            warn!("{}, sounds will be silent", e);
            Arc::new(NullDevice)
        }
    };
    let bank = SoundBank::load(&config.sounds_dir(), format);
    let player = SoundPlayer::new(
        device,
        bank,
        format,
        config.max_voices as usize,
        config.buffer_ms,
    )
    .with_echo(config.echo_delay_ms, config.echo_decay);
    world.insert_resource(player);

    setup_music(world);
    let bridge = world.resource::<MusicBridge>();
    for cmd in music_load_commands(&config.music_dir(), config.level_count) {
        // ignore send error if the thread already exited
        let _ = bridge.tx_cmd.send(cmd);
    }
}

//! Platformer main entry point.
//!
//! A 2D side-scrolling platformer built on:
//! - **raylib** for the window, textures and streamed music
//! - **bevy_ecs** for resources and the per-frame schedule
//! - **cpal** for the voice pool that plays filtered sound effects
//!
//! # Main Loop
//!
//! 1. Load `config.ini` and apply command line overrides
//! 2. Open the window, load textures, sounds, music and the first map
//! 3. Each frame:
//!    - Advance the clock by the measured frame time (no fixed step)
//!    - Read input and run the simulation
//!    - Play queued sounds and music changes
//!    - Wake creatures on screen and draw the frame
//! 4. Stop the music thread and the voice pool on exit
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --assets ./assets
//! ```

// Do not create console on Windows
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::path::PathBuf;
use std::time::Duration;

use bevy_ecs::prelude::*;
use clap::Parser;

use platformer::game::{setup_audio, setup_level};
use platformer::resources::audio::{MusicBridge, SoundPlayer, shutdown_music};
use platformer::resources::gameconfig::GameConfig;
use platformer::resources::rendertarget::RenderTarget;
use platformer::resources::roundstate::RoundState;
use platformer::resources::windowsize::WindowSize;
use platformer::systems::audio::{
    dispatch_effects, forward_music_cmds, poll_music_messages, track_fanfare,
    update_bevy_music_cmds, update_bevy_music_messages,
};
use platformer::systems::input::update_input_state;
use platformer::systems::render::{render_system, wake_system};
use platformer::systems::simulation::simulation_system;
use platformer::systems::time::update_world_time;

/// How long the voice pool gets to stop before the process exits anyway.
const AUDIO_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// 2D side-scrolling platformer
#[derive(Parser)]
#[command(version, about = "A 2D side-scrolling platformer.")]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Folder holding images/, maps/, sounds/ and music/.
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Start without sound or music.
    #[arg(long)]
    mute: bool,

    /// Ignore the fullscreen setting.
    #[arg(long)]
    windowed: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => GameConfig::with_path(path),
        None => GameConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        log::info!("{}, using defaults", e);
    }
    if let Some(assets) = cli.assets {
        config.assets = assets;
    }
    if cli.mute {
        config.audio_enabled = false;
    }
    if cli.windowed {
        config.fullscreen = false;
    }

    // --------------- Raylib window ---------------
    let (window_width, window_height) = config.window_size();
    let mut builder = raylib::init();
    builder
        .size(window_width as i32, window_height as i32)
        .resizable()
        .title("Platformer");
    if config.fullscreen {
        builder.fullscreen();
    }
    if config.vsync {
        builder.vsync();
    }
    let (mut rl, thread) = builder.build();
    if config.target_fps > 0 {
        rl.set_target_fps(config.target_fps);
    }
    // Escape is the exit action, handled by the game
    rl.set_exit_key(None);

    let render_target = RenderTarget::new(&mut rl, &thread, config.screen_size())
        .expect("Failed to create render target");

    // --------------- ECS world + resources ---------------
    let mut world = World::new();
    setup_audio(&mut world, &config);
    if let Err(e) = setup_level(&mut world, &mut rl, &thread, &config) {
        log::error!("Cannot start: {}", e);
        shutdown(&mut world);
        std::process::exit(1);
    }
    world.insert_resource(WindowSize {
        w: rl.get_screen_width(),
        h: rl.get_screen_height(),
    });
    world.insert_non_send_resource(render_target);
    world.insert_non_send_resource(rl);
    world.insert_non_send_resource(thread);
    world.insert_resource(config);

    let mut update = Schedule::default();
    update.add_systems(update_input_state);
    update.add_systems(simulation_system.after(update_input_state));
    update.add_systems(dispatch_effects.after(simulation_system));
    update.add_systems(
        // music systems must be together
        (
            // First, advance MusicCmd messages and forward them to the music thread
            update_bevy_music_cmds,
            forward_music_cmds,
            // Then, pull music thread replies and advance them
            poll_music_messages,
            update_bevy_music_messages,
            track_fanfare,
        )
            .chain()
            .after(dispatch_effects)
            .run_if(resource_exists::<MusicBridge>),
    );
    update.add_systems(wake_system.after(simulation_system));
    update.add_systems(render_system.after(wake_system));

    update
        .initialize(&mut world)
        .expect("Failed to initialize schedule");

    // --------------- Main loop ---------------
    while !world
        .non_send_resource::<raylib::RaylibHandle>()
        .window_should_close()
        && !world.resource::<RoundState>().quit
    {
        let dt = world
            .non_send_resource::<raylib::RaylibHandle>()
            .get_frame_time();
        update_world_time(&mut world, dt);

        update.run(&mut world);

        // Update window size each frame (may change due to resize)
        let (new_w, new_h) = {
            let rl = world.non_send_resource::<raylib::RaylibHandle>();
            (rl.get_screen_width(), rl.get_screen_height())
        };
        {
            let mut window_size = world.resource_mut::<WindowSize>();
            window_size.w = new_w;
            window_size.h = new_h;
        }
    }

    shutdown(&mut world);
}

/// Stops the music thread, then the voice pool. A voice stuck on the device
/// ends the process instead of hanging it.
fn shutdown(world: &mut World) {
    shutdown_music(world);
    if let Some(mut player) = world.remove_resource::<SoundPlayer>()
        && !player.close(AUDIO_SHUTDOWN_TIMEOUT)
    {
        log::warn!("Voice pool did not stop in time, exiting");
        std::process::exit(0);
    }
}

//! Per-frame game logic.
//!
//! One call to [`update`] advances the level by the time elapsed since the
//! previous frame:
//! - a dead player restarts the level, or ends the game when no lives are left
//! - input turns into player velocity, crouching, jumps and pausing
//! - gravity and tile collisions move the player and every creature, one
//!   axis at a time
//! - the player touching a sprite picks up power-ups, stomps enemies or dies
//! - after the goal, level points are banked and the next map loads
//!
//! Counters and requested sounds go into [`RoundState`]; nothing here talks
//! to the audio backends.

use bevy_ecs::prelude::*;
use log::{error, info};

use crate::components::creature::{Creature, CreatureState, PLAYER_RUN_SPEED, PLAYER_WALK_SPEED};
use crate::components::powerup::PowerUpKind;
use crate::components::sprite::{Sprite, sprites_collide};
use crate::error::AssetError;
use crate::events::effects::{GameEffect, MusicCue, SoundCue};
use crate::resources::input::InputState;
use crate::resources::maploader::MapLoader;
use crate::resources::roundstate::{GAME_OVER_FRAMES, POINT_TRANSFER_STEP, RoundState};
use crate::resources::tilemap::{Level, MapSprite, TileGrid, TileMap, pixels_to_tiles, tiles_to_pixels};
use crate::resources::worldtime::WorldTime;

/// Downward acceleration in pixels per ms².
pub const GRAVITY: f32 = 0.002;
/// Falling below this y costs a life.
pub const FALL_LIMIT: f32 = 2000.0;
pub const STOMP_POINTS: u32 = 100;
pub const COIN_POINTS: u32 = 10;
pub const ITEM_POINTS: u32 = 1000;
/// Every this many coins grant an extra life.
pub const COINS_PER_LIFE: u32 = 100;

/// First solid tile touched when moving `sprite` to `(new_x, new_y)`.
///
/// Only one coordinate should change per call. The swept box is scanned
/// column by column, so the tile returned is the first found, not
/// necessarily the nearest.
pub fn tile_collision(grid: &TileGrid, sprite: &Sprite, new_x: f32, new_y: f32) -> Option<(i32, i32)> {
    let from_x = sprite.x().min(new_x);
    let from_y = sprite.y().min(new_y);
    let to_x = sprite.x().max(new_x);
    let to_y = sprite.y().max(new_y);

    let from_tile_x = pixels_to_tiles(from_x);
    let from_tile_y = pixels_to_tiles(from_y);
    let to_tile_x = pixels_to_tiles(to_x + sprite.width() as f32 - 1.0);
    let to_tile_y = pixels_to_tiles(to_y + sprite.height() as f32 - 1.0);

    for x in from_tile_x..=to_tile_x {
        for y in from_tile_y..=to_tile_y {
            if grid.is_solid(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

fn apply_gravity(creature: &mut Creature, elapsed: u64) {
    if !creature.is_flying() {
        let vy = creature.sprite.vy() + GRAVITY * elapsed as f32;
        creature.sprite.set_vy(vy);
    }
}

fn move_horizontal(grid: &TileGrid, creature: &mut Creature, elapsed: u64) {
    let dx = creature.sprite.vx();
    let new_x = creature.x() + dx * elapsed as f32;
    match tile_collision(grid, &creature.sprite, new_x, creature.y()) {
        None => creature.set_x(new_x),
        Some((tile_x, _)) => {
            if dx > 0.0 {
                creature.set_x((tiles_to_pixels(tile_x) - creature.width()) as f32);
            } else if dx < 0.0 {
                creature.set_x(tiles_to_pixels(tile_x + 1) as f32);
            }
            creature.collide_horizontal();
        }
    }
}

fn move_vertical(grid: &TileGrid, creature: &mut Creature, elapsed: u64) {
    let dy = creature.sprite.vy();
    let new_y = creature.y() + dy * elapsed as f32;
    match tile_collision(grid, &creature.sprite, creature.x(), new_y) {
        None => creature.set_y(new_y),
        Some((_, tile_y)) => {
            if dy > 0.0 {
                creature.set_y((tiles_to_pixels(tile_y) - creature.height()) as f32);
            } else if dy < 0.0 {
                creature.set_y(tiles_to_pixels(tile_y + 1) as f32);
            }
            creature.collide_vertical();
        }
    }
}

/// Gravity, then horizontal and vertical moves against the tiles.
pub fn update_creature(grid: &TileGrid, creature: &mut Creature, elapsed: u64) {
    apply_gravity(creature, elapsed);
    move_horizontal(grid, creature, elapsed);
    move_vertical(grid, creature, elapsed);
}

/// Moves the player like any creature, checking for sprite contact after
/// each axis. Contact after moving down is a stomp.
pub fn update_player(map: &mut TileMap, round: &mut RoundState, elapsed: u64) {
    let TileMap {
        grid,
        sprites,
        player,
    } = map;

    apply_gravity(player, elapsed);
    move_horizontal(grid, player, elapsed);
    check_player_collision(player, sprites, round, false);

    let old_y = player.y();
    move_vertical(grid, player, elapsed);
    let can_kill = old_y < player.y();
    check_player_collision(player, sprites, round, can_kill);

    if player.is_alive() && player.y() > FALL_LIMIT && round.lives != 0 {
        info!("player fell out of the map");
        round.stop_music();
        round.push(GameEffect::EchoSound(SoundCue::Death));
        player.set_state(CreatureState::Dead);
        round.lives -= 1;
    }
}

/// Resolves contact between the player and the first sprite it overlaps.
pub fn check_player_collision(
    player: &mut Creature,
    sprites: &mut Vec<MapSprite>,
    round: &mut RoundState,
    can_kill: bool,
) {
    if !player.is_alive() {
        return;
    }
    let Some(index) = sprites
        .iter()
        .position(|s| sprites_collide(&*player, s.as_collidable()))
    else {
        return;
    };

    match &mut sprites[index] {
        MapSprite::PowerUp(power_up) => {
            let kind = power_up.kind();
            sprites.remove(index);
            acquire_power_up(kind, round);
        }
        MapSprite::Creature(enemy) if can_kill => {
            round.push(GameEffect::PositionalSound {
                cue: SoundCue::Stomp,
                source: enemy.sprite.anchor(),
                listener: player.sprite.anchor(),
            });
            enemy.set_state(CreatureState::Dying);
            round.level_score += STOMP_POINTS;
            player.set_y(enemy.y() - player.height() as f32);
            player.jump(true);
        }
        MapSprite::Creature(_) => {
            info!("player hit, {} lives left", round.lives.saturating_sub(1));
            player.set_state(CreatureState::Dying);
            round.lives = round.lives.saturating_sub(1);
            round.stop_music();
            round.push(GameEffect::EchoSound(SoundCue::Death));
        }
    }
}

/// Applies a picked-up power-up. The caller has already taken it off the map.
pub fn acquire_power_up(kind: PowerUpKind, round: &mut RoundState) {
    match kind {
        PowerUpKind::Coin => {
            round.level_score += COIN_POINTS;
            round.coins += 1;
            round.play(SoundCue::Coin);
            if round.coins % COINS_PER_LIFE == 0 {
                round.lives += 1;
                round.play(SoundCue::OneUp);
            }
        }
        PowerUpKind::Mushroom => {
            round.level_score += ITEM_POINTS;
            round.play(SoundCue::Coin);
            round.play(SoundCue::PowerUp);
        }
        PowerUpKind::FireFlower => {
            round.level_score += ITEM_POINTS;
        }
        PowerUpKind::OneUp => {
            round.level_score += ITEM_POINTS;
            round.lives += 1;
            round.play(SoundCue::OneUp);
        }
        PowerUpKind::Goal => {
            round.stars += 1;
            round.opening_frame = 0;
            round.play(SoundCue::PowerUp);
            round.advancing = true;
            round.stop_music();
            round.play_music(MusicCue::LevelEnd, false);
            round.fanfare_playing = true;
            info!("goal reached, {} stars", round.stars);
        }
    }
}

/// Pausing silences everything; every action is reset either way.
pub fn set_paused(round: &mut RoundState, input: &mut InputState, paused: bool) {
    if round.paused == paused {
        return;
    }
    round.paused = paused;
    input.reset_all();
    if paused {
        round.stop_music();
        round.push(GameEffect::PauseVoices(true));
    } else {
        round.push(GameEffect::PauseVoices(false));
        round.play_music(MusicCue::Level, true);
    }
}

/// Reads the game actions. Movement uses the speed chosen on the previous
/// frame, so holding run takes effect one frame late.
pub fn check_input(player: &mut Creature, round: &mut RoundState, input: &mut InputState) {
    if input.exit.is_pressed() {
        round.quit = true;
    }
    if !player.is_alive() {
        return;
    }

    let mut vx = 0.0;
    if input.move_left.is_pressed() && !player.is_crouching() {
        vx -= player.max_speed();
    }
    if input.move_right.is_pressed() && !player.is_crouching() {
        vx += player.max_speed();
    }
    player.set_crouching(input.move_down.is_pressed());

    if input.jump.is_pressed() {
        if !player.is_airborne() {
            round.play(SoundCue::Jump);
        }
        player.jump(false);
    }

    player.set_max_speed(if input.run.is_pressed() {
        PLAYER_RUN_SPEED
    } else {
        PLAYER_WALK_SPEED
    });

    if input.pause.is_pressed() && round.opening_finished() {
        let paused = !round.paused;
        set_paused(round, input, paused);
    }

    player.sprite.set_vx(vx);
}

/// Banks the level score a step at a time, then loads the next map once the
/// fanfare is over.
pub fn transfer_points(
    level: &mut Level,
    round: &mut RoundState,
    loader: &mut MapLoader,
) -> Result<(), AssetError> {
    if round.level_score > 0 {
        let step = POINT_TRANSFER_STEP.min(round.level_score);
        round.score += step;
        round.level_score -= step;
        round.play(SoundCue::Coin);
    }
    if round.level_score == 0 && !round.fanfare_playing {
        round.advancing = false;
        level.map = loader.load_next()?;
        level.background = loader.background(round.theme_index());
        round.stop_music();
        round.play_music(MusicCue::Level, true);
        round.coins = 0;
    }
    Ok(())
}

fn enter_game_over(round: &mut RoundState) {
    info!("game over, final score {}", round.score + round.level_score);
    round.game_over = true;
    round.game_over_frame = 0;
    round.stop_music();
    round.play_music(MusicCue::GameOver, false);
}

fn update_sprites(map: &mut TileMap, elapsed: u64) {
    let TileMap { grid, sprites, .. } = map;
    sprites.retain(|s| !matches!(s, MapSprite::Creature(c) if c.state() == CreatureState::Dead));
    for sprite in sprites.iter_mut() {
        match sprite {
            MapSprite::Creature(creature) => {
                update_creature(grid, creature, elapsed);
                creature.update(elapsed);
            }
            MapSprite::PowerUp(power_up) => power_up.sprite.update(elapsed),
        }
    }
}

/// Advances the whole game by `elapsed` ms.
///
/// Fails only when a map cannot be loaded.
pub fn update(
    level: &mut Level,
    round: &mut RoundState,
    input: &mut InputState,
    loader: &mut MapLoader,
    elapsed: u64,
) -> Result<(), AssetError> {
    if round.game_over {
        if input.exit.is_pressed() || round.game_over_frame >= GAME_OVER_FRAMES {
            round.quit = true;
        }
        round.game_over_frame += 1;
        return Ok(());
    }

    if level.map.player.state() == CreatureState::Dead {
        if round.lives == 0 {
            enter_game_over(round);
            return Ok(());
        }
        round.opening_frame = 0;
        level.map = loader.reload()?;
        round.play_music(MusicCue::Level, true);
        round.coins = 0;
        round.level_score = 0;
        return Ok(());
    }

    check_input(&mut level.map.player, round, input);

    if round.advancing {
        transfer_points(level, round, loader)?;
    } else {
        if !round.paused {
            update_player(&mut level.map, round, elapsed);
            level.map.player.update(elapsed);
            update_sprites(&mut level.map, elapsed);
        }
        if !round.opening_finished() {
            round.opening_frame += 1;
        }
    }
    Ok(())
}

/// Runs [`update`] with this frame's delta. A map that fails to load ends
/// the game.
pub fn simulation_system(
    mut level: ResMut<Level>,
    mut round: ResMut<RoundState>,
    mut input: ResMut<InputState>,
    mut loader: ResMut<MapLoader>,
    time: Res<WorldTime>,
) {
    if let Err(e) = update(&mut level, &mut round, &mut input, &mut loader, time.delta) {
        error!("cannot continue: {}", e);
        round.quit = true;
    }
}

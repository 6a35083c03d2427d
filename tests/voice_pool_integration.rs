//! Voice Pool Integration Tests
//!
//! These tests drive the voice pool and the sound player through an
//! in-memory device that records every byte written to its lines. No audio
//! hardware is touched.
//!
//! ```sh
//! cargo test --test voice_pool_integration
//! ```

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;

use platformer::error::AudioError;
use platformer::events::audio::MusicCmd;
use platformer::events::effects::SoundCue;
use platformer::resources::audio::{SoundBank, SoundPlayer};
use platformer::resources::roundstate::RoundState;
use platformer::sound::device::{AudioDevice, OutputLine};
use platformer::sound::echo::EchoFilter;
use platformer::sound::pool::VoicePool;
use platformer::sound::sound::{PcmFormat, Sound};
use platformer::systems::audio::dispatch_effects;

// =============================================================================
// Recording device
// =============================================================================

#[derive(Default)]
struct Recorded {
    bytes: Mutex<Vec<u8>>,
    opened: AtomicUsize,
}

#[derive(Clone)]
struct RecordingDevice {
    recorded: Arc<Recorded>,
    lines: Option<usize>,
    /// Lines that open successfully; later ones fail.
    working: usize,
}

impl RecordingDevice {
    fn new(lines: Option<usize>) -> Self {
        RecordingDevice {
            recorded: Arc::new(Recorded::default()),
            lines,
            working: usize::MAX,
        }
    }

    fn with_working_lines(mut self, working: usize) -> Self {
        self.working = working;
        self
    }

    fn bytes(&self) -> Vec<u8> {
        self.recorded.bytes.lock().unwrap().clone()
    }

    fn opened(&self) -> usize {
        self.recorded.opened.load(Ordering::SeqCst)
    }

    /// Polls until at least `len` bytes were written.
    fn wait_for(&self, len: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.recorded.bytes.lock().unwrap().len() >= len {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

struct RecordingLine(Arc<Recorded>);

impl OutputLine for RecordingLine {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
        self.0.bytes.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}

impl AudioDevice for RecordingDevice {
    fn max_lines(&self) -> Option<usize> {
        self.lines
    }

    fn open_line(
        &self,
        _format: PcmFormat,
        _buffer_bytes: usize,
    ) -> Result<Box<dyn OutputLine>, AudioError> {
        let n = self.recorded.opened.fetch_add(1, Ordering::SeqCst);
        if n >= self.working {
            return Err(AudioError::LineUnavailable("test line refused".into()));
        }
        Ok(Box::new(RecordingLine(Arc::clone(&self.recorded))))
    }
}

fn format() -> PcmFormat {
    PcmFormat::new(8000)
}

fn sound(len: usize, value: i16) -> Sound {
    Sound::from_samples(&vec![value; len])
}

fn pool(device: &RecordingDevice, voices: usize) -> VoicePool {
    VoicePool::new(Arc::new(device.clone()), format(), voices, 10)
}

// =============================================================================
// Pool
// =============================================================================

#[test]
fn pool_plays_every_byte_of_a_sound() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(1000, 1234);

    pool.play(&clip).unwrap();
    pool.join();

    assert_eq!(device.bytes(), clip.samples());
}

#[test]
fn pool_size_comes_from_device_when_unset() {
    let device = RecordingDevice::new(Some(3));
    let mut pool = pool(&device, 0);
    assert_eq!(pool.voices(), 3);
    pool.join();
    assert_eq!(device.opened(), 3);
}

#[test]
fn pool_falls_back_to_default_voice_count() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 0);
    assert_eq!(pool.voices(), platformer::sound::pool::DEFAULT_VOICES);
    pool.join();
}

#[test]
fn refused_lines_leave_the_other_voices_working() {
    let device = RecordingDevice::new(None).with_working_lines(1);
    let mut pool = pool(&device, 3);
    let clip = sound(200, 7);

    for _ in 0..3 {
        pool.play(&clip).unwrap();
    }
    pool.join();

    assert_eq!(device.opened(), 3);
    assert_eq!(device.bytes().len(), 3 * clip.len_bytes());
}

#[test]
fn echo_tail_outlasts_the_sound() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(400, 8000);

    pool.play_filtered(&clip, EchoFilter::new(100, 0.5)).unwrap();
    pool.join();

    let bytes = device.bytes();
    assert!(bytes.len() > clip.len_bytes());
    assert_eq!(bytes.len() % format().frame_size(), 0);
}

#[test]
fn paused_pool_writes_nothing_until_resumed() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(500, 99);

    pool.set_paused(true);
    assert!(pool.is_paused());
    pool.play(&clip).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(device.bytes().is_empty());

    pool.set_paused(false);
    pool.join();
    assert_eq!(device.bytes().len(), clip.len_bytes());
}

#[test]
fn full_queue_rejects_without_blocking() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(100, 1);

    pool.set_paused(true);
    let results: Vec<_> = (0..10).map(|_| pool.play(&clip)).collect();
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AudioError::QueueFull)))
    );

    assert!(pool.close(Duration::from_secs(2)));
}

#[test]
fn closed_pool_refuses_new_sounds() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 2);
    let clip = sound(100, 1);

    pool.set_paused(true);
    pool.play(&clip).unwrap();
    assert!(pool.close(Duration::from_secs(2)));
    assert!(pool.is_closed());
    assert!(matches!(pool.play(&clip), Err(AudioError::PoolClosed)));
    // nothing queued before close was played
    assert!(device.bytes().is_empty());
}

struct PanickingSource;

impl Read for PanickingSource {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        panic!("broken source");
    }
}

#[test]
fn panicking_source_does_not_lose_the_voice() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(100, 5);

    pool.submit(PanickingSource).unwrap();
    pool.play(&clip).unwrap();
    pool.join();

    assert_eq!(device.bytes().len(), clip.len_bytes());
}

#[test]
fn looped_sound_repeats_until_stopped() {
    let device = RecordingDevice::new(None);
    let mut pool = pool(&device, 1);
    let clip = sound(50, 3);

    let handle = pool.play_looped(&clip).unwrap();
    assert!(device.wait_for(clip.len_bytes() * 3));
    handle.stop();
    pool.join();

    assert!(handle.is_stopped());
    assert!(device.bytes().len() >= clip.len_bytes() * 3);
}

// =============================================================================
// Sound player and effect dispatch
// =============================================================================

#[test]
fn dispatched_effects_reach_the_device() {
    let device = RecordingDevice::new(None);
    let clip = sound(300, 42);
    let mut bank = SoundBank::default();
    bank.insert(SoundCue::Coin, clip.clone());

    let mut world = World::new();
    let mut round = RoundState::default();
    round.play(SoundCue::Coin);
    // no clip for this one, so it is skipped
    round.play(SoundCue::Jump);
    world.insert_resource(round);
    world.insert_resource(SoundPlayer::new(
        Arc::new(device.clone()),
        bank,
        format(),
        2,
        10,
    ));
    world.init_resource::<Messages<MusicCmd>>();

    let mut schedule = Schedule::default();
    schedule.add_systems(dispatch_effects);
    schedule.run(&mut world);

    assert!(world.resource::<RoundState>().effects.is_empty());
    assert!(device.wait_for(clip.len_bytes()));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(device.bytes().len(), clip.len_bytes());

    let mut player = world.remove_resource::<SoundPlayer>().unwrap();
    assert!(player.close(Duration::from_secs(2)));
}

#[test]
fn disabled_player_ignores_everything() {
    let mut player = SoundPlayer::disabled();
    assert!(!player.is_enabled());
    player.play(SoundCue::Coin);
    player.play_echo(SoundCue::Death);
    player.set_paused(true);
    assert!(player.close(Duration::from_millis(10)));
}

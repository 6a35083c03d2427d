//! Distance attenuation between a sound source and a listener.

use crate::components::sprite::SharedPosition;

use super::filter::{SoundFilter, clamp_sample, get_sample, set_sample};

/// Samples over which a volume change is ramped to avoid clicks.
const NUM_SHIFTING_SAMPLES: usize = 500;

/// Scales samples by `max(0, (max_distance - d) / max_distance)` where `d`
/// is the current distance between `source` and `listener`.
///
/// Positions are read on every call, so the volume follows the sprites as
/// they move while the sound plays.
pub struct Filter3d {
    source: Option<SharedPosition>,
    listener: Option<SharedPosition>,
    max_distance: f32,
    last_volume: f32,
}

impl Filter3d {
    pub fn new(source: SharedPosition, listener: SharedPosition, max_distance: f32) -> Self {
        Filter3d {
            source: Some(source),
            listener: Some(listener),
            max_distance,
            last_volume: 0.0,
        }
    }

    /// A filter with no endpoints leaves samples unchanged.
    pub fn detached(max_distance: f32) -> Self {
        Filter3d {
            source: None,
            listener: None,
            max_distance,
            last_volume: 0.0,
        }
    }

    fn target_volume(&self, source: &SharedPosition, listener: &SharedPosition) -> f32 {
        let (sx, sy) = source.get();
        let (lx, ly) = listener.get();
        let dx = sx - lx;
        let dy = sy - ly;
        let distance = (dx * dx + dy * dy).sqrt();
        if self.max_distance <= 0.0 {
            return 0.0;
        }
        ((self.max_distance - distance) / self.max_distance).max(0.0)
    }
}

impl SoundFilter for Filter3d {
    fn filter(&mut self, samples: &mut [u8]) {
        let (Some(source), Some(listener)) = (&self.source, &self.listener) else {
            return;
        };
        let new_volume = self.target_volume(source, listener);

        for (shift, pos) in (0..samples.len() / 2).map(|i| (i, i * 2)) {
            let volume = if shift < NUM_SHIFTING_SAMPLES {
                self.last_volume
                    + (new_volume - self.last_volume) * shift as f32 / NUM_SHIFTING_SAMPLES as f32
            } else {
                new_volume
            };
            let s = get_sample(samples, pos);
            set_sample(samples, pos, clamp_sample(s as f32 * volume));
        }

        self.last_volume = new_volume;
    }
}

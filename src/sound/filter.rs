//! Sample filters applied to 16-bit little-endian mono PCM.
//!
//! A filter works in place on a byte slice. Callers pick the region by
//! slicing, so `filter(&mut buf[offset..offset + len])` processes exactly
//! that window. A trailing odd byte is left untouched.

/// Reads the signed 16-bit little-endian sample starting at byte `pos`.
pub fn get_sample(buffer: &[u8], pos: usize) -> i16 {
    i16::from_le_bytes([buffer[pos], buffer[pos + 1]])
}

/// Writes `sample` as 16-bit little-endian starting at byte `pos`.
pub fn set_sample(buffer: &mut [u8], pos: usize, sample: i16) {
    let [lo, hi] = sample.to_le_bytes();
    buffer[pos] = lo;
    buffer[pos + 1] = hi;
}

/// Converts a float sample to 16 bits, saturating at the type bounds.
pub(crate) fn clamp_sample(value: f32) -> i16 {
    value as i16
}

/// In-place transformation of a PCM stream.
///
/// Filters are stateful: consecutive calls see consecutive stretches of the
/// same stream. `remaining_size` reports how many bytes of tail the filter
/// still wants to produce once the source runs dry (an echo keeps ringing).
pub trait SoundFilter: Send {
    fn filter(&mut self, samples: &mut [u8]);

    fn reset(&mut self) {}

    fn remaining_size(&self) -> usize {
        0
    }
}

impl<F: SoundFilter + ?Sized> SoundFilter for Box<F> {
    fn filter(&mut self, samples: &mut [u8]) {
        (**self).filter(samples)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn remaining_size(&self) -> usize {
        (**self).remaining_size()
    }
}

/// Passes samples through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl SoundFilter for Passthrough {
    fn filter(&mut self, _samples: &mut [u8]) {}
}

/// Applies several filters in order.
#[derive(Default)]
pub struct FilterSequence {
    filters: Vec<Box<dyn SoundFilter>>,
}

impl FilterSequence {
    pub fn new(filters: Vec<Box<dyn SoundFilter>>) -> Self {
        FilterSequence { filters }
    }

    pub fn push(&mut self, filter: impl SoundFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl SoundFilter for FilterSequence {
    fn filter(&mut self, samples: &mut [u8]) {
        for f in self.filters.iter_mut() {
            f.filter(samples);
        }
    }

    fn reset(&mut self) {
        for f in self.filters.iter_mut() {
            f.reset();
        }
    }

    /// The longest tail of any member.
    fn remaining_size(&self) -> usize {
        self.filters
            .iter()
            .map(|f| f.remaining_size())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Add(i16, usize);

    impl SoundFilter for Add {
        fn filter(&mut self, samples: &mut [u8]) {
            for pos in (0..samples.len() / 2).map(|i| i * 2) {
                let s = get_sample(samples, pos);
                set_sample(samples, pos, s + self.0);
            }
        }

        fn remaining_size(&self) -> usize {
            self.1
        }
    }

    struct Double;

    impl SoundFilter for Double {
        fn filter(&mut self, samples: &mut [u8]) {
            for pos in (0..samples.len() / 2).map(|i| i * 2) {
                let s = get_sample(samples, pos);
                set_sample(samples, pos, s * 2);
            }
        }
    }

    #[test]
    fn test_sample_helpers_little_endian() {
        let mut buf = [0u8; 4];
        set_sample(&mut buf, 2, -2);
        assert_eq!(buf, [0, 0, 0xFE, 0xFF]);
        assert_eq!(get_sample(&buf, 2), -2);
        set_sample(&mut buf, 0, 0x1234);
        assert_eq!(buf[0], 0x34);
        assert_eq!(buf[1], 0x12);
    }

    #[test]
    fn test_clamp_sample_saturates() {
        assert_eq!(clamp_sample(40000.0), i16::MAX);
        assert_eq!(clamp_sample(-40000.0), i16::MIN);
        assert_eq!(clamp_sample(12.9), 12);
    }

    #[test]
    fn test_sequence_applies_in_order() {
        let mut seq = FilterSequence::default();
        seq.push(Add(1, 0));
        seq.push(Double);
        let mut buf = [0u8; 2];
        set_sample(&mut buf, 0, 5);
        seq.filter(&mut buf);
        // (5 + 1) * 2, not 5 * 2 + 1
        assert_eq!(get_sample(&buf, 0), 12);
    }

    #[test]
    fn test_sequence_remaining_is_max() {
        let mut seq = FilterSequence::default();
        assert_eq!(seq.remaining_size(), 0);
        seq.push(Add(0, 40));
        seq.push(Add(0, 400));
        seq.push(Add(0, 4));
        assert_eq!(seq.remaining_size(), 400);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_filter_respects_slice_window() {
        let mut buf = [0u8; 6];
        let mut f = Add(3, 0);
        f.filter(&mut buf[2..4]);
        assert_eq!(get_sample(&buf, 0), 0);
        assert_eq!(get_sample(&buf, 2), 3);
        assert_eq!(get_sample(&buf, 4), 0);
    }
}

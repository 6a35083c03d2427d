//! Decaying feedback echo.

use super::filter::{SoundFilter, clamp_sample, get_sample, set_sample};

/// Level below which the echo tail is considered silent.
const FINAL_DECAY: f32 = 0.01;

/// Feedback delay line: each output sample is the input plus `decay` times
/// the output from `delay` samples earlier.
#[derive(Debug, Clone)]
pub struct EchoFilter {
    delay_buffer: Vec<i16>,
    pos: usize,
    decay: f32,
}

impl EchoFilter {
    /// `num_delay_samples` must be positive and `decay` in the open interval (0, 1).
    pub fn new(num_delay_samples: usize, decay: f32) -> Self {
        debug_assert!(num_delay_samples > 0, "echo delay must be positive");
        debug_assert!(decay > 0.0 && decay < 1.0, "echo decay must be in (0, 1)");
        EchoFilter {
            delay_buffer: vec![0; num_delay_samples.max(1)],
            pos: 0,
            decay,
        }
    }

    /// Builds an echo from a delay in milliseconds at the given sample rate.
    pub fn from_millis(delay_ms: u32, sample_rate: u32, decay: f32) -> Self {
        let samples = (sample_rate as u64 * delay_ms as u64 / 1000) as usize;
        Self::new(samples, decay)
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_buffer.len()
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }
}

impl SoundFilter for EchoFilter {
    fn filter(&mut self, samples: &mut [u8]) {
        for pos in (0..samples.len() / 2).map(|i| i * 2) {
            let old = get_sample(samples, pos);
            let echoed = clamp_sample(old as f32 + self.decay * self.delay_buffer[self.pos] as f32);
            set_sample(samples, pos, echoed);
            self.delay_buffer[self.pos] = echoed;
            self.pos += 1;
            if self.pos == self.delay_buffer.len() {
                self.pos = 0;
            }
        }
    }

    fn reset(&mut self) {
        self.delay_buffer.fill(0);
        self.pos = 0;
    }

    /// Bytes until the tail falls under one percent of its start.
    fn remaining_size(&self) -> usize {
        let passes = (FINAL_DECAY.ln() / self.decay.ln()).ceil() as usize;
        passes * self.delay_buffer.len() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len_samples: usize, amplitude: i16) -> Vec<u8> {
        let mut buf = vec![0u8; len_samples * 2];
        set_sample(&mut buf, 0, amplitude);
        buf
    }

    #[test]
    fn test_impulse_produces_decaying_echoes() {
        let delay = 4;
        let mut echo = EchoFilter::new(delay, 0.5);
        let mut buf = impulse(delay * 6, 1000);
        echo.filter(&mut buf);

        assert_eq!(get_sample(&buf, 0), 1000);
        assert_eq!(get_sample(&buf, delay * 2), 500);
        assert_eq!(get_sample(&buf, delay * 4), 250);
        assert_eq!(get_sample(&buf, delay * 6), 125);
        // between echoes stays silent
        assert_eq!(get_sample(&buf, 2), 0);
        assert_eq!(get_sample(&buf, delay * 2 + 2), 0);
    }

    #[test]
    fn test_echo_spans_multiple_calls() {
        let delay = 3;
        let mut echo = EchoFilter::new(delay, 0.5);
        let mut first = impulse(2, 800);
        echo.filter(&mut first);
        let mut second = vec![0u8; delay * 2];
        echo.filter(&mut second);
        // sample index 3 overall is index 1 of the second buffer
        assert_eq!(get_sample(&second, 2), 400);
    }

    #[test]
    fn test_remaining_size_is_finite() {
        let echo = EchoFilter::new(11025, 0.5);
        // ln(0.01) / ln(0.5) = 6.64 -> 7 passes
        assert_eq!(echo.remaining_size(), 7 * 11025 * 2);

        let slow = EchoFilter::new(100, 0.9);
        // ln(0.01) / ln(0.9) = 43.7 -> 44 passes
        assert_eq!(slow.remaining_size(), 44 * 100 * 2);
    }

    #[test]
    fn test_reset_silences_delay_line() {
        let mut echo = EchoFilter::new(2, 0.5);
        let mut buf = impulse(2, 1000);
        echo.filter(&mut buf);
        echo.reset();
        let mut silence = vec![0u8; 8];
        echo.filter(&mut silence);
        assert!(silence.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_from_millis() {
        let echo = EchoFilter::from_millis(250, 22050, 0.7);
        assert_eq!(echo.delay_samples(), 5512);
        assert_eq!(echo.decay(), 0.7);
    }
}

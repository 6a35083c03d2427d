use bevy_ecs::prelude::Resource;

/// Game clock in whole milliseconds.
///
/// Frame times rarely fall on a millisecond boundary; the fraction left over
/// each frame is carried into the next so no time is lost.
#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    /// Milliseconds since the game started.
    pub elapsed: u64,
    /// Milliseconds in this frame.
    pub delta: u64,
    pub time_scale: f32,
    carry: f32,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0,
            delta: 0,
            time_scale: 1.0,
            carry: 0.0,
        }
    }
}

impl WorldTime {
    /// Advances by `dt` seconds of real time.
    pub fn advance(&mut self, dt: f32) {
        let ms = (dt * self.time_scale).max(0.0) * 1000.0 + self.carry;
        let whole = ms.floor();
        self.carry = ms - whole;
        self.delta = whole as u64;
        self.elapsed += self.delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions_carry_over() {
        let mut t = WorldTime::default();
        t.advance(0.015625);
        assert_eq!(t.delta, 15);
        t.advance(0.015625);
        assert_eq!(t.delta, 16);
        assert_eq!(t.elapsed, 31);
    }

    #[test]
    fn test_time_scale() {
        let mut t = WorldTime {
            time_scale: 0.5,
            ..WorldTime::default()
        };
        t.advance(0.25);
        assert_eq!(t.delta, 125);
    }
}

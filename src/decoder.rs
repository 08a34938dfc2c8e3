//! Quadrature decoding.
//!
//! Only a rising clock edge is significant: the data level at that moment
//! gives the direction. Falling edges and clock re-reads produce nothing, so
//! one mechanical detent yields exactly one action.
//!
//! There is no debouncing here. A bouncing contact can produce a rising edge
//! with a transitional data level and therefore a spurious action; callers
//! that need noise immunity must filter before edges reach the decoder.

use crate::action::Action;
use crate::line::{Level, LevelPair};

/// Classifies one clock transition.
///
/// Returns `None` unless the clock went from low to high. On a rising edge,
/// data still low means counter-clockwise and data already high means
/// clockwise.
#[must_use]
pub const fn decode(previous_clock: Level, clock: Level, data: Level) -> Option<Action> {
    match (previous_clock, clock, data) {
        (Level::Low, Level::High, Level::Low) => Some(Action::CounterClockwise),
        (Level::Low, Level::High, Level::High) => Some(Action::Clockwise),
        _ => None,
    }
}

/// Decoder state carried between edge events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadratureDecoder {
    previous_clock: Level,
}

impl QuadratureDecoder {
    /// Seeds the decoder with the clock level read before edges start.
    #[must_use]
    pub const fn new(initial_clock: Level) -> Self {
        Self {
            previous_clock: initial_clock,
        }
    }

    /// Last clock level seen.
    #[must_use]
    pub const fn previous_clock(&self) -> Level {
        self.previous_clock
    }

    /// Decodes a sample and records its clock level, action or not.
    pub fn step(&mut self, levels: LevelPair) -> Option<Action> {
        let action = decode(self.previous_clock, levels.clock, levels.data);
        self.previous_clock = levels.clock;
        action
    }

    /// Re-seeds the remembered clock level.
    pub fn reset(&mut self, clock: Level) {
        self.previous_clock = clock;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Level::{High, Low};

    #[test]
    fn test_truth_table() {
        let table = [
            (Low, Low, Low, None),
            (Low, Low, High, None),
            (High, High, Low, None),
            (High, High, High, None),
            (Low, High, Low, Some(Action::CounterClockwise)),
            (Low, High, High, Some(Action::Clockwise)),
            (High, Low, Low, None),
            (High, Low, High, None),
        ];
        for (previous, clock, data, expected) in table {
            assert_eq!(
                decode(previous, clock, data),
                expected,
                "decode({previous}, {clock}, {data})"
            );
        }
    }

    #[test]
    fn test_one_detent_one_action() {
        let mut decoder = QuadratureDecoder::new(Low);
        let actions: Vec<Action> = [
            LevelPair::new(High, High),
            LevelPair::new(High, High),
            LevelPair::new(Low, High),
            LevelPair::new(Low, Low),
        ]
        .into_iter()
        .filter_map(|levels| decoder.step(levels))
        .collect();
        assert_eq!(actions, vec![Action::Clockwise]);
    }

    #[test]
    fn test_falling_edge_updates_state() {
        let mut decoder = QuadratureDecoder::new(High);
        assert_eq!(decoder.step(LevelPair::new(Low, Low)), None);
        assert_eq!(decoder.previous_clock(), Low);
        assert_eq!(
            decoder.step(LevelPair::new(High, Low)),
            Some(Action::CounterClockwise)
        );
        assert_eq!(decoder.previous_clock(), High);
    }

    #[test]
    fn test_seeded_high_ignores_first_high() {
        let mut decoder = QuadratureDecoder::new(High);
        assert_eq!(decoder.step(LevelPair::new(High, High)), None);
    }

    #[test]
    fn test_reset() {
        let mut decoder = QuadratureDecoder::new(High);
        decoder.reset(Low);
        assert_eq!(decoder.step(LevelPair::new(High, High)), Some(Action::Clockwise));
    }
}

//! Encoder actions delivered to consumers.

use serde::{Deserialize, Serialize};

/// A discrete user action decoded from the encoder lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// One detent clockwise.
    Clockwise,
    /// One detent counter-clockwise.
    CounterClockwise,
    /// Push-button press. Never produced by the quadrature decoder.
    Click,
}

impl Action {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clockwise => "clockwise",
            Self::CounterClockwise => "counterclockwise",
            Self::Click => "click",
        }
    }

    /// Signed step a counting consumer applies for this action.
    #[must_use]
    pub const fn delta(self) -> i64 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
            Self::Click => 0,
        }
    }

    /// Returns true for the two rotation actions.
    #[must_use]
    pub const fn is_rotation(self) -> bool {
        matches!(self, Self::Clockwise | Self::CounterClockwise)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Action::Clockwise).unwrap(), "\"clockwise\"");
        assert_eq!(
            serde_json::to_string(&Action::CounterClockwise).unwrap(),
            "\"counterclockwise\""
        );
        let click: Action = serde_json::from_str("\"click\"").unwrap();
        assert_eq!(click, Action::Click);
    }

    #[test]
    fn test_display_matches_serde() {
        for action in [Action::Clockwise, Action::CounterClockwise, Action::Click] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
        }
    }

    #[test]
    fn test_delta() {
        let total: i64 = [Action::Clockwise, Action::Clockwise, Action::CounterClockwise, Action::Click]
            .iter()
            .map(|a| a.delta())
            .sum();
        assert_eq!(total, 1);
        assert!(!Action::Click.is_rotation());
    }
}

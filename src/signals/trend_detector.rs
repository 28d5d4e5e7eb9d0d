use std::fmt;

use crate::error::StrategyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Downward,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Downward => write!(f, "downward"),
            Trend::Neutral => write!(f, "neutral"),
        }
    }
}

/// Simple moving average over the last `window` closes; the market is in a
/// downtrend when the latest close sits below that average.
#[derive(Debug, Clone, Copy)]
pub struct TrendDetector {
    window: usize,
}

impl TrendDetector {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// `closes` are oldest first. Only the most recent `window` values are used.
    pub fn detect(&self, closes: &[f64]) -> Result<Trend, StrategyError> {
        if closes.len() < self.window {
            return Err(StrategyError::InsufficientData {
                required: self.window,
                available: closes.len(),
            });
        }

        let recent = &closes[closes.len() - self.window..];
        let mean = recent.iter().sum::<f64>() / self.window as f64;
        let latest = recent[recent.len() - 1];

        tracing::debug!(latest, mean, window = self.window, "moving average");

        if latest < mean {
            Ok(Trend::Downward)
        } else {
            Ok(Trend::Neutral)
        }
    }

    /// Like [`TrendDetector::detect`], but a data gap never blocks trading.
    pub fn detect_or_neutral(&self, closes: &[f64]) -> Trend {
        match self.detect(closes) {
            Ok(trend) => trend,
            Err(error) => {
                tracing::warn!(%error, "trend unavailable, assuming neutral");
                Trend::Neutral
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_closes_are_a_downtrend() {
        let detector = TrendDetector::new(5);

        assert_eq!(
            detector.detect(&[100.0, 99.0, 98.0, 97.0, 96.0]).unwrap(),
            Trend::Downward
        );
    }

    #[test]
    fn rising_closes_are_neutral() {
        let detector = TrendDetector::new(5);

        assert_eq!(
            detector.detect(&[100.0, 101.0, 102.0, 103.0, 104.0]).unwrap(),
            Trend::Neutral
        );
    }

    #[test]
    fn latest_equal_to_mean_is_neutral() {
        let detector = TrendDetector::new(3);

        assert_eq!(detector.detect(&[5.0, 5.0, 5.0]).unwrap(), Trend::Neutral);
    }

    #[test]
    fn uses_only_the_most_recent_window() {
        let detector = TrendDetector::new(2);

        // the older spike is outside the window
        assert_eq!(detector.detect(&[500.0, 10.0, 11.0]).unwrap(), Trend::Neutral);
    }

    #[test]
    fn short_history_is_insufficient_data() {
        let detector = TrendDetector::new(5);

        let error = detector.detect(&[100.0, 99.0]).unwrap_err();
        assert!(matches!(
            error,
            StrategyError::InsufficientData {
                required: 5,
                available: 2
            }
        ));
        assert_eq!(detector.detect_or_neutral(&[100.0, 99.0]), Trend::Neutral);
    }
}

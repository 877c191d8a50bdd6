use serde::{Deserialize, Serialize};

/// Per-session answer accuracy counters.
///
/// Counters only grow; `current_streak` drops back to zero on a wrong answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    total: u32,
    correct: u32,
    current_streak: u32,
    max_streak: u32,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_answer(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
            self.current_streak = self.current_streak.saturating_add(1);
            self.max_streak = self.max_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    /// Percentage of correct answers, rounded; zero before the first answer.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = 100.0 * f64::from(self.correct) / f64::from(self.total);
        // pct is within 0..=100
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            pct.round() as u32
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total: self.total,
            correct: self.correct,
            current_streak: self.current_streak,
            max_streak: self.max_streak,
            accuracy: self.accuracy(),
        }
    }
}

/// Metrics as shown to clients, including the derived accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total: u32,
    pub correct: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub accuracy: u32,
}

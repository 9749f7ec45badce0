use clap::ValueEnum;

/// Narration speed used to budget words against a target duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pace {
    /// Conversational reading speed.
    Normal,
    /// Sped-up short-form narration (roughly 1.8x).
    Fast,
}

impl Pace {
    pub fn words_per_minute(self) -> f64 {
        match self {
            Pace::Normal => 150.0,
            Pace::Fast => 250.0,
        }
    }
}

/// How many words fit in `max_duration` seconds of narration.
pub fn word_budget(max_duration: f64, pace: Pace) -> usize {
    if !max_duration.is_finite() || max_duration <= 0.0 {
        return 0;
    }
    ((max_duration / 60.0) * pace.words_per_minute()) as usize
}

/// Seconds needed to narrate `word_count` words.
pub fn estimated_duration(word_count: usize, pace: Pace) -> f64 {
    word_count as f64 * 60.0 / pace.words_per_minute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_minute_budgets() {
        assert_eq!(word_budget(60.0, Pace::Normal), 150);
        assert_eq!(word_budget(60.0, Pace::Fast), 250);
        assert_eq!(word_budget(30.0, Pace::Fast), 125);
        assert_eq!(word_budget(-1.0, Pace::Fast), 0);
    }

    #[test]
    fn duration_inverts_the_budget() {
        assert!((estimated_duration(250, Pace::Fast) - 60.0).abs() < 1e-9);
        assert!((estimated_duration(75, Pace::Normal) - 30.0).abs() < 1e-9);
        assert_eq!(estimated_duration(0, Pace::Normal), 0.0);
    }
}

// Session performance statistics
//
// Derived from the composite scores of shots scored in Training mode.
// The score history is bounded; totals keep counting past the bound.
// Make/miss outcomes are reported separately and attach to the most recent
// scored shot, at most one per shot.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::analysis::FormAssessment;

/// Scores retained for consistency and trend
const MAX_SCORE_HISTORY: usize = 100;
/// Shots per trend window
const TREND_WINDOW: usize = 5;
/// Minimum change in mean score counted as a trend
const TREND_DEADBAND: f64 = 2.0;

/// Running statistics for one training session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    scores: VecDeque<f64>,
    total_shots: usize,
    good_form_shots: usize,
    score_sum: f64,
    best_score: f64,
    first_shot_ms: Option<u64>,
    last_shot_ms: Option<u64>,
    outcomes_recorded: usize,
    made_shots: usize,
    /// Latest scored shot has no outcome yet
    outcome_pending: bool,
}

/// Serializable summary of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_shots: usize,
    pub average_score: f64,
    pub best_score: f64,
    /// 100 minus the population stddev of recent scores, floored at 0
    pub consistency: f64,
    /// +1 improving, 0 flat, -1 declining (last 5 shots vs the 5 before)
    pub improvement_trend: i8,
    /// Share of shots with no dominant fault, 0-1
    pub good_form_rate: f64,
    /// Time between the first and last scored shot
    pub training_time_ms: u64,
    /// Shots with a reported outcome
    pub outcomes_recorded: usize,
    pub made_shots: usize,
    /// Made shots over reported outcomes, 0-1
    pub accuracy_rate: f64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, assessment: &FormAssessment, timestamp_ms: u64) {
        let score = assessment.score;
        if self.scores.len() == MAX_SCORE_HISTORY {
            self.scores.pop_front();
        }
        self.scores.push_back(score);

        self.total_shots += 1;
        self.score_sum += score;
        if assessment.is_good_form() {
            self.good_form_shots += 1;
        }
        if self.total_shots == 1 || score > self.best_score {
            self.best_score = score;
        }
        self.first_shot_ms.get_or_insert(timestamp_ms);
        self.last_shot_ms = Some(timestamp_ms);
        self.outcome_pending = true;
    }

    /// Attach a make/miss to the latest scored shot
    ///
    /// # Returns
    /// `false` if there is no scored shot still waiting for an outcome
    pub fn record_outcome(&mut self, made: bool) -> bool {
        if !self.outcome_pending {
            return false;
        }
        self.outcome_pending = false;
        self.outcomes_recorded += 1;
        if made {
            self.made_shots += 1;
        }
        true
    }

    pub fn total_shots(&self) -> usize {
        self.total_shots
    }

    pub fn summary(&self) -> StatsSummary {
        let n = self.total_shots;
        let average_score = if n == 0 { 0.0 } else { self.score_sum / n as f64 };
        let good_form_rate = if n == 0 {
            0.0
        } else {
            self.good_form_shots as f64 / n as f64
        };

        StatsSummary {
            total_shots: n,
            average_score,
            best_score: self.best_score,
            consistency: self.consistency(),
            improvement_trend: self.trend(),
            good_form_rate,
            training_time_ms: match (self.first_shot_ms, self.last_shot_ms) {
                (Some(first), Some(last)) => last.saturating_sub(first),
                _ => 0,
            },
            outcomes_recorded: self.outcomes_recorded,
            made_shots: self.made_shots,
            accuracy_rate: self.accuracy_rate(),
        }
    }

    pub fn accuracy_rate(&self) -> f64 {
        if self.outcomes_recorded == 0 {
            0.0
        } else {
            self.made_shots as f64 / self.outcomes_recorded as f64
        }
    }

    fn consistency(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let n = self.scores.len() as f64;
        let mean = self.scores.iter().sum::<f64>() / n;
        let variance = self.scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        (100.0 - variance.sqrt()).max(0.0)
    }

    fn trend(&self) -> i8 {
        if self.scores.len() < TREND_WINDOW * 2 {
            return 0;
        }
        let mean = |window: &[f64]| window.iter().sum::<f64>() / window.len() as f64;
        let recent: Vec<f64> = self.scores.iter().rev().take(TREND_WINDOW).copied().collect();
        let previous: Vec<f64> = self
            .scores
            .iter()
            .rev()
            .skip(TREND_WINDOW)
            .take(TREND_WINDOW)
            .copied()
            .collect();

        let delta = mean(&recent) - mean(&previous);
        if delta > TREND_DEADBAND {
            1
        } else if delta < -TREND_DEADBAND {
            -1
        } else {
            0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ErrorVector, FormFault};

    fn assessment(score: f64, fault: Option<FormFault>) -> FormAssessment {
        FormAssessment {
            score,
            errors: ErrorVector {
                dominant_fault: fault,
                ..ErrorVector::default()
            },
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = SessionStats::new().summary();
        assert_eq!(summary.total_shots, 0);
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.improvement_trend, 0);
    }

    #[test]
    fn test_average_best_and_good_form_rate() {
        let mut stats = SessionStats::new();
        stats.record(&assessment(80.0, None), 1000);
        stats.record(&assessment(60.0, Some(FormFault::Duration)), 3000);
        stats.record(&assessment(100.0, None), 6000);
        stats.record(&assessment(40.0, Some(FormFault::Acceleration)), 9000);

        let summary = stats.summary();
        assert_eq!(summary.total_shots, 4);
        assert!((summary.average_score - 70.0).abs() < 1e-9);
        assert_eq!(summary.best_score, 100.0);
        assert!((summary.good_form_rate - 0.5).abs() < 1e-9);
        assert_eq!(summary.training_time_ms, 8000);
        // Population stddev of [80, 60, 100, 40] is sqrt(500)
        assert!((summary.consistency - (100.0 - 500.0_f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_trend_direction() {
        let mut improving = SessionStats::new();
        for i in 0..10 {
            let score = if i < 5 { 60.0 } else { 80.0 };
            improving.record(&assessment(score, None), i * 1000);
        }
        assert_eq!(improving.summary().improvement_trend, 1);

        let mut declining = SessionStats::new();
        for i in 0..10 {
            let score = if i < 5 { 90.0 } else { 70.0 };
            declining.record(&assessment(score, None), i * 1000);
        }
        assert_eq!(declining.summary().improvement_trend, -1);

        let mut flat = SessionStats::new();
        for i in 0..10 {
            flat.record(&assessment(75.0 + (i % 2) as f64, None), i * 1000);
        }
        assert_eq!(flat.summary().improvement_trend, 0);
    }

    #[test]
    fn test_outcomes_attach_once_per_scored_shot() {
        let mut stats = SessionStats::new();
        assert!(!stats.record_outcome(true));

        stats.record(&assessment(90.0, None), 0);
        assert!(stats.record_outcome(true));
        assert!(!stats.record_outcome(false));

        stats.record(&assessment(70.0, None), 2000);
        stats.record(&assessment(75.0, None), 4000);
        assert!(stats.record_outcome(false));

        let summary = stats.summary();
        assert_eq!(summary.total_shots, 3);
        assert_eq!(summary.outcomes_recorded, 2);
        assert_eq!(summary.made_shots, 1);
        assert!((summary.accuracy_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_scores_and_outcomes() {
        let mut stats = SessionStats::new();
        stats.record(&assessment(90.0, None), 0);
        stats.record_outcome(true);
        stats.reset();
        assert_eq!(stats, SessionStats::new());
        assert_eq!(stats.summary().accuracy_rate, 0.0);
        assert!(!stats.record_outcome(true));
    }

    #[test]
    fn test_consistency_of_bimodal_scores() {
        let mut stats = SessionStats::new();
        for score in [0.0, 100.0, 0.0, 100.0] {
            stats.record(&assessment(score, None), 0);
        }
        assert!((stats.summary().consistency - 50.0).abs() < 1e-9);
    }
}

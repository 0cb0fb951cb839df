//! Turns one tick's `FaceSignal` into a bounded `FocusReading`.

pub mod config;

pub use config::ScoringConfig;

use crate::models::{FaceSignal, FocusReading};

pub const EYES_CLOSED_ALERT: &str = "Eyes closed - Stay alert!";
pub const YAWNING_ALERT: &str = "Yawning detected - Take a break?";
pub const MOVED_AWAY_ALERT: &str = "Looking away - Stay focused!";

const MAX_SCORE: i32 = 100;
const MIN_SCORE: i32 = 0;

/// Stateless scorer. Deductions are flat, independent and applied in a fixed
/// order; alerts follow the same order.
#[derive(Debug, Clone, Default)]
pub struct FocusScorer {
    config: ScoringConfig,
}

impl FocusScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, signal: &FaceSignal, timestamp_ms: i64) -> FocusReading {
        let mut score = MAX_SCORE;
        let mut alerts = Vec::new();

        if signal.eyes_closed {
            score = score.saturating_sub(self.config.eyes_closed_penalty);
            alerts.push(EYES_CLOSED_ALERT.to_string());
        }
        if signal.yawning {
            score = score.saturating_sub(self.config.yawning_penalty);
            alerts.push(YAWNING_ALERT.to_string());
        }
        if signal.moved_away {
            score = score.saturating_sub(self.config.moved_away_penalty);
            alerts.push(MOVED_AWAY_ALERT.to_string());
        }
        // Emotion costs points but never adds an alert.
        if signal.emotion.is_negative() {
            score = score.saturating_sub(self.config.negative_emotion_penalty);
        }

        FocusReading {
            score: score.clamp(MIN_SCORE, MAX_SCORE) as u8,
            alerts,
            emotion: signal.emotion,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Emotion;

    fn signal(eyes: bool, yawn: bool, moved: bool, emotion: Emotion) -> FaceSignal {
        FaceSignal {
            eyes_closed: eyes,
            yawning: yawn,
            moved_away: moved,
            emotion,
            emotion_confidence: 0.9,
        }
    }

    #[test]
    fn calm_signal_scores_full_marks() {
        let reading = FocusScorer::default().score(&signal(false, false, false, Emotion::Neutral), 7);
        assert_eq!(reading.score, 100);
        assert!(reading.alerts.is_empty());
        assert_eq!(reading.emotion, Emotion::Neutral);
        assert_eq!(reading.timestamp_ms, 7);
    }

    #[test]
    fn closed_eyes_alone_cost_thirty() {
        let reading = FocusScorer::default().score(&signal(true, false, false, Emotion::Happy), 0);
        assert_eq!(reading.score, 70);
        assert_eq!(reading.alerts, vec![EYES_CLOSED_ALERT.to_string()]);
    }

    #[test]
    fn every_condition_at_once_floors_at_ten() {
        let reading = FocusScorer::default().score(&signal(true, true, true, Emotion::Fear), 0);
        assert_eq!(reading.score, 10);
        assert_eq!(
            reading.alerts,
            vec![
                EYES_CLOSED_ALERT.to_string(),
                YAWNING_ALERT.to_string(),
                MOVED_AWAY_ALERT.to_string(),
            ]
        );
    }

    #[test]
    fn alerts_keep_evaluation_order() {
        let reading = FocusScorer::default().score(&signal(true, true, false, Emotion::Neutral), 0);
        assert_eq!(
            reading.alerts,
            vec![EYES_CLOSED_ALERT.to_string(), YAWNING_ALERT.to_string()]
        );
        assert_eq!(reading.score, 45);
    }

    #[test]
    fn negative_emotion_deducts_without_alert() {
        for emotion in [Emotion::Sad, Emotion::Angry, Emotion::Fear] {
            let reading = FocusScorer::default().score(&signal(false, false, false, emotion), 0);
            assert_eq!(reading.score, 85, "{emotion:?}");
            assert!(reading.alerts.is_empty());
        }
        for emotion in [Emotion::Surprise, Emotion::Disgust, Emotion::Unknown] {
            let reading = FocusScorer::default().score(&signal(false, false, false, emotion), 0);
            assert_eq!(reading.score, 100, "{emotion:?}");
        }
    }

    #[test]
    fn score_is_clamped_for_any_signal_and_weights() {
        let harsh = FocusScorer::new(ScoringConfig {
            eyes_closed_penalty: 80,
            yawning_penalty: 80,
            moved_away_penalty: 80,
            negative_emotion_penalty: 80,
            ..ScoringConfig::default()
        });
        let generous = FocusScorer::new(ScoringConfig {
            eyes_closed_penalty: -80,
            yawning_penalty: -80,
            moved_away_penalty: -80,
            negative_emotion_penalty: -80,
            ..ScoringConfig::default()
        });

        for bits in 0..8u8 {
            for emotion in Emotion::ALL {
                let s = signal(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, emotion);
                for scorer in [&FocusScorer::default(), &harsh, &generous] {
                    let reading = scorer.score(&s, 0);
                    assert!(reading.score <= 100);
                }
            }
        }
        assert_eq!(harsh.score(&signal(true, true, true, Emotion::Sad), 0).score, 0);
        assert_eq!(generous.score(&signal(true, true, true, Emotion::Sad), 0).score, 100);
    }

    #[test]
    fn extreme_penalties_saturate_instead_of_overflowing() {
        let extreme = |penalty: i32| {
            FocusScorer::new(ScoringConfig {
                eyes_closed_penalty: penalty,
                yawning_penalty: penalty,
                moved_away_penalty: penalty,
                negative_emotion_penalty: penalty,
                ..ScoringConfig::default()
            })
        };
        let everything = signal(true, true, true, Emotion::Fear);
        assert_eq!(extreme(i32::MAX).score(&everything, 0).score, 0);
        assert_eq!(extreme(i32::MIN).score(&everything, 0).score, 100);
    }
}

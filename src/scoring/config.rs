/// Thresholds and flat point deductions used by the extractor and scorer.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Average eye aspect ratio below this counts as closed eyes
    pub ear_threshold: f64,

    /// Mouth aspect ratio above this counts as a yawn
    pub mar_threshold: f64,

    /// Centroid displacement (reference frame units) above this counts as looking away
    pub movement_threshold: f64,

    /// Flat deductions from a starting score of 100
    pub eyes_closed_penalty: i32,
    pub yawning_penalty: i32,
    pub moved_away_penalty: i32,
    pub negative_emotion_penalty: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            mar_threshold: 0.6,
            movement_threshold: 50.0,
            eyes_closed_penalty: 30,
            yawning_penalty: 25,
            moved_away_penalty: 20,
            negative_emotion_penalty: 15,
        }
    }
}

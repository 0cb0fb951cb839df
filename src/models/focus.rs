use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Fear,
    Surprise,
    Disgust,
    Unknown,
}

impl Emotion {
    /// Classifier label order.
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Unknown => "unknown",
        }
    }

    /// Emotions that cost focus points.
    pub fn is_negative(&self) -> bool {
        matches!(self, Emotion::Sad | Emotion::Angry | Emotion::Fear)
    }
}

/// Normalized signals for one analysis tick. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FaceSignal {
    pub eyes_closed: bool,
    pub yawning: bool,
    pub moved_away: bool,
    pub emotion: Emotion,
    pub emotion_confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusReading {
    pub score: u8,
    pub alerts: Vec<String>,
    pub emotion: Emotion,
    pub timestamp_ms: i64,
}

impl FocusReading {
    /// Reading used when the classifier cannot answer.
    pub fn neutral(timestamp_ms: i64) -> Self {
        Self {
            score: 100,
            alerts: Vec::new(),
            emotion: Emotion::Neutral,
            timestamp_ms,
        }
    }
}

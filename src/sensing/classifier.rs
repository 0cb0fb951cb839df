use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::ClassifierError, models::{Emotion, FaceFrame}};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionPrediction {
    pub label: Emotion,
    pub confidence: f32,
    /// One score per entry of `Emotion::ALL`, when the model reports them.
    pub scores: Vec<f32>,
}

/// Emotion classifier capability. Implementations may block (native bridge,
/// model inference); callers run them off the async executor.
pub trait Classifier: Send + Sync {
    fn predict(&self, frame: &FaceFrame) -> Result<EmotionPrediction, ClassifierError>;
}

/// Placeholder model that draws a random score per label and reports the
/// highest. Stands in until a trained model is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomClassifier;

impl Classifier for RandomClassifier {
    fn predict(&self, _frame: &FaceFrame) -> Result<EmotionPrediction, ClassifierError> {
        let mut rng = rand::thread_rng();
        let scores: Vec<f32> = Emotion::ALL.iter().map(|_| rng.gen::<f32>()).collect();

        let (best, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |acc, (idx, score)| {
                if score > acc.1 {
                    (idx, score)
                } else {
                    acc
                }
            });

        Ok(EmotionPrediction {
            label: Emotion::ALL[best],
            confidence,
            scores,
        })
    }
}

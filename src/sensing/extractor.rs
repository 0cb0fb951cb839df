//! Landmark geometry: eye/mouth aspect ratios and face centroid movement.
//!
//! A missing or malformed landmark set only disables the signal it feeds;
//! it never fails the tick.

use crate::{
    models::{Emotion, FaceBounds, FaceLandmarks, FaceSignal, Point},
    scoring::ScoringConfig,
};

use super::classifier::EmotionPrediction;

const EYE_POINTS: usize = 6;
const MOUTH_POINTS: usize = 12;

/// Eye aspect ratio: (|p2-p6| + |p3-p5|) / (2 |p1-p4|).
pub fn eye_aspect_ratio(eye: &[Point]) -> Option<f64> {
    if eye.len() != EYE_POINTS {
        return None;
    }
    aspect_ratio((&eye[1], &eye[5]), (&eye[2], &eye[4]), (&eye[0], &eye[3]))
}

/// Mouth aspect ratio over the 12-point outer lip contour, measured the same
/// way as the eye ratio.
pub fn mouth_aspect_ratio(mouth: &[Point]) -> Option<f64> {
    if mouth.len() != MOUTH_POINTS {
        return None;
    }
    aspect_ratio(
        (&mouth[2], &mouth[10]),
        (&mouth[4], &mouth[8]),
        (&mouth[0], &mouth[6]),
    )
}

fn aspect_ratio(
    vertical_a: (&Point, &Point),
    vertical_b: (&Point, &Point),
    horizontal: (&Point, &Point),
) -> Option<f64> {
    let width = horizontal.0.distance(horizontal.1);
    if !width.is_finite() || width <= f64::EPSILON {
        return None;
    }
    let ratio =
        (vertical_a.0.distance(vertical_a.1) + vertical_b.0.distance(vertical_b.1)) / (2.0 * width);
    ratio.is_finite().then_some(ratio)
}

/// Per-session extractor. Holds the previous face centroid so movement can
/// be measured between consecutive ticks.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    ear_threshold: f64,
    mar_threshold: f64,
    movement_threshold: f64,
    last_centroid: Option<Point>,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl SignalExtractor {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            mar_threshold: config.mar_threshold,
            movement_threshold: config.movement_threshold,
            last_centroid: None,
        }
    }

    /// Forget the previous centroid; the next tick is treated as the first.
    pub fn reset(&mut self) {
        self.last_centroid = None;
    }

    pub fn extract(
        &mut self,
        landmarks: Option<&FaceLandmarks>,
        prediction: Option<&EmotionPrediction>,
    ) -> FaceSignal {
        let (emotion, emotion_confidence) = match prediction {
            Some(p) => (p.label, sanitize_confidence(p.confidence)),
            None => (Emotion::Neutral, 0.0),
        };

        let Some(landmarks) = landmarks else {
            return FaceSignal {
                emotion,
                emotion_confidence,
                ..FaceSignal::default()
            };
        };

        FaceSignal {
            eyes_closed: self.eyes_closed(landmarks),
            yawning: self.yawning(landmarks),
            moved_away: self.moved_away(landmarks.bounds.as_ref()),
            emotion,
            emotion_confidence,
        }
    }

    pub fn eyes_closed(&self, landmarks: &FaceLandmarks) -> bool {
        let left = landmarks.left_eye.as_deref().and_then(eye_aspect_ratio);
        let right = landmarks.right_eye.as_deref().and_then(eye_aspect_ratio);
        match (left, right) {
            (Some(l), Some(r)) => (l + r) / 2.0 < self.ear_threshold,
            _ => false,
        }
    }

    pub fn yawning(&self, landmarks: &FaceLandmarks) -> bool {
        landmarks
            .mouth
            .as_deref()
            .and_then(mouth_aspect_ratio)
            .map(|mar| mar > self.mar_threshold)
            .unwrap_or(false)
    }

    /// Compares the face centroid against the previous tick. The first tick
    /// with bounds only records a baseline. Ticks without bounds leave the
    /// baseline untouched.
    pub fn moved_away(&mut self, bounds: Option<&FaceBounds>) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        let current = bounds.centroid();
        if !current.x.is_finite() || !current.y.is_finite() {
            return false;
        }

        let moved = self
            .last_centroid
            .map(|previous| previous.distance(&current) > self.movement_threshold)
            .unwrap_or(false);
        self.last_centroid = Some(current);
        moved
    }
}

fn sanitize_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

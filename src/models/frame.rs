//! Raw per-frame inputs handed to the signal extractor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Face bounding box: top-left origin plus size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FaceBounds {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl FaceBounds {
    pub fn centroid(&self) -> Point {
        Point::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }
}

/// Landmark sets reported by the face detector. Any set may be absent.
///
/// Eyes carry 6 points ordered clockwise from a corner, the mouth 12.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    pub left_eye: Option<Vec<Point>>,
    pub right_eye: Option<Vec<Point>>,
    pub mouth: Option<Vec<Point>>,
    pub bounds: Option<FaceBounds>,
}

/// One camera frame: encoded image bytes for the classifier and whatever
/// landmarks the detector produced for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FaceFrame {
    #[serde(skip)]
    pub image: Vec<u8>,
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceFrame {
    pub fn from_landmarks(landmarks: FaceLandmarks) -> Self {
        Self {
            image: Vec::new(),
            landmarks: Some(landmarks),
        }
    }
}

pub mod focus;
pub mod frame;
pub mod session;

pub use focus::{Emotion, FaceSignal, FocusReading};
pub use frame::{FaceBounds, FaceFrame, FaceLandmarks, Point};
pub use session::{DistractionEvent, DistractionKind, SessionRecord};

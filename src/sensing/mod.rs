pub mod classifier;
pub mod extractor;
pub mod loop_worker;
pub mod monitor;

pub use classifier::{Classifier, EmotionPrediction, RandomClassifier};
pub use extractor::SignalExtractor;
pub use loop_worker::{focus_loop, FrameSlot, FrameSource, DEFAULT_FOCUS_INTERVAL};
pub use monitor::FocusMonitor;

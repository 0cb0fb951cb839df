use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use chrono::Utc;

use crate::{
    error::ClassifierError,
    models::{FaceFrame, FocusReading},
    scoring::{FocusScorer, ScoringConfig},
};

use super::{
    classifier::{Classifier, EmotionPrediction},
    extractor::SignalExtractor,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one scoring tick: classifier, signal extraction, scoring.
///
/// At most one analysis runs at a time; a call that arrives while another is
/// outstanding is skipped rather than queued.
pub struct FocusMonitor {
    classifier: Arc<dyn Classifier>,
    extractor: Mutex<SignalExtractor>,
    scorer: FocusScorer,
    classifier_timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the last clone is dropped. One clone rides
/// into the blocking classifier call, so a timed-out or cancelled analysis
/// keeps the monitor busy until `predict` really returns.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Arc<Self>> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Arc::new(Self(Arc::clone(flag))))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FocusMonitor {
    pub fn new(classifier: Arc<dyn Classifier>, config: ScoringConfig) -> Self {
        Self {
            classifier,
            extractor: Mutex::new(SignalExtractor::new(&config)),
            scorer: FocusScorer::new(config),
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a fresh movement baseline, used when a new session begins.
    pub fn reset(&self) {
        self.extractor().reset();
    }

    /// Returns `None` when the tick was skipped because another analysis is
    /// still outstanding. A failing classifier yields the neutral reading.
    pub async fn analyze(&self, frame: FaceFrame) -> Option<FocusReading> {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            log_debug!("focus analysis still in flight, skipping tick");
            return None;
        };

        let timestamp_ms = Utc::now().timestamp_millis();
        let frame = Arc::new(frame);

        let prediction = match self.classify(Arc::clone(&frame), Arc::clone(&guard)).await {
            Ok(prediction) => prediction,
            Err(err) => {
                log_warn!("emotion classifier unavailable, using neutral reading: {err}");
                return Some(FocusReading::neutral(timestamp_ms));
            }
        };

        let signal = self
            .extractor()
            .extract(frame.landmarks.as_ref(), Some(&prediction));
        let reading = self.scorer.score(&signal, timestamp_ms);
        drop(guard);
        Some(reading)
    }

    async fn classify(
        &self,
        frame: Arc<FaceFrame>,
        guard: Arc<InFlightGuard>,
    ) -> Result<EmotionPrediction, ClassifierError> {
        let classifier = Arc::clone(&self.classifier);
        let worker = tokio::task::spawn_blocking(move || {
            let result = classifier.predict(&frame);
            drop(guard);
            result
        });

        match tokio::time::timeout(self.classifier_timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ClassifierError::Failed(format!(
                "classifier worker join failed: {join_err}"
            ))),
            Err(_) => Err(ClassifierError::Timeout(
                self.classifier_timeout.as_millis() as u64,
            )),
        }
    }

    fn extractor(&self) -> MutexGuard<'_, SignalExtractor> {
        match self.extractor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

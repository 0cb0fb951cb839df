use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::{FaceFrame, FocusReading};

use super::monitor::FocusMonitor;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub const DEFAULT_FOCUS_INTERVAL: Duration = Duration::from_millis(3000);

/// Supplies the most recent camera frame, if any, when a tick fires.
pub trait FrameSource: Send + Sync {
    fn next_frame(&self) -> Option<FaceFrame>;
}

/// Single-slot frame buffer: the camera publishes, the focus loop takes.
/// Older unconsumed frames are overwritten.
#[derive(Default)]
pub struct FrameSlot {
    latest: Mutex<Option<FaceFrame>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: FaceFrame) {
        let mut guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(frame);
    }
}

impl FrameSource for FrameSlot {
    fn next_frame(&self) -> Option<FaceFrame> {
        let mut guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take()
    }
}

/// Ticks every `interval` (first tick one interval after start) until the
/// token is cancelled. Ticks without a frame are skipped. An analysis still
/// running when the token fires is dropped without delivering its reading.
pub async fn focus_loop<F>(
    monitor: Arc<FocusMonitor>,
    frames: Arc<dyn FrameSource>,
    interval: Duration,
    cancel_token: CancellationToken,
    mut on_reading: F,
) where
    F: FnMut(FocusReading) + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = frames.next_frame() else {
                    log_debug!("no frame available for focus tick");
                    continue;
                };

                tokio::select! {
                    reading = monitor.analyze(frame) => {
                        if let Some(reading) = reading {
                            on_reading(reading);
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("focus loop cancelled mid-analysis");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("focus loop shutting down");
                break;
            }
        }
    }
}

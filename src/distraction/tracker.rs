use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    db::SessionStore,
    models::{DistractionEvent, DistractionKind},
};

use super::lifecycle::{AppLifecycle, LifecycleHandler, LifecycleSource, SubscriptionHandle};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Invoked with the kind and the new running count on every distraction.
/// Runs on the thread that delivered the lifecycle notification and must not
/// call back into the tracker.
pub type DistractionCallback = Arc<dyn Fn(DistractionKind, u32) + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerState {
    Idle,
    Monitoring,
    /// Subscription dropped while the session is paused; count frozen.
    Suspended,
}

struct TrackerShared {
    state: TrackerState,
    session_id: Option<i64>,
    count: u32,
    callback: Option<DistractionCallback>,
    events_tx: Option<UnboundedSender<DistractionEvent>>,
}

fn lock_shared(shared: &Mutex<TrackerShared>) -> MutexGuard<'_, TrackerShared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Counts app-switch distractions for one session at a time.
///
/// The in-memory count is authoritative. Events are queued to a single
/// writer task so they reach the store in detection order; store failures
/// are logged and never touch the count.
pub struct DistractionTracker<S: SessionStore> {
    shared: Arc<Mutex<TrackerShared>>,
    lifecycle: Arc<dyn LifecycleSource>,
    store: S,
    subscription: Option<SubscriptionHandle>,
    writer: Option<JoinHandle<()>>,
}

impl<S: SessionStore> DistractionTracker<S> {
    pub fn new(lifecycle: Arc<dyn LifecycleSource>, store: S) -> Self {
        Self {
            shared: Arc::new(Mutex::new(TrackerShared {
                state: TrackerState::Idle,
                session_id: None,
                count: 0,
                callback: None,
                events_tx: None,
            })),
            lifecycle,
            store,
            subscription: None,
            writer: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        lock_shared(&self.shared).state
    }

    pub fn session_id(&self) -> Option<i64> {
        lock_shared(&self.shared).session_id
    }

    /// Count of the current session, or the final count of the last one.
    pub fn distraction_count(&self) -> u32 {
        lock_shared(&self.shared).count
    }

    /// Idle -> Monitoring with a zeroed counter. Returns false (and changes
    /// nothing) when a session is already being tracked.
    pub fn start_monitoring(&mut self, session_id: i64, on_distraction: DistractionCallback) -> bool {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        {
            let mut shared = lock_shared(&self.shared);
            if shared.state != TrackerState::Idle {
                log_warn!(
                    "monitoring already active for session {:?}, ignoring start for {}",
                    shared.session_id,
                    session_id
                );
                return false;
            }
            shared.state = TrackerState::Monitoring;
            shared.session_id = Some(session_id);
            shared.count = 0;
            shared.callback = Some(on_distraction);
            shared.events_tx = Some(events_tx);
        }

        // A writer from the previous session may still be draining; it ends
        // on its own once its queue is empty.
        self.writer = Some(tokio::spawn(persist_events(self.store.clone(), events_rx)));
        self.subscribe();

        log_info!("App monitoring started for session {}", session_id);
        true
    }

    /// Monitoring -> Suspended: unsubscribe, keep session and count.
    pub fn suspend(&mut self) -> bool {
        {
            let mut shared = lock_shared(&self.shared);
            if shared.state != TrackerState::Monitoring {
                return false;
            }
            shared.state = TrackerState::Suspended;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        log_info!("App monitoring suspended at {} distractions", self.distraction_count());
        true
    }

    /// Suspended -> Monitoring, continuing the same count.
    pub fn resume(&mut self) -> bool {
        {
            let mut shared = lock_shared(&self.shared);
            if shared.state != TrackerState::Suspended {
                return false;
            }
            shared.state = TrackerState::Monitoring;
        }
        self.subscribe();
        log_info!("App monitoring resumed");
        true
    }

    /// Back to Idle. Returns the final count, or `None` if nothing was being
    /// tracked. No handler mutates the count once this returns.
    pub fn stop_monitoring(&mut self) -> Option<u32> {
        let final_count = {
            let mut shared = lock_shared(&self.shared);
            if shared.state == TrackerState::Idle {
                return None;
            }
            shared.state = TrackerState::Idle;
            shared.session_id = None;
            shared.callback = None;
            // Closing the queue lets the writer finish what is already queued.
            shared.events_tx = None;
            shared.count
        };

        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }

        log_info!("App monitoring stopped with {} distractions", final_count);
        Some(final_count)
    }

    /// Wait until every event of the last stopped session reached the store.
    /// Returns immediately while a session is still tracked.
    pub async fn flush(&mut self) {
        if self.state() != TrackerState::Idle {
            return;
        }
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.await {
                log_error!("distraction writer task failed: {err}");
            }
        }
    }

    fn subscribe(&mut self) {
        let shared = Arc::clone(&self.shared);
        let handler: LifecycleHandler = Arc::new(move |state: AppLifecycle| handle_lifecycle(&shared, state));
        self.subscription = Some(self.lifecycle.subscribe(handler));
    }
}

fn handle_lifecycle(shared: &Mutex<TrackerShared>, state: AppLifecycle) {
    if !state.is_away() {
        return;
    }

    let mut shared = lock_shared(shared);
    if shared.state != TrackerState::Monitoring {
        return;
    }
    let Some(session_id) = shared.session_id else {
        return;
    };

    // No debounce: every away transition counts.
    shared.count += 1;
    let count = shared.count;
    let kind = DistractionKind::AppSwitch;

    if let Some(callback) = shared.callback.as_ref() {
        callback(kind, count);
    }

    let event = DistractionEvent {
        session_id,
        kind,
        timestamp_ms: Utc::now().timestamp_millis(),
    };
    if let Some(tx) = shared.events_tx.as_ref() {
        if tx.send(event).is_err() {
            log_warn!("distraction writer gone; event for session {} not persisted", session_id);
        }
    }

    log_info!("Distraction logged: {} (Total: {})", kind.as_str(), count);
}

async fn persist_events<S: SessionStore>(store: S, mut events: UnboundedReceiver<DistractionEvent>) {
    while let Some(event) = events.recv().await {
        if let Err(err) = store.save_distraction(&event).await {
            log_error!(
                "Failed to log distraction for session {}: {err}",
                event.session_id
            );
        }
    }
}

impl<S: SessionStore> Drop for DistractionTracker<S> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

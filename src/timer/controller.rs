use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex as StdMutex, MutexGuard, Weak,
    },
    time::Duration,
};

use chrono::{DateTime, SubsecRound, Utc};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    db::SessionStore,
    distraction::{DistractionCallback, DistractionTracker, LifecycleSource, TrackerState},
    error::SessionError,
    models::{DistractionKind, FocusReading, SessionRecord},
    sensing::{focus_loop, FocusMonitor, FrameSource, DEFAULT_FOCUS_INTERVAL},
};

use super::{SessionEvent, SessionSnapshot, SessionState, TimerState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_HEARTBEAT_TICKS: u32 = 10;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct AccountantConfig {
    /// Countdown resolution.
    pub tick_interval: Duration,
    pub heartbeat_every_ticks: u32,
    pub focus_interval: Duration,
    pub alerts_enabled: bool,
}

impl Default for AccountantConfig {
    fn default() -> Self {
        let debug_mode = std::env::var("STUDYFOCUS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            heartbeat_every_ticks: if debug_mode { 1 } else { DEFAULT_HEARTBEAT_TICKS },
            focus_interval: DEFAULT_FOCUS_INTERVAL,
            alerts_enabled: true,
        }
    }
}

struct FocusPipeline {
    monitor: Arc<FocusMonitor>,
    frames: Arc<dyn FrameSource>,
}

struct FocusTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

struct AccountantInner<S: SessionStore> {
    state: StdMutex<TimerState>,
    tracker: Mutex<DistractionTracker<S>>,
    store: S,
    focus: Option<FocusPipeline>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    focus_task: Mutex<Option<FocusTask>>,
    events: broadcast::Sender<SessionEvent>,
    config: AccountantConfig,
    last_session_id: AtomicI64,
}

/// Owns one study session at a time: countdown, distraction tracking, focus
/// readings, and the final `SessionRecord`.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionAccountant<S: SessionStore> {
    inner: Arc<AccountantInner<S>>,
}

pub struct SessionAccountantBuilder<S: SessionStore> {
    planned_duration_sec: u32,
    store: S,
    lifecycle: Arc<dyn LifecycleSource>,
    config: AccountantConfig,
    focus: Option<FocusPipeline>,
}

impl<S: SessionStore> SessionAccountantBuilder<S> {
    pub fn config(mut self, config: AccountantConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the focus loop on `frames` while the session is running.
    pub fn focus_monitor(mut self, monitor: Arc<FocusMonitor>, frames: Arc<dyn FrameSource>) -> Self {
        self.focus = Some(FocusPipeline { monitor, frames });
        self
    }

    pub fn build(self) -> Result<SessionAccountant<S>, SessionError> {
        if self.planned_duration_sec == 0 {
            return Err(SessionError::InvalidDuration);
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let planned_ms = u64::from(self.planned_duration_sec) * 1000;

        Ok(SessionAccountant {
            inner: Arc::new(AccountantInner {
                state: StdMutex::new(TimerState::new(planned_ms)),
                tracker: Mutex::new(DistractionTracker::new(self.lifecycle, self.store.clone())),
                store: self.store,
                focus: self.focus,
                ticker: Mutex::new(None),
                focus_task: Mutex::new(None),
                events,
                config: self.config,
                last_session_id: AtomicI64::new(0),
            }),
        })
    }
}

impl<S: SessionStore> SessionAccountant<S> {
    pub fn builder(
        planned_duration_sec: u32,
        store: S,
        lifecycle: Arc<dyn LifecycleSource>,
    ) -> SessionAccountantBuilder<S> {
        SessionAccountantBuilder {
            planned_duration_sec,
            store,
            lifecycle,
            config: AccountantConfig::default(),
            focus: None,
        }
    }

    pub fn new(
        planned_duration_sec: u32,
        store: S,
        lifecycle: Arc<dyn LifecycleSource>,
    ) -> Result<Self, SessionError> {
        Self::builder(planned_duration_sec, store, lifecycle).build()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock_state().status
    }

    pub async fn tracker_state(&self) -> TrackerState {
        self.inner.tracker.lock().await.state()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot().await
    }

    /// NotStarted -> Running: begins the countdown and distraction tracking.
    pub async fn start(&self) -> Result<SessionSnapshot, SessionError> {
        let session_id = {
            let mut state = self.inner.lock_state();
            if state.status != SessionState::NotStarted {
                return Err(SessionError::InvalidTransition {
                    from: state.status,
                    op: "start",
                });
            }
            let session_id = self.inner.allocate_session_id();
            state.begin_session(session_id, Utc::now(), Instant::now());
            session_id
        };

        {
            let mut tracker = self.inner.tracker.lock().await;
            if let Some(previous) = tracker.session_id() {
                log_warn!("terminating tracking of session {} before starting {}", previous, session_id);
                tracker.stop_monitoring();
            }
            tracker.start_monitoring(session_id, self.inner.distraction_callback());
        }

        if let Some(focus) = self.inner.focus.as_ref() {
            focus.monitor.reset();
        }

        spawn_ticker(&self.inner).await;
        spawn_focus_loop(&self.inner, session_id).await;

        log_info!("Session {} started", session_id);
        self.inner.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Running <-> Paused. Pausing freezes the countdown and the distraction
    /// count; resuming continues both.
    pub async fn toggle(&self) -> Result<SessionState, SessionError> {
        let (next, session_id) = {
            let mut state = self.inner.lock_state();
            match state.status {
                SessionState::Running => state.pause(),
                SessionState::Paused => state.resume(Instant::now()),
                other => {
                    return Err(SessionError::InvalidTransition {
                        from: other,
                        op: "toggle",
                    })
                }
            }
            (state.status, state.session_id)
        };

        match next {
            SessionState::Paused => {
                self.inner.tracker.lock().await.suspend();
                self.inner.cancel_ticker().await;
                self.inner.stop_focus_loop().await;
                log_info!("Session {:?} paused", session_id);
            }
            _ => {
                self.inner.tracker.lock().await.resume();
                spawn_ticker(&self.inner).await;
                if let Some(session_id) = session_id {
                    spawn_focus_loop(&self.inner, session_id).await;
                }
                log_info!("Session {:?} resumed", session_id);
            }
        }

        self.inner.emit_state_changed().await;
        Ok(next)
    }

    /// From any state back to NotStarted with the planned duration restored.
    /// Everything accumulated for the session is discarded.
    pub async fn reset(&self) -> SessionSnapshot {
        let session_id = {
            let mut state = self.inner.lock_state();
            let session_id = state.session_id;
            state.reset();
            session_id
        };

        self.inner.cancel_ticker().await;
        self.inner.stop_focus_loop().await;
        self.inner.tracker.lock().await.stop_monitoring();

        log_info!("Session {:?} reset", session_id);
        self.inner.emit_state_changed().await;
        self.snapshot().await
    }

    /// End a running or paused session before the countdown finishes and
    /// record it with the time actually spent.
    pub async fn end_early(&self) -> Result<SessionRecord, SessionError> {
        let session_id = {
            let state = self.inner.lock_state();
            match (state.status, state.session_id) {
                (SessionState::Running | SessionState::Paused, Some(id)) => id,
                (other, _) => {
                    return Err(SessionError::InvalidTransition {
                        from: other,
                        op: "end",
                    })
                }
            }
        };

        self.inner.cancel_ticker().await;
        self.inner.stop_focus_loop().await;
        let final_distractions = self
            .inner
            .tracker
            .lock()
            .await
            .stop_monitoring()
            .unwrap_or(0);

        let record = {
            let mut state = self.inner.lock_state();
            if state.session_id != Some(session_id) {
                return Err(SessionError::InvalidTransition {
                    from: state.status,
                    op: "end",
                });
            }
            state.sync_active_from_anchor();
            let active_ms = state.current_active_ms().min(state.planned_ms);
            let record = SessionRecord {
                id: session_id,
                planned_duration_sec: ms_to_secs(state.planned_ms),
                completed_time_sec: (active_ms / 1000) as u32,
                focus_score: state.focus.score(),
                distraction_count: final_distractions,
                created_at: record_timestamp(),
            };
            state.reset();
            record
        };

        self.inner.emit_state_changed().await;

        match self.inner.store.save_session(&record).await {
            Ok(_) => {
                log_info!(
                    "Session {} ended early after {}s",
                    record.id,
                    record.completed_time_sec
                );
                self.inner.emit(SessionEvent::Abandoned(record.clone()));
                Ok(record)
            }
            Err(err) => {
                log_error!("Failed to save session {}: {err}", record.id);
                self.inner.emit(SessionEvent::SaveFailed {
                    session_id: record.id,
                    message: err.to_string(),
                });
                Err(SessionError::Storage(err))
            }
        }
    }

    /// Fold an externally produced reading into the running session.
    /// Ignored unless the session is running.
    pub fn record_reading(&self, reading: FocusReading) -> bool {
        self.inner.apply_reading(None, reading)
    }

    /// Wait until distraction events of the last stopped session are stored.
    pub async fn flush(&self) {
        self.inner.tracker.lock().await.flush().await;
    }
}

impl<S: SessionStore> AccountantInner<S> {
    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Millisecond timestamps, bumped when two sessions start within the
    /// same millisecond.
    fn allocate_session_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_session_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        self.emit(SessionEvent::StateChanged(snapshot));
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let live_count = self.tracker.lock().await.distraction_count();
        let mut state = self.lock_state();
        state.sync_active_from_anchor();

        let distraction_count = match state.status {
            SessionState::NotStarted => 0,
            SessionState::Completed => state.final_distractions.unwrap_or(live_count),
            SessionState::Running | SessionState::Paused => live_count,
        };

        SessionSnapshot {
            state: state.status,
            session_id: state.session_id,
            planned_duration_sec: ms_to_secs(state.planned_ms),
            remaining_sec: ms_to_secs(state.remaining_ms()),
            distraction_count,
            focus_score: state.focus.score(),
            latest_reading: state.latest_reading.clone(),
        }
    }

    fn distraction_callback(&self) -> DistractionCallback {
        let events = self.events.clone();
        Arc::new(move |kind: DistractionKind, count: u32| {
            let _ = events.send(SessionEvent::Distraction { kind, count });
        })
    }

    fn apply_reading(&self, session_id: Option<i64>, reading: FocusReading) -> bool {
        {
            let mut state = self.lock_state();
            if state.status != SessionState::Running {
                log_debug!("dropping focus reading, session is {:?}", state.status);
                return false;
            }
            if session_id.is_some() && state.session_id != session_id {
                log_debug!("dropping focus reading from a previous session");
                return false;
            }
            state.record_reading(reading.clone());
        }

        let first_alert = reading.alerts.first().cloned();
        self.emit(SessionEvent::FocusUpdated(reading));
        if self.config.alerts_enabled {
            if let Some(message) = first_alert {
                self.emit(SessionEvent::AlertRaised { message });
            }
        }
        true
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn stop_focus_loop(&self) {
        let task = self.focus_task.lock().await.take();
        if let Some(task) = task {
            task.cancel_token.cancel();
            if let Err(err) = task.handle.await {
                log_error!("focus loop task failed to join: {err}");
            }
        }
    }

    /// Countdown reached zero: stop tracking, record the full planned
    /// duration, save. A failed save sends the session back to NotStarted.
    ///
    /// The session is claimed as Completed under the state lock before any
    /// await, so a concurrent `toggle` sees Completed and is rejected.
    async fn complete_session(&self) {
        let session_id = {
            let mut state = self.lock_state();
            match (state.status, state.session_id) {
                (SessionState::Running, Some(id)) => {
                    state.complete();
                    id
                }
                _ => return,
            }
        };

        let stopped = self.tracker.lock().await.stop_monitoring();
        self.stop_focus_loop().await;

        let record = {
            let mut state = self.lock_state();
            if state.status != SessionState::Completed || state.session_id != Some(session_id) {
                log_warn!(
                    "session {} was reset while completing, discarding {:?} distractions",
                    session_id,
                    stopped
                );
                return;
            }
            let final_distractions = match stopped {
                Some(count) => count,
                None => {
                    log_warn!("tracker was not monitoring session {} at completion", session_id);
                    0
                }
            };
            state.final_distractions = Some(final_distractions);
            SessionRecord {
                id: session_id,
                planned_duration_sec: ms_to_secs(state.planned_ms),
                completed_time_sec: ms_to_secs(state.planned_ms),
                focus_score: state.focus.score(),
                distraction_count: final_distractions,
                created_at: record_timestamp(),
            }
        };

        self.emit_state_changed().await;

        match self.store.save_session(&record).await {
            Ok(_) => {
                log_info!(
                    "Session {} completed: focus {} with {} distractions",
                    record.id,
                    record.focus_score,
                    record.distraction_count
                );
                self.emit(SessionEvent::Completed(record));
            }
            Err(err) => {
                log_error!("Failed to save completed session {}: {err}", record.id);
                {
                    let mut state = self.lock_state();
                    if state.session_id == Some(session_id) {
                        state.reset();
                    }
                }
                self.emit(SessionEvent::SaveFailed {
                    session_id: record.id,
                    message: err.to_string(),
                });
                self.emit_state_changed().await;
            }
        }
    }
}

async fn spawn_ticker<S: SessionStore>(inner: &Arc<AccountantInner<S>>) {
    let mut ticker_guard = inner.ticker.lock().await;
    if let Some(handle) = ticker_guard.take() {
        handle.abort();
    }

    let weak: Weak<AccountantInner<S>> = Arc::downgrade(inner);
    let tick_interval = inner.config.tick_interval;
    let heartbeat_every = inner.config.heartbeat_every_ticks.max(1);

    let handle = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
        let mut ticks: u32 = 0;
        loop {
            interval.tick().await;

            let Some(inner) = weak.upgrade() else {
                break;
            };

            let remaining = {
                let mut guard = inner.lock_state();
                if guard.status != SessionState::Running {
                    break;
                }
                guard.sync_active_from_anchor();
                guard.remaining_ms()
            };

            if remaining == 0 {
                inner.complete_session().await;
                break;
            }

            ticks = ticks.wrapping_add(1);
            if ticks % heartbeat_every == 0 {
                inner.emit(SessionEvent::Heartbeat {
                    remaining_sec: ms_to_secs(remaining),
                });
            }
        }
    });

    *ticker_guard = Some(handle);
}

async fn spawn_focus_loop<S: SessionStore>(inner: &Arc<AccountantInner<S>>, session_id: i64) {
    let Some(pipeline) = inner.focus.as_ref() else {
        return;
    };

    let mut task_guard = inner.focus_task.lock().await;
    if let Some(previous) = task_guard.take() {
        previous.cancel_token.cancel();
    }

    let cancel_token = CancellationToken::new();
    let weak: Weak<AccountantInner<S>> = Arc::downgrade(inner);
    let handle = tokio::spawn(focus_loop(
        Arc::clone(&pipeline.monitor),
        Arc::clone(&pipeline.frames),
        inner.config.focus_interval,
        cancel_token.clone(),
        move |reading| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_reading(Some(session_id), reading);
            }
        },
    ));

    *task_guard = Some(FocusTask {
        cancel_token,
        handle,
    });
}

/// Stored timestamps keep millisecond precision.
fn record_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn ms_to_secs(ms: u64) -> u32 {
    u32::try_from(ms.div_ceil(1000)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::Database,
        distraction::{AppLifecycle, LifecycleHub},
        error::{ClassifierError, StorageError},
        models::{DistractionEvent, Emotion, FaceFrame},
        scoring::{ScoringConfig, EYES_CLOSED_ALERT},
        sensing::{Classifier, EmotionPrediction, FrameSlot},
    };

    #[derive(Clone)]
    struct FailingStore;

    impl SessionStore for FailingStore {
        async fn save_session(&self, _record: &SessionRecord) -> Result<i64, StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        async fn save_distraction(&self, _event: &DistractionEvent) -> Result<(), StorageError> {
            Ok(())
        }

        async fn list_sessions(&self, _limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> AccountantConfig {
        AccountantConfig {
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: 1,
            focus_interval: Duration::from_secs(3),
            alerts_enabled: true,
        }
    }

    fn setup(planned_sec: u32) -> (SessionAccountant<Database>, LifecycleHub, Database) {
        let hub = LifecycleHub::new();
        let db = Database::open_in_memory().unwrap();
        let accountant = SessionAccountant::builder(planned_sec, db.clone(), Arc::new(hub.clone()))
            .config(test_config())
            .build()
            .unwrap();
        (accountant, hub, db)
    }

    fn reading(score: u8, alerts: &[&str]) -> FocusReading {
        FocusReading {
            score,
            alerts: alerts.iter().map(|a| a.to_string()).collect(),
            emotion: Emotion::Neutral,
            timestamp_ms: 0,
        }
    }

    async fn wait_for<F>(rx: &mut broadcast::Receiver<SessionEvent>, mut pick: F) -> SessionEvent
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        loop {
            let event = rx.recv().await.unwrap();
            if pick(&event) {
                return event;
            }
        }
    }

    #[test]
    fn zero_duration_is_rejected() {
        let result = SessionAccountant::new(
            0,
            FailingStore,
            Arc::new(LifecycleHub::new()),
        );
        assert!(matches!(result, Err(SessionError::InvalidDuration)));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_completion_records_full_duration() {
        let (accountant, hub, db) = setup(3);
        let mut rx = accountant.subscribe();

        let snapshot = accountant.start().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Running);
        assert_eq!(snapshot.remaining_sec, 3);

        hub.emit(AppLifecycle::Background);
        assert!(accountant.record_reading(reading(60, &[])));
        assert!(accountant.record_reading(reading(81, &[])));

        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::Completed(_))).await;
        let SessionEvent::Completed(record) = event else {
            unreachable!()
        };
        assert_eq!(record.planned_duration_sec, 3);
        assert_eq!(record.completed_time_sec, 3);
        assert_eq!(record.distraction_count, 1);
        assert_eq!(record.focus_score, 71);
        assert_eq!(Some(record.id), snapshot.session_id);

        assert_eq!(accountant.state(), SessionState::Completed);
        assert_eq!(accountant.tracker_state().await, TrackerState::Idle);
        let saved = db.list_recent_sessions(10).await.unwrap();
        assert_eq!(saved, vec![record]);

        // Nothing is attributed to a finished session.
        hub.emit(AppLifecycle::Background);
        assert!(!accountant.record_reading(reading(10, &[])));
        let snapshot = accountant.snapshot().await;
        assert_eq!(snapshot.distraction_count, 1);
        assert_eq!(snapshot.remaining_sec, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_count_down_every_tick() {
        let (accountant, _hub, _db) = setup(3);
        let mut rx = accountant.subscribe();
        accountant.start().await.unwrap();

        let mut beats = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                SessionEvent::Heartbeat { remaining_sec } => beats.push(remaining_sec),
                SessionEvent::Completed(_) => break,
                _ => {}
            }
        }
        assert_eq!(beats, vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_countdown_and_distractions() {
        let (accountant, hub, _db) = setup(10);
        let mut rx = accountant.subscribe();
        accountant.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        hub.emit(AppLifecycle::Background);
        assert_eq!(accountant.toggle().await.unwrap(), SessionState::Paused);

        tokio::time::sleep(Duration::from_secs(30)).await;
        hub.emit(AppLifecycle::Background);
        assert!(!accountant.record_reading(reading(50, &[])));
        let snapshot = accountant.snapshot().await;
        assert_eq!(snapshot.state, SessionState::Paused);
        assert_eq!(snapshot.remaining_sec, 6);
        assert_eq!(snapshot.distraction_count, 1);
        assert_eq!(accountant.tracker_state().await, TrackerState::Suspended);

        assert_eq!(accountant.toggle().await.unwrap(), SessionState::Running);
        hub.emit(AppLifecycle::Inactive);

        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::Completed(_))).await;
        let SessionEvent::Completed(record) = event else {
            unreachable!()
        };
        assert_eq!(record.completed_time_sec, 10);
        assert_eq!(record.distraction_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_paused_restores_fresh_session() {
        let (accountant, hub, db) = setup(1500);
        accountant.start().await.unwrap();
        for _ in 0..3 {
            hub.emit(AppLifecycle::Background);
        }
        tokio::time::sleep(Duration::from_secs(90)).await;
        accountant.toggle().await.unwrap();
        assert_eq!(accountant.snapshot().await.distraction_count, 3);

        let snapshot = accountant.reset().await;
        assert_eq!(snapshot.state, SessionState::NotStarted);
        assert_eq!(snapshot.remaining_sec, 1500);
        assert_eq!(snapshot.planned_duration_sec, 1500);
        assert_eq!(snapshot.distraction_count, 0);
        assert!(snapshot.session_id.is_none());
        assert_eq!(accountant.tracker_state().await, TrackerState::Idle);
        assert_eq!(hub.subscriber_count(), 0);

        let restarted = accountant.start().await.unwrap();
        assert_eq!(restarted.distraction_count, 0);
        hub.emit(AppLifecycle::Background);
        assert_eq!(accountant.snapshot().await.distraction_count, 1);
        assert_ne!(restarted.session_id, None);

        accountant.reset().await;
        assert!(db.list_recent_sessions(10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_during_completion_keeps_final_count() {
        let (accountant, hub, db) = setup(2);
        let mut rx = accountant.subscribe();
        accountant.start().await.unwrap();
        hub.emit(AppLifecycle::Background);

        // Completion blocks on the tracker while another caller holds it.
        let held = accountant.inner.tracker.lock().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(accountant.state(), SessionState::Completed);

        let toggled = tokio::spawn({
            let accountant = accountant.clone();
            async move { accountant.toggle().await }
        })
        .await
        .unwrap();
        assert!(matches!(
            toggled,
            Err(SessionError::InvalidTransition { from: SessionState::Completed, op: "toggle" })
        ));
        drop(held);

        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::Completed(_))).await;
        let SessionEvent::Completed(record) = event else {
            unreachable!()
        };
        assert_eq!(record.distraction_count, 1);
        assert_eq!(accountant.snapshot().await.distraction_count, 1);
        assert_eq!(db.get_session(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_returns_to_not_started() {
        let hub = LifecycleHub::new();
        let accountant = SessionAccountant::builder(2, FailingStore, Arc::new(hub.clone()))
            .config(test_config())
            .build()
            .unwrap();
        let mut rx = accountant.subscribe();

        accountant.start().await.unwrap();
        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::SaveFailed { .. })).await;
        assert!(matches!(event, SessionEvent::SaveFailed { message, .. } if message.contains("disk full")));

        assert_eq!(accountant.state(), SessionState::NotStarted);
        assert_eq!(accountant.snapshot().await.remaining_sec, 2);
        assert!(accountant.start().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn end_early_records_elapsed_time() {
        let (accountant, hub, db) = setup(60);
        let mut rx = accountant.subscribe();
        accountant.start().await.unwrap();
        hub.emit(AppLifecycle::Background);
        tokio::time::sleep(Duration::from_secs(15)).await;

        let record = accountant.end_early().await.unwrap();
        assert_eq!(record.planned_duration_sec, 60);
        assert_eq!(record.completed_time_sec, 15);
        assert_eq!(record.distraction_count, 1);
        assert_eq!(record.focus_score, 100);
        assert_eq!(accountant.state(), SessionState::NotStarted);

        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::Abandoned(_))).await;
        assert_eq!(event, SessionEvent::Abandoned(record.clone()));
        assert_eq!(db.get_session(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn invalid_transitions_are_reported() {
        let (accountant, _hub, _db) = setup(60);
        assert!(matches!(
            accountant.toggle().await,
            Err(SessionError::InvalidTransition { from: SessionState::NotStarted, .. })
        ));
        assert!(accountant.end_early().await.is_err());

        accountant.start().await.unwrap();
        assert!(matches!(
            accountant.start().await,
            Err(SessionError::InvalidTransition { from: SessionState::Running, op: "start" })
        ));
        accountant.reset().await;
    }

    #[tokio::test]
    async fn alerts_follow_readings_when_enabled() {
        let (accountant, _hub, _db) = setup(60);
        let mut rx = accountant.subscribe();
        accountant.start().await.unwrap();

        accountant.record_reading(reading(70, &[EYES_CLOSED_ALERT]));
        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::AlertRaised { .. })).await;
        assert_eq!(
            event,
            SessionEvent::AlertRaised {
                message: EYES_CLOSED_ALERT.to_string()
            }
        );
        let snapshot = accountant.snapshot().await;
        assert_eq!(snapshot.latest_reading.unwrap().score, 70);
        accountant.reset().await;
    }

    struct SadClassifier;

    impl Classifier for SadClassifier {
        fn predict(&self, _frame: &FaceFrame) -> Result<EmotionPrediction, ClassifierError> {
            Ok(EmotionPrediction {
                label: Emotion::Sad,
                confidence: 0.7,
                scores: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn focus_loop_feeds_running_session_only() {
        let hub = LifecycleHub::new();
        let slot = Arc::new(FrameSlot::new());
        let monitor = Arc::new(FocusMonitor::new(Arc::new(SadClassifier), ScoringConfig::default()));
        let accountant = SessionAccountant::builder(60, Database::open_in_memory().unwrap(), Arc::new(hub))
            .config(AccountantConfig {
                focus_interval: Duration::from_millis(20),
                ..test_config()
            })
            .focus_monitor(monitor, slot.clone())
            .build()
            .unwrap();
        let mut rx = accountant.subscribe();

        accountant.start().await.unwrap();
        slot.publish(FaceFrame::default());
        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::FocusUpdated(_))).await;
        let SessionEvent::FocusUpdated(reading) = event else {
            unreachable!()
        };
        assert_eq!(reading.score, 85);
        assert_eq!(reading.emotion, Emotion::Sad);

        accountant.toggle().await.unwrap();
        slot.publish(FaceFrame::default());
        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, SessionEvent::FocusUpdated(_)));
        }
        assert_eq!(accountant.snapshot().await.focus_score, 85);
        accountant.reset().await;
    }
}

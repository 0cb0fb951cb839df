//! Application lifecycle notifications behind an explicit subscribe/cancel
//! interface. Platform bindings implement `LifecycleSource`; `LifecycleHub`
//! is the in-process implementation they (and tests) can drive directly.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Foreground,
    Background,
    Inactive,
}

impl AppLifecycle {
    /// True for the states that mean the user left the app.
    pub fn is_away(&self) -> bool {
        matches!(self, AppLifecycle::Background | AppLifecycle::Inactive)
    }
}

pub type LifecycleHandler = Arc<dyn Fn(AppLifecycle) + Send + Sync>;

pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self, handler: LifecycleHandler) -> SubscriptionHandle;
}

/// Live subscription. Cancelling (or dropping) it detaches the handler.
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    handlers: BTreeMap<u64, LifecycleHandler>,
}

#[derive(Clone, Default)]
pub struct LifecycleHub {
    inner: Arc<Mutex<HubInner>>,
}

fn lock_hub(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl LifecycleHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a transition to every current subscriber, in subscription
    /// order. Handlers run outside the hub lock and may cancel themselves.
    pub fn emit(&self, state: AppLifecycle) {
        let handlers: Vec<LifecycleHandler> = lock_hub(&self.inner).handlers.values().cloned().collect();
        for handler in handlers {
            handler(state);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock_hub(&self.inner).handlers.len()
    }
}

impl LifecycleSource for LifecycleHub {
    fn subscribe(&self, handler: LifecycleHandler) -> SubscriptionHandle {
        let id = {
            let mut inner = lock_hub(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.insert(id, handler);
            id
        };

        let hub: Weak<Mutex<HubInner>> = Arc::downgrade(&self.inner);
        SubscriptionHandle::new(move || {
            if let Some(inner) = hub.upgrade() {
                lock_hub(&inner).handlers.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: &Arc<AtomicUsize>) -> LifecycleHandler {
        let counter = Arc::clone(counter);
        Arc::new(move |_: AppLifecycle| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn cancel_detaches_handler() {
        let hub = LifecycleHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = hub.subscribe(counting_handler(&hits));

        hub.emit(AppLifecycle::Background);
        assert_eq!(hub.subscriber_count(), 1);
        handle.cancel();
        hub.emit(AppLifecycle::Background);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn dropping_handle_detaches_handler() {
        let hub = LifecycleHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let _handle = hub.subscribe(counting_handler(&hits));
            hub.emit(AppLifecycle::Inactive);
        }
        hub.emit(AppLifecycle::Inactive);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handle_outliving_hub_is_harmless() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = {
            let hub = LifecycleHub::new();
            hub.subscribe(counting_handler(&hits))
        };
        handle.cancel();
    }

    #[test]
    fn away_states() {
        assert!(AppLifecycle::Background.is_away());
        assert!(AppLifecycle::Inactive.is_away());
        assert!(!AppLifecycle::Foreground.is_away());
    }
}

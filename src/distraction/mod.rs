pub mod lifecycle;
pub mod tracker;

pub use lifecycle::{AppLifecycle, LifecycleHandler, LifecycleHub, LifecycleSource, SubscriptionHandle};
pub use tracker::{DistractionCallback, DistractionTracker, TrackerState};

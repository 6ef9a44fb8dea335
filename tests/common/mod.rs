#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use travelplace_checkout::store::MemoryStorage;
use travelplace_checkout::session::ManualClock;
use travelplace_checkout::{NavigationMode, Navigator, Notice, Notifier, SessionStore};

pub const NOW: i64 = 1_750_000_000_000;

/// Routes crate logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TripDetails {
    pub from: String,
    pub to: String,
    pub passengers: u32,
}

pub fn create_trip_details() -> TripDetails {
    TripDetails {
        from: "LOS".to_string(),
        to: "ACC".to_string(),
        passengers: 2,
    }
}

pub fn create_session() -> (SessionStore<MemoryStorage>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let session = SessionStore::new(MemoryStorage::new()).with_clock(clock.clone());
    (session, clock)
}

/// Records every navigation and notification it receives.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    navigations: Arc<Mutex<Vec<(String, NavigationMode)>>>,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Recorder {
    pub fn navigations(&self) -> Vec<(String, NavigationMode)> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Navigator for Recorder {
    fn navigate(&self, target: &str, mode: NavigationMode) {
        self.navigations
            .lock()
            .unwrap()
            .push((target.to_string(), mode));
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

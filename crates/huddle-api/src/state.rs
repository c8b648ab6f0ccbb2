use std::sync::Arc;

use huddle_store::Store;

use crate::standup::StandupTimers;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub standups: StandupTimers,
    /// Base URL advertised in profile image links.
    pub base_url: String,
}

impl AppStateInner {
    pub fn new(store: Store, base_url: impl Into<String>) -> AppState {
        Arc::new(Self {
            store,
            standups: StandupTimers::default(),
            base_url: base_url.into(),
        })
    }
}

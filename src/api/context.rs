use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::db::ClientStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ClientStore>,
}

impl AppState {
    #[cfg(test)]
    pub fn new_testing() -> Self {
        use crate::db::MemoryStore;

        AppState {
            config: Arc::new(Config::new_testing()),
            store: Arc::new(MemoryStore::default()),
        }
    }
}

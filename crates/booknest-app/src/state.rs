use std::sync::Arc;

use booknest_dal::Pool;
use booknest_store::CoverStore;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, store: CoverStore) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                pool,
                store,
                app_config,
            }),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn store(&self) -> &CoverStore {
        &self.state.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }
}

struct AppStateInner {
    pool: Pool,
    store: CoverStore,
    app_config: AppConfig,
}

pub struct AppConfig {
    /// Request body cap for the edit form, slightly above the cover policy
    /// limit so an oversized image gets a validation message, not a 413.
    pub upload_limit_mb: usize,
}

use std::sync::Arc;

use crate::config::Config;
use crate::store::Store;

/// État partagé injecté dans chaque handler via `web::Data<AppState>`
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

use std::sync::Arc;
use std::time::Instant;
use storage_status::StorageEngine;

pub struct AppState {
    pub engine: Arc<dyn StorageEngine>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            started_at: Instant::now(),
        }
    }
}

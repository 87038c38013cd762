pub mod handlers;
pub mod routes;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::engine::TestEngine;

/// Shared server state. `engine` is `None` when the device could not be
/// reached at startup; handlers then answer 503 instead of panicking.
/// One device connection means one run at a time, hence the mutex.
pub struct AppState {
    pub engine: Option<Arc<Mutex<TestEngine>>>,
}

impl AppState {
    pub fn new(engine: Option<TestEngine>) -> Self {
        Self {
            engine: engine.map(|e| Arc::new(Mutex::new(e))),
        }
    }
}

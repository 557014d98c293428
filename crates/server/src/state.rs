//! Shared application state injected into Axum handlers.

use std::sync::Arc;

use danbot_core::Predictor;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    predictor: Arc<dyn Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self {
            inner: Arc::new(Inner { predictor }),
        }
    }

    /// Owned handle for moving into blocking tasks.
    pub fn predictor(&self) -> Arc<dyn Predictor> {
        self.inner.predictor.clone()
    }
}

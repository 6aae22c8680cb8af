use std::sync::Arc;

use crate::llm_client::Provider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation provider. Production: `GeminiClient`. Tests swap in a mock.
    pub provider: Arc<dyn Provider>,
}

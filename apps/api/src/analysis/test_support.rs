//! In-memory `Provider` used by the analysis and routing tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm_client::{LlmError, Provider, StructuredPrompt};

/// Scripted provider. `json_reply = None` simulates a transport failure.
/// Image calls whose prompt mentions a label in `failing_labels` fail.
#[derive(Default)]
pub struct MockProvider {
    pub json_reply: Option<Value>,
    pub failing_labels: Vec<&'static str>,
    pub image_delay: Option<Duration>,
    pub json_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub events: Mutex<Vec<String>>,
    pub last_prompt: Mutex<Option<String>>,
    pub last_had_image: Mutex<bool>,
}

impl MockProvider {
    pub fn replying(value: Value) -> Self {
        Self {
            json_reply: Some(value),
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate_json(&self, request: StructuredPrompt<'_>) -> Result<Value, LlmError> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("json".to_string());
        *self.last_prompt.lock().unwrap() = Some(request.prompt.to_string());
        *self.last_had_image.lock().unwrap() = request.image.is_some();

        self.json_reply.clone().ok_or(LlmError::Api {
            status: 503,
            message: "upstream unavailable".to_string(),
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("image".to_string());

        if let Some(delay) = self.image_delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_labels.iter().any(|label| prompt.contains(label)) {
            return Err(LlmError::Blocked("IMAGE_SAFETY".to_string()));
        }

        let slug = prompt.len();
        Ok(format!("data:image/png;base64,aW1n{slug}"))
    }
}

//! Mock provider for testing.

use super::{ContentSegment, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// How the mock answers every call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Reply with this text.
    Text(String),
    /// Reply with a non-text first segment.
    NonText,
    /// Fail as if the upstream call errored.
    Fail,
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    last_call: Mutex<Option<RecordedCall>>,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(MockBehavior::Text(text.to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.last_call
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_call.lock() {
            *last = Some(RecordedCall {
                system_instruction: system_instruction.to_string(),
                prompt: prompt.to_string(),
                params: *params,
            });
        }

        let segment = match &self.behavior {
            MockBehavior::Text(text) => ContentSegment::Text(text.clone()),
            MockBehavior::NonText => ContentSegment::NonText("tool_use".to_string()),
            MockBehavior::Fail => {
                return Err(ProviderError::Api {
                    status: 529,
                    message: "Overloaded".to_string(),
                })
            }
        };

        Ok(ProviderResponse {
            segment,
            input_tokens: prompt.len() as u32 / 4,
            output_tokens: 10,
            stop_reason: Some("end_turn".to_string()),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

//! Mock provider for testing.

use super::{ProviderError, UpstreamClient};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns a canned reply and records the prompts it was sent.
pub struct MockUpstream {
    reply: Result<String, (u16, String)>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockUpstream {
    /// Always answer with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(Ok(text.into()))
    }

    /// Always fail as if the provider returned `status` with `detail`.
    pub fn failing(status: u16, detail: impl Into<String>) -> Self {
        Self::with_reply(Err((status, detail.into())))
    }

    fn with_reply(reply: Result<String, (u16, String)>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, detail)) => Err(ProviderError::Upstream {
                status: *status,
                detail: detail.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

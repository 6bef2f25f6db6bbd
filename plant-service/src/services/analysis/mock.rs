//! Mock provider implementation for testing.

use super::{AnalysisProvider, ProviderError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockReply {
    Fixed(String),
    Echo,
    Fail(String),
}

/// Mock analysis provider for testing.
pub struct MockAnalysisProvider {
    reply: MockReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockAnalysisProvider {
    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Fixed(text.into()))
    }

    /// Answer with a description that embeds the received bytes, so callers
    /// can check which image produced which analysis.
    pub fn echo() -> Self {
        Self::with_reply(MockReply::Echo)
    }

    /// Always fail with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Fail(message.into()))
    }

    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `analyze` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Text produced by [`MockAnalysisProvider::echo`] for the given input.
pub fn echo_text(image: &[u8], mime_type: &str) -> String {
    format!(
        "Mock analysis of {} ({} bytes): {}",
        mime_type,
        image.len(),
        STANDARD.encode(image)
    )
}

#[async_trait]
impl AnalysisProvider for MockAnalysisProvider {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            MockReply::Fixed(text) => Ok(text.clone()),
            MockReply::Echo => Ok(echo_text(image, mime_type)),
            MockReply::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.reply {
            MockReply::Fail(message) => Err(ProviderError::NotConfigured(message.clone())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_calls() {
        let provider = MockAnalysisProvider::fixed("A healthy fern");
        assert_eq!(provider.calls(), 0);

        let text = provider.analyze(b"img", "image/png").await.unwrap();
        assert_eq!(text, "A healthy fern");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn echo_embeds_input() {
        let provider = MockAnalysisProvider::echo();
        let text = provider.analyze(b"leaf", "image/jpeg").await.unwrap();
        assert_eq!(text, echo_text(b"leaf", "image/jpeg"));
        assert!(text.contains("image/jpeg"));
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let provider = MockAnalysisProvider::failing("quota exceeded");
        let err = provider.analyze(b"img", "image/png").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(provider.health_check().await.is_err());
    }
}

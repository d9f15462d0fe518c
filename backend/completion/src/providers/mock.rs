use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chatbridge_core::{
    BridgeError, CompletionLimits, CompletionRequest, CompletionResponse, CompletionService,
};

/// A completion service that returns canned candidates and records requests.
#[derive(Default)]
pub struct MockCompletionService {
    candidates: Vec<String>,
    failure_status: Option<u16>,
    echo: bool,
    delay: Option<Duration>,
    delays_by_input: HashMap<String, Duration>,
    requests: Mutex<Vec<(CompletionRequest, CompletionLimits)>>,
}

impl MockCompletionService {
    /// A service that answers with no candidates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate to every response.
    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.candidates.push(text.into());
        self
    }

    /// Fail every request as if upstream returned `status`.
    pub fn with_status(mut self, status: u16) -> Self {
        self.failure_status = Some(status);
        self
    }

    /// Answer every request with its own user text.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep for `delay` before answering requests whose user text is `input`.
    /// Takes precedence over [`with_delay`](Self::with_delay).
    pub fn with_delay_for(mut self, input: impl Into<String>, delay: Duration) -> Self {
        self.delays_by_input.insert(input.into(), delay);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.recorded().into_iter().map(|(r, _)| r).collect()
    }

    pub fn limits(&self) -> Vec<CompletionLimits> {
        self.recorded().into_iter().map(|(_, l)| l).collect()
    }

    fn recorded(&self) -> Vec<(CompletionRequest, CompletionLimits)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request(
        &self,
        request: &CompletionRequest,
        limits: &CompletionLimits,
    ) -> Result<CompletionResponse, BridgeError> {
        if let Ok(mut recorded) = self.requests.lock() {
            recorded.push((request.clone(), *limits));
        }
        let delay = self
            .delays_by_input
            .get(&request.user_text)
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.failure_status {
            return Err(BridgeError::CompletionService {
                status,
                body: "mock failure".to_string(),
            });
        }
        let candidates = if self.echo {
            vec![request.user_text.clone()]
        } else {
            self.candidates.clone()
        };
        Ok(CompletionResponse { candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            system_prompt: String::new(),
            user_text: text.to_string(),
        }
    }

    const LIMITS: CompletionLimits = CompletionLimits {
        max_output_tokens: 250,
        sample_count: 1,
        temperature: 0.8,
    };

    #[tokio::test]
    async fn echoing_returns_user_text() {
        let mock = MockCompletionService::new().echoing();
        let response = mock.request(&request("ahoy"), &LIMITS).await.unwrap();
        assert_eq!(response.candidates, vec!["ahoy".to_string()]);
    }

    #[tokio::test]
    async fn per_input_delay_overrides_default() {
        let mock = MockCompletionService::new()
            .with_delay(Duration::from_millis(300))
            .with_delay_for("quick", Duration::ZERO);

        let started = Instant::now();
        mock.request(&request("quick"), &LIMITS).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(300));

        let started = Instant::now();
        mock.request(&request("other"), &LIMITS).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(mock.requests().len(), 2);
    }
}

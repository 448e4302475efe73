use super::ImageBackend;
use crate::models::{GenerationRequest, GenerationResponse, HealthStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One canned reply for [`MockBackend::generate_image`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(GenerationResponse),
    Failure(String),
}

pub struct MockBackend {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    health: Arc<Mutex<Option<HealthStatus>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            health: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: GenerationResponse) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Response(response));
        self
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Failure(message.into()));
        self
    }

    pub fn with_health(self, health: HealthStatus) -> Self {
        *self.health.lock().unwrap() = Some(health);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBackend for MockBackend {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request.clone());

        let replies = self.replies.lock().unwrap();
        let reply = if replies.is_empty() {
            // PNG signature only
            MockReply::Response(GenerationResponse::with_image(
                "data:image/png;base64,iVBORw0KGgo=",
            ))
        } else {
            replies[(*count - 1) % replies.len()].clone()
        };

        match reply {
            MockReply::Response(response) => Ok(response),
            MockReply::Failure(message) => Err(Error::Transport(message)),
        }
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let health = self.health.lock().unwrap().clone();
        Ok(health.unwrap_or_else(|| HealthStatus {
            status: "healthy".to_string(),
            model_loaded: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_default_reply() {
        let backend = MockBackend::new();
        let response = backend
            .generate_image(&GenerationRequest::new("a red fox"))
            .await
            .unwrap();

        assert_eq!(response.image_kind(), "string");
        assert_eq!(backend.get_call_count(), 1);
        assert_eq!(backend.requests()[0].prompt, "a red fox");
    }

    #[tokio::test]
    async fn test_mock_backend_cycles_replies() {
        let backend = MockBackend::new()
            .with_response(GenerationResponse::with_image("AAAA"))
            .with_failure("connection reset");

        let request = GenerationRequest::new("x");
        assert!(backend.generate_image(&request).await.is_ok());

        let err = backend.generate_image(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");

        // Should cycle back
        assert!(backend.generate_image(&request).await.is_ok());
        assert_eq!(backend.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_health() {
        let backend = MockBackend::new().with_health(HealthStatus {
            status: "loading".to_string(),
            model_loaded: false,
        });

        let health = backend.check_health().await.unwrap();
        assert!(!health.model_loaded);
    }
}

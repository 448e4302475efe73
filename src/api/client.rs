use super::{ImageBackend, GENERATE_PATH, HEALTH_PATH};
use crate::config::Config;
use crate::models::{GenerationRequest, GenerationResponse, HealthStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// HTTP client for the generation backend.
pub struct ApiClient {
    client: Client,
    base_url: String,
    bearer: HeaderValue,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::new_with_client(config, Client::new())
    }

    pub fn new_with_client(config: &Config, client: Client) -> Result<Self> {
        let mut bearer = HeaderValue::from_str(&config.bearer_token())
            .map_err(|e| Error::Config(format!("API key is not a valid header value: {}", e)))?;
        bearer.set_sensitive(true);

        Ok(Self {
            client,
            base_url: config.backend_base_url.clone(),
            bearer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a request against `path`, relative to the backend base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Builds a request and applies the header policy.
    ///
    /// Every request carries the bearer token except OPTIONS, which must
    /// reach cross-origin preflight checks without credentials.
    pub fn prepare(&self, builder: RequestBuilder) -> Result<Request> {
        let mut request = builder.build()?;

        if request.method() == Method::OPTIONS {
            request.headers_mut().remove(AUTHORIZATION);
        } else {
            request
                .headers_mut()
                .insert(AUTHORIZATION, self.bearer.clone());
        }

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            headers = ?request.headers(),
            "Outgoing request"
        );
        Ok(request)
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let response = self.client.execute(request).await.map_err(|e| {
            tracing::error!("Failed to send request to backend: {}", e);
            e
        })?;

        let status_error = response.error_for_status_ref().err();
        if let Some(err) = status_error {
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| unavailable_body(&e));
            tracing::error!(
                status = status.as_u16(),
                status_text = status.canonical_reason().unwrap_or(""),
                headers = ?headers,
                "Backend API error: {}",
                body
            );
            return Err(Error::Http(err));
        }

        tracing::debug!(
            status = response.status().as_u16(),
            headers = ?response.headers(),
            "Response received"
        );
        Ok(response)
    }

    async fn send_json<Resp: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Resp> {
        let request = self.prepare(builder)?;
        let response = self.execute(request).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse backend response: {}\nBody: {}", e, body);
            Error::Serialization(e)
        })
    }

    /// Sends an OPTIONS request to `path` and returns the status.
    pub async fn preflight(&self, path: &str) -> Result<StatusCode> {
        let request = self.prepare(self.request(Method::OPTIONS, path))?;
        let response = self.execute(request).await?;
        Ok(response.status())
    }
}

fn unavailable_body(err: &dyn std::fmt::Display) -> String {
    format!("<body unavailable: {}>", err)
}

#[async_trait]
impl ImageBackend for ApiClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        tracing::info!("Making request to: {}{}", self.base_url, GENERATE_PATH);

        let builder = self.request(Method::POST, GENERATE_PATH).json(request);
        let response: GenerationResponse = self.send_json(builder).await.map_err(|e| {
            tracing::error!("Generate image failed: {}", e);
            e
        })?;

        tracing::debug!(
            has_image = response.image.is_some(),
            image_type = response.image_kind(),
            image_length = ?response.image_len(),
            status = ?response.status,
            "Response data"
        );
        Ok(response)
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let builder = self.request(Method::GET, HEALTH_PATH);
        self.send_json(builder).await.map_err(|e| {
            tracing::error!("Health check failed: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: &str) -> ApiClient {
        let config = Config::new(server.uri(), api_key).unwrap();
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_prepare_adds_bearer_to_post() {
        let config = Config::new("http://localhost:8000", "key").unwrap();
        let client = ApiClient::new(&config).unwrap();

        let request = client
            .prepare(client.request(Method::POST, GENERATE_PATH))
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8000/api/generate");
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer key");
    }

    #[test]
    fn test_prepare_strips_bearer_from_options() {
        let config = Config::new("http://localhost:8000", "key").unwrap();
        let client = ApiClient::new(&config).unwrap();

        let builder = client
            .request(Method::OPTIONS, GENERATE_PATH)
            .header(AUTHORIZATION, "Bearer leaked");
        let request = client.prepare(builder).unwrap();

        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_unreadable_error_body_keeps_reason() {
        let body = unavailable_body(&"connection closed before message completed");
        assert_eq!(
            body,
            "<body unavailable: connection closed before message completed>"
        );
    }

    #[test]
    fn test_invalid_api_key_is_config_error() {
        let config = Config::new("http://localhost:8000", "bad\nkey").unwrap();
        let result = ApiClient::new(&config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_generate_image_posts_json_with_bearer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "prompt": "a red fox",
                "num_steps": 60,
                "guidance_scale": 7.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "image": "data:image/png;base64,iVBORw0KGgo=",
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "test-key");
        let response = client
            .generate_image(&GenerationRequest::new("a red fox"))
            .await
            .unwrap();

        assert_eq!(
            response,
            GenerationResponse {
                image: Some(serde_json::json!("data:image/png;base64,iVBORw0KGgo=")),
                status: Some("ok".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_generate_image_server_error_is_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let client = client_for(&server, "key");
        let err = client
            .generate_image(&GenerationRequest::new("a red fox"))
            .await
            .unwrap_err();

        match err {
            Error::Http(inner) => {
                assert_eq!(inner.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_image_unparseable_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, "key");
        let err = client
            .generate_image(&GenerationRequest::new("a red fox"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Serialization(_)));
    }

    #[tokio::test]
    async fn test_network_failure_is_http_error() {
        // Nothing listens on the discard port.
        let config = Config::new("http://127.0.0.1:9", "key").unwrap();
        let client = ApiClient::new(&config).unwrap();

        let err = client.check_health().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_check_health() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .and(header("authorization", "Bearer key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "model_loaded": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "key");
        let health = client.check_health().await.unwrap();

        assert_eq!(
            health,
            HealthStatus {
                status: "healthy".to_string(),
                model_loaded: false,
            }
        );
    }

    #[tokio::test]
    async fn test_preflight_sends_no_authorization() {
        let server = MockServer::start().await;

        Mock::given(method("OPTIONS"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, "key");
        let status = client.preflight(GENERATE_PATH).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }
}

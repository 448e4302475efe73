//! Data models and structures
//!
//! Wire payloads exchanged with the generation backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_STEPS: u32 = 20;
pub const MAX_STEPS: u32 = 100;
pub const DEFAULT_STEPS: u32 = 60;

pub const MIN_GUIDANCE: f64 = 1.0;
pub const MAX_GUIDANCE: f64 = 20.0;
pub const GUIDANCE_STEP: f64 = 0.5;
pub const DEFAULT_GUIDANCE: f64 = 7.0;

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub num_steps: u32,
    pub guidance_scale: f64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
        }
    }
}

/// Body returned by `POST /api/generate`.
///
/// `image` is kept as a raw JSON value: the backend may omit it, send
/// `null`, or send something that is not text, and each case is reported
/// differently by the form controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GenerationResponse {
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: Some(Value::String(image.into())),
            status: Some("ok".to_string()),
        }
    }

    /// JSON type name of the `image` field, for diagnostics.
    pub fn image_kind(&self) -> &'static str {
        match &self.image {
            None => "absent",
            Some(Value::Null) => "null",
            Some(Value::Bool(_)) => "boolean",
            Some(Value::Number(_)) => "number",
            Some(Value::String(_)) => "string",
            Some(Value::Array(_)) => "array",
            Some(Value::Object(_)) => "object",
        }
    }

    pub fn image_len(&self) -> Option<usize> {
        self.image.as_ref().and_then(Value::as_str).map(str::len)
    }
}

/// Body returned by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_serializes_snake_case_fields() {
        let request = GenerationRequest {
            prompt: "a red fox".to_string(),
            num_steps: 60,
            guidance_scale: 7.5,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "a red fox",
                "num_steps": 60,
                "guidance_scale": 7.5
            })
        );
    }

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("castle");
        assert_eq!(request.num_steps, 60);
        assert_eq!(request.guidance_scale, 7.0);
    }

    #[test]
    fn test_response_tolerates_missing_and_odd_image() {
        let missing: GenerationResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(missing.image_kind(), "absent");
        assert_eq!(missing.image_len(), None);

        let numeric: GenerationResponse = serde_json::from_str(r#"{"image":42}"#).unwrap();
        assert_eq!(numeric.image_kind(), "number");
        assert!(numeric.status.is_none());

        let text: GenerationResponse =
            serde_json::from_str(r#"{"image":"abcd","status":"ok"}"#).unwrap();
        assert_eq!(text.image_kind(), "string");
        assert_eq!(text.image_len(), Some(4));
    }

    #[test]
    fn test_health_status_deserialization() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status":"healthy","model_loaded":true}"#).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded);
    }
}

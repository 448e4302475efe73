//! Generation backend integration
//!
//! [`ImageBackend`] is the seam between the form controller and the remote
//! service: [`ApiClient`] talks HTTP, [`MockBackend`] replays canned replies.

pub mod client;
pub mod mock;

pub use client::ApiClient;
pub use mock::{MockBackend, MockReply};

use crate::models::{GenerationRequest, GenerationResponse, HealthStatus};
use crate::Result;
use async_trait::async_trait;

pub const GENERATE_PATH: &str = "/api/generate";
pub const HEALTH_PATH: &str = "/api/health";

#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Single attempt, no retry. Transport failures come back unchanged.
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
    async fn check_health(&self) -> Result<HealthStatus>;
}

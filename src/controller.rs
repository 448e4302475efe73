//! Generation form controller
//!
//! Owns the form inputs and the submission phase. The phase is a single
//! tagged value, so a loading form can never also show an error, and a
//! settled form shows either an image or an error, never both.

use crate::api::ImageBackend;
use crate::models::{
    GenerationRequest, GenerationResponse, HealthStatus, DEFAULT_GUIDANCE, DEFAULT_STEPS,
    GUIDANCE_STEP, MAX_GUIDANCE, MAX_STEPS, MIN_GUIDANCE, MIN_STEPS,
};
use crate::payload::extract_image;
use crate::Result;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const TRANSPORT_FALLBACK_MESSAGE: &str = "Failed to generate image. Please try again.";
pub const RENDER_FAILURE_MESSAGE: &str =
    "Failed to display the generated image. The image data may be invalid.";

/// Editable form fields. Numeric setters behave like range sliders.
#[derive(Debug, Clone, PartialEq)]
pub struct FormInputs {
    prompt: String,
    num_steps: u32,
    guidance_scale: f64,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            num_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
        }
    }
}

impl FormInputs {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn guidance_scale(&self) -> f64 {
        self.guidance_scale
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Clamps into `[MIN_STEPS, MAX_STEPS]` and returns the stored value.
    pub fn set_num_steps(&mut self, steps: u32) -> u32 {
        self.num_steps = steps.clamp(MIN_STEPS, MAX_STEPS);
        self.num_steps
    }

    /// Clamps into `[MIN_GUIDANCE, MAX_GUIDANCE]`, snaps to the nearest
    /// `GUIDANCE_STEP`, and returns the stored value. NaN is ignored.
    pub fn set_guidance_scale(&mut self, scale: f64) -> f64 {
        if !scale.is_nan() {
            let snapped = (scale / GUIDANCE_STEP).round() * GUIDANCE_STEP;
            self.guidance_scale = snapped.clamp(MIN_GUIDANCE, MAX_GUIDANCE);
        }
        self.guidance_scale
    }

    fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            num_steps: self.num_steps,
            guidance_scale: self.guidance_scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The call succeeded but carried no usable image.
    Validation,
    /// The call itself failed.
    Transport,
    /// The image could not be displayed.
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { image: String },
    Failure { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting {
        request_id: Uuid,
    },
    Settled(Outcome),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Prompt is required")]
    EmptyPrompt,

    #[error("A generation request is already in flight")]
    InFlight,
}

pub struct FormController {
    backend: Box<dyn ImageBackend>,
    inputs: FormInputs,
    phase: Phase,
}

impl FormController {
    pub fn new(backend: Box<dyn ImageBackend>) -> Self {
        Self {
            backend,
            inputs: FormInputs::default(),
            phase: Phase::Idle,
        }
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut FormInputs {
        &mut self.inputs
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn loading(&self) -> bool {
        matches!(self.phase, Phase::Submitting { .. })
    }

    /// The submit trigger is disabled while a request is in flight.
    pub fn can_submit(&self) -> bool {
        !self.loading()
    }

    pub fn generated_image(&self) -> Option<&str> {
        match &self.phase {
            Phase::Settled(Outcome::Success { image }) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Settled(Outcome::Failure { message, .. }) => Some(message),
            _ => None,
        }
    }

    /// Enters `Submitting`, dropping any previous outcome.
    pub fn begin_submit(&mut self) -> std::result::Result<GenerationRequest, SubmitRejected> {
        self.enter_submitting().map(|(_, request)| request)
    }

    fn enter_submitting(
        &mut self,
    ) -> std::result::Result<(Uuid, GenerationRequest), SubmitRejected> {
        if self.loading() {
            return Err(SubmitRejected::InFlight);
        }
        if self.inputs.prompt.is_empty() {
            return Err(SubmitRejected::EmptyPrompt);
        }

        let request_id = Uuid::new_v4();
        self.phase = Phase::Submitting { request_id };
        Ok((request_id, self.inputs.to_request()))
    }

    /// Leaves `Submitting` with the outcome of `result`.
    ///
    /// Returns `None`, and changes nothing, when no request is in flight.
    pub fn settle(&mut self, result: Result<GenerationResponse>) -> Option<&Outcome> {
        if !self.loading() {
            warn!("Discarding generation result: no request in flight");
            return None;
        }

        self.phase = Phase::Settled(outcome_from(result));
        match &self.phase {
            Phase::Settled(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Submits the form and waits for the backend.
    pub async fn submit(&mut self) -> std::result::Result<Outcome, SubmitRejected> {
        let (request_id, request) = self.enter_submitting()?;

        let span = info_span!("submit", %request_id);
        let result = async {
            debug!(?request, "Sending request");
            self.backend.generate_image(&request).await
        }
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        let outcome = outcome_from(result);
        self.phase = Phase::Settled(outcome.clone());
        Ok(outcome)
    }

    /// Called by the display surface when a successful image cannot be shown.
    pub fn report_render_failure(&mut self) {
        if self.generated_image().is_none() {
            warn!("Render failure reported with no image on display");
            return;
        }

        error!("Image failed to load");
        self.phase = Phase::Settled(Outcome::Failure {
            kind: FailureKind::Render,
            message: RENDER_FAILURE_MESSAGE.to_string(),
        });
    }

    pub async fn check_health(&self) -> Result<HealthStatus> {
        self.backend.check_health().await
    }
}

fn outcome_from(result: Result<GenerationResponse>) -> Outcome {
    match result {
        Ok(response) => {
            debug!(
                image_type = response.image_kind(),
                image_length = ?response.image_len(),
                "Received response"
            );
            match extract_image(response.image.as_ref()) {
                Ok(image) => {
                    info!("Image data length: {}", image.len());
                    Outcome::Success {
                        image: image.to_string(),
                    }
                }
                Err(e) => {
                    error!("Unusable image payload: {}", e);
                    Outcome::Failure {
                        kind: FailureKind::Validation,
                        message: e.to_string(),
                    }
                }
            }
        }
        Err(e) => {
            error!("Generation request failed: {}", e);
            let message = e.to_string();
            Outcome::Failure {
                kind: FailureKind::Transport,
                message: if message.is_empty() {
                    TRANSPORT_FALLBACK_MESSAGE.to_string()
                } else {
                    message
                },
            }
        }
    }
}

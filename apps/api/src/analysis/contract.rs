//! Analysis Request Contract: the one protocol every AI-backed feature goes through.
//!
//! Flow per request: validate input → render prompt → call provider →
//! validate the structured answer → map to a typed result. Every failure is
//! folded into `AnalysisOutcome::Failure`; `run_analysis` never returns `Err`
//! and never panics on provider output.
//!
//! No retries here. A caller that wants one re-issues the request.

use std::time::Instant;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::data_uri::ImageDataUri;
use crate::analysis::features::{
    AlignmentReport, AnalysisData, ContentSuggestion, Feature, GarmentIdentification, OutfitItem,
    OutfitVisualization, StyleInsight, PHOTO_DATA_URI,
};
use crate::analysis::prompts::{
    render, ALIGNMENT_PROMPT_TEMPLATE, ALIGNMENT_ROLE, CONTENT_COMPASS_PROMPT_TEMPLATE,
    CONTENT_COMPASS_ROLE, GARMENT_IMAGE_PROMPT_TEMPLATE, OUTFIT_PROMPT_TEMPLATE, OUTFIT_ROLE,
    STYLE_INSIGHT_PROMPT_TEMPLATE, STYLE_INSIGHT_ROLE,
};
use crate::analysis::schema::{
    response_schema, validate_input, validate_output, AnalysisRequest, InputViolation, OutputField,
    SchemaViolation,
};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{InlineImage, LlmError, Provider, StructuredPrompt};

// ────────────────────────────────────────────────────────────────────────────
// Request lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle of one analysis request. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Validating,
    AwaitingProvider,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, AwaitingProvider)
                | (Validating, Failed)
                | (AwaitingProvider, Succeeded)
                | (AwaitingProvider, Failed)
        )
    }
}

/// Tracks one request through its states and carries its log identity.
#[derive(Debug)]
struct RequestRun {
    request_id: Uuid,
    feature: Feature,
    state: RequestState,
    history: Vec<RequestState>,
    started: Instant,
}

impl RequestRun {
    fn new(feature: Feature) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            feature,
            state: RequestState::Idle,
            history: vec![RequestState::Idle],
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: RequestState) {
        if !self.state.can_transition_to(next) {
            warn!(
                request_id = %self.request_id,
                feature = %self.feature,
                from = ?self.state,
                to = ?next,
                "Illegal analysis state transition"
            );
        }
        debug!(
            request_id = %self.request_id,
            feature = %self.feature,
            from = ?self.state,
            to = ?next,
            terminal = next.is_terminal(),
            "Analysis state change"
        );
        self.state = next;
        self.history.push(next);
    }

    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors and outcome
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InputValidation(#[from] InputViolation),

    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("{0}")]
    SchemaViolation(#[from] SchemaViolation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidInput,
    Provider,
    SchemaViolation,
}

/// Discriminated result handed to the UI layer.
///
/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`. `kind` stays server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success(AnalysisData),
    Failure { kind: FailureKind, error: String },
}

impl AnalysisOutcome {
    /// Failure for a request body that could not be read as string fields.
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        AnalysisOutcome::Failure {
            kind: FailureKind::InvalidInput,
            error: reason.into(),
        }
    }

    fn from_error(feature: Feature, err: &AnalysisError) -> Self {
        match err {
            AnalysisError::InputValidation(violation) => AnalysisOutcome::Failure {
                kind: FailureKind::InvalidInput,
                error: violation.to_string(),
            },
            AnalysisError::Provider(_) => AnalysisOutcome::Failure {
                kind: FailureKind::Provider,
                error: feature.failure_message().to_string(),
            },
            AnalysisError::SchemaViolation(_) => AnalysisOutcome::Failure {
                kind: FailureKind::SchemaViolation,
                error: feature.failure_message().to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    #[cfg(test)]
    pub fn data(&self) -> Option<&AnalysisData> {
        match self {
            AnalysisOutcome::Success(data) => Some(data),
            AnalysisOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Success(_) => None,
            AnalysisOutcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            AnalysisOutcome::Success(_) => None,
            AnalysisOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl Serialize for AnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            AnalysisOutcome::Success(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            AnalysisOutcome::Failure { error, .. } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Runs one analysis end to end. Input validation happens before any
/// provider call; provider and schema failures are reported with the
/// feature's generic message and logged with full detail.
pub async fn run_analysis(
    provider: &dyn Provider,
    feature: Feature,
    input: &AnalysisRequest,
) -> AnalysisOutcome {
    let mut run = RequestRun::new(feature);

    match execute(provider, feature, input, &mut run).await {
        Ok(data) => {
            run.advance(RequestState::Succeeded);
            info!(
                request_id = %run.request_id,
                feature = %feature,
                elapsed_ms = run.elapsed_ms() as u64,
                "Analysis succeeded"
            );
            AnalysisOutcome::Success(data)
        }
        Err(err) => {
            run.advance(RequestState::Failed);
            match &err {
                AnalysisError::InputValidation(_) => info!(
                    request_id = %run.request_id,
                    feature = %feature,
                    error = %err,
                    "Analysis rejected before dispatch"
                ),
                _ => warn!(
                    request_id = %run.request_id,
                    feature = %feature,
                    elapsed_ms = run.elapsed_ms() as u64,
                    error = %err,
                    "Analysis failed"
                ),
            }
            AnalysisOutcome::from_error(feature, &err)
        }
    }
}

async fn execute(
    provider: &dyn Provider,
    feature: Feature,
    input: &AnalysisRequest,
    run: &mut RequestRun,
) -> Result<AnalysisData, AnalysisError> {
    run.advance(RequestState::Validating);
    let upload = validate_input(input, feature.input_fields())?;

    run.advance(RequestState::AwaitingProvider);
    let data = match feature {
        Feature::StyleInsight => {
            let insight: StyleInsight = call_structured(
                provider,
                STYLE_INSIGHT_ROLE,
                STYLE_INSIGHT_PROMPT_TEMPLATE,
                Some(photo(upload)?),
                feature.output_fields(),
            )
            .await?;
            AnalysisData::StyleInsight(insight)
        }
        Feature::IdentityAlignment => {
            let prompt = render_fields(ALIGNMENT_PROMPT_TEMPLATE, feature, input);
            let report: AlignmentReport = call_structured(
                provider,
                ALIGNMENT_ROLE,
                &prompt,
                None,
                feature.output_fields(),
            )
            .await?;
            AnalysisData::Alignment(report)
        }
        Feature::ContentCompass => {
            let prompt = render_fields(CONTENT_COMPASS_PROMPT_TEMPLATE, feature, input);
            let suggestion: ContentSuggestion = call_structured(
                provider,
                CONTENT_COMPASS_ROLE,
                &prompt,
                None,
                feature.output_fields(),
            )
            .await?;
            AnalysisData::ContentCompass(suggestion)
        }
        Feature::OutfitVisualizer => {
            AnalysisData::Outfit(visualize_outfit(provider, photo(upload)?).await?)
        }
    };

    Ok(data)
}

/// Substitutes the feature's validated input fields into `template`.
fn render_fields(template: &str, feature: Feature, input: &AnalysisRequest) -> String {
    let values: Vec<(&str, &str)> = feature
        .input_fields()
        .iter()
        .filter_map(|f| input.get(f.name).map(|v| (f.name, v.trim())))
        .collect();
    render(template, &values)
}

/// The upload already checked by `validate_input`.
fn photo(upload: Option<ImageDataUri<'_>>) -> Result<InlineImage<'_>, AnalysisError> {
    let uri = upload.ok_or_else(|| InputViolation::new(PHOTO_DATA_URI, "is required"))?;
    debug!(mime_type = uri.mime_type, bytes = uri.decoded_len, "Attaching photo");
    Ok(InlineImage {
        mime_type: uri.mime_type,
        data: uri.payload,
    })
}

/// One structured provider call: send the prompt with a response schema,
/// then validate the answer structurally before deserializing it.
async fn call_structured<T: DeserializeOwned>(
    provider: &dyn Provider,
    role: &str,
    prompt: &str,
    image: Option<InlineImage<'_>>,
    fields: &[OutputField],
) -> Result<T, AnalysisError> {
    let system = json_system(role);
    let schema = response_schema(fields);

    let value = provider
        .generate_json(StructuredPrompt {
            system: &system,
            prompt,
            image,
            response_schema: &schema,
        })
        .await?;

    validate_output(&value, fields)?;

    serde_json::from_value(value)
        .map_err(|e| AnalysisError::SchemaViolation(SchemaViolation::new("$", e.to_string())))
}

/// Identifies garments, then renders one image per garment concurrently.
///
/// A failed image call leaves that item's `image_url` empty and does not
/// affect its siblings or the overall result.
async fn visualize_outfit(
    provider: &dyn Provider,
    image: InlineImage<'_>,
) -> Result<OutfitVisualization, AnalysisError> {
    let identification: GarmentIdentification = call_structured(
        provider,
        OUTFIT_ROLE,
        OUTFIT_PROMPT_TEMPLATE,
        Some(image),
        Feature::OutfitVisualizer.output_fields(),
    )
    .await?;

    debug!(
        garments = identification.identified_items.len(),
        "Garments identified, rendering images"
    );

    let renders = identification
        .identified_items
        .iter()
        .map(|item| render_garment(provider, &item.label));
    let image_urls = join_all(renders).await;

    let identified_items = identification
        .identified_items
        .into_iter()
        .zip(image_urls)
        .map(|(item, image_url)| OutfitItem {
            label: item.label,
            image_url,
        })
        .collect();

    Ok(OutfitVisualization {
        identified_items,
        overall_style_description: identification.overall_style_description,
    })
}

async fn render_garment(provider: &dyn Provider, label: &str) -> String {
    let prompt = render(GARMENT_IMAGE_PROMPT_TEMPLATE, &[("label", label)]);
    match provider.generate_image(&prompt).await {
        Ok(url) => url,
        Err(e) => {
            warn!(label, error = %e, "Garment image generation failed, leaving imageUrl empty");
            String::new()
        }
    }
}

/// LLM Client: the single point of entry for all generation-provider calls in Moodframe.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All provider interactions MUST go through the `Provider` trait defined here.
///
/// Models are hardcoded. Do not make configurable to prevent drift.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// Model used for every structured (JSON) call.
pub const TEXT_MODEL: &str = "gemini-2.0-flash";
/// Model used for per-garment image generation.
pub const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Finish reasons that mean the provider refused to answer.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
    "RECITATION",
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response blocked by provider: {0}")]
    Blocked(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider returned empty content")]
    EmptyContent,
}

/// An image attached to a structured prompt. `data` is the raw base64 payload.
#[derive(Debug, Clone, Copy)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

/// One structured-output call: instructions, prompt, optional image and the
/// schema the provider is asked to honor.
#[derive(Debug, Clone, Copy)]
pub struct StructuredPrompt<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub image: Option<InlineImage<'a>>,
    pub response_schema: &'a Value,
}

/// The provider seam. `GeminiClient` is the production implementation;
/// tests substitute in-memory fakes.
///
/// Carried in `AppState` as `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider's JSON answer. The value is untrusted: callers
    /// must validate it against their own output schema.
    async fn generate_json(&self, request: StructuredPrompt<'_>) -> Result<Value, LlmError>;

    /// Generates one image and returns it as a `data:` URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Gemini generateContent)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent<'a>>,
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: RequestInlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'a str>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Extracts the text content from the first text part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.parts().find_map(|p| p.text.as_deref())
    }

    /// Extracts the first inline image of the first candidate.
    pub fn image(&self) -> Option<&ResponseInlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }

    /// Returns the block reason if the provider refused the prompt or the answer.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ────────────────────────────────────────────────────────────────────────────

/// The single provider client used by all features in Moodframe.
/// Wraps the Gemini `generateContent` API with structured-output and image helpers.
///
/// No retries: a failed call surfaces as an `LlmError` and the caller decides.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: std::time::Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Makes a raw `generateContent` call, returning the full response object.
    async fn call(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "Provider returned an error status");
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                model,
                prompt_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Provider call succeeded"
            );
        }

        if let Some(reason) = parsed.block_reason() {
            return Err(LlmError::Blocked(reason));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl Provider for GeminiClient {
    async fn generate_json(&self, request: StructuredPrompt<'_>) -> Result<Value, LlmError> {
        let mut parts = vec![RequestPart::Text {
            text: request.prompt,
        }];
        if let Some(image) = request.image {
            parts.push(RequestPart::Inline {
                inline_data: RequestInlineData {
                    mime_type: image.mime_type,
                    data: image.data,
                },
            });
        }

        let body = GenerateContentRequest {
            system_instruction: Some(RequestContent {
                role: None,
                parts: vec![RequestPart::Text {
                    text: request.system,
                }],
            }),
            contents: vec![RequestContent {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(request.response_schema),
                response_modalities: None,
            },
        };

        let response = self.call(TEXT_MODEL, &body).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            system_instruction: None,
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart::Text { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["TEXT", "IMAGE"]),
                ..Default::default()
            },
        };

        let response = self.call(IMAGE_MODEL, &body).await?;
        let image = response.image().ok_or(LlmError::EmptyContent)?;

        Ok(format!("data:{};base64,{}", image.mime_type, image.data))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_structured_request_serializes_gemini_shape() {
        let schema = json!({"type": "OBJECT"});
        let body = GenerateContentRequest {
            system_instruction: Some(RequestContent {
                role: None,
                parts: vec![RequestPart::Text { text: "sys" }],
            }),
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![
                    RequestPart::Text { text: "hello" },
                    RequestPart::Inline {
                        inline_data: RequestInlineData {
                            mime_type: "image/png",
                            data: "AAAA",
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(&schema),
                response_modalities: None,
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            value["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(value["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn test_response_text_and_image_extraction() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 34}
        }))
        .unwrap();

        assert_eq!(response.text(), Some("here you go"));
        assert_eq!(response.image().unwrap().mime_type, "image/png");
        assert!(response.block_reason().is_none());
    }

    #[test]
    fn test_block_reason_from_prompt_feedback() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(response.block_reason().as_deref(), Some("SAFETY"));
        assert!(response.text().is_none());
    }

    #[test]
    fn test_block_reason_from_safety_finish() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "IMAGE_SAFETY"}]
        }))
        .unwrap();
        assert_eq!(response.block_reason().as_deref(), Some("IMAGE_SAFETY"));
    }

    #[test]
    fn test_normal_finish_is_not_blocked() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS", "content": {"parts": []}}]
        }))
        .unwrap();
        assert!(response.block_reason().is_none());
        assert!(response.image().is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash_from_base_url() {
        let client = GeminiClient::new(
            "key".to_string(),
            "http://localhost:9999/v1beta/".to_string(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1beta");
    }
}

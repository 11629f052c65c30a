//! Gemini Bridge: grounded text completion over the Gemini `generateContent` REST API.
//!
//! One request per query: the query as a single user turn, the fixed dashboard system
//! instruction, and the Google Search tool. No retry, no streaming. reqwest only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

pub const DASHBOARD_SYSTEM_INSTRUCTION: &str = "You are a helpful personal assistant integrated into a dashboard. \
Provide concise, accurate answers. If the user asks for a quick fact, give it directly. \
If the user asks a complex question, summarize the answer found from the search tools.";

/// What the search flow hands to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedQuery {
    pub query: String,
    pub system_instruction: String,
    /// Enable the provider's web-search grounding tool.
    pub grounded: bool,
}

impl GroundedQuery {
    pub fn dashboard(query: &str) -> Self {
        Self {
            query: query.to_string(),
            system_instruction: DASHBOARD_SYSTEM_INSTRUCTION.to_string(),
            grounded: true,
        }
    }
}

/// A web citation attached to a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Provider-supplied title, if any.
    pub title: Option<String>,
    pub uri: String,
}

/// Raw provider answer; the search flow applies the display fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundedAnswer {
    /// Generated text; `None` when the provider returned no text parts.
    pub text: Option<String>,
    pub citations: Vec<Citation>,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Gemini request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gemini {0}: {1}")]
    Status(u16, String),
    #[error("Gemini response parse: {0}")]
    Parse(String),
}

/// The external text-completion-with-web-grounding capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn ground(&self, request: &GroundedQuery) -> Result<GroundedAnswer, BridgeError>;
}

// generateContent request/response (camelCase on the wire)

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn build_request(request: &GroundedQuery) -> GenerateContentRequest {
    let tools = if request.grounded {
        vec![Tool {
            google_search: serde_json::Map::new(),
        }]
    } else {
        Vec::new()
    };
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: request.query.clone(),
            }],
        }],
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system_instruction.clone(),
            }],
        },
        tools,
    }
}

/// First candidate's text parts (thoughts excluded) and its web citations, in order.
fn answer_from_response(parsed: GenerateContentResponse) -> GroundedAnswer {
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return GroundedAnswer::default();
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| p.text)
        .collect();

    let citations = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            let uri = web.uri.filter(|u| !u.trim().is_empty())?;
            Some(Citation {
                title: web.title.filter(|t| !t.trim().is_empty()),
                uri,
            })
        })
        .collect();

    GroundedAnswer {
        text: Some(text).filter(|t| !t.is_empty()),
        citations,
    }
}

/// Gemini-backed [`SearchProvider`].
pub struct GeminiBridge {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiBridge {
    /// Create a bridge with an explicit API key and no transport timeout.
    pub fn new(api_key: String) -> Self {
        Self::with_timeout(api_key, None)
    }

    pub fn with_timeout(api_key: String, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, ?timeout, "search client build failed; using client without timeout");
            reqwest::Client::new()
        });
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            client,
        }
    }

    /// Set the model (e.g. `gemini-2.5-flash`, `gemini-2.5-pro`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point the bridge at another API base (proxies, tests).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl SearchProvider for GeminiBridge {
    async fn ground(&self, request: &GroundedQuery) -> Result<GroundedAnswer, BridgeError> {
        let body = build_request(request);
        tracing::debug!(model = %self.model, grounded = request.grounded, "Gemini request");

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(BridgeError::Status(status.as_u16(), text));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| BridgeError::Parse(e.to_string()))?;
        Ok(answer_from_response(parsed))
    }
}

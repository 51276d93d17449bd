//! Grader abstraction and the HTTP client for real AI graders.
//!
//! A `Grader` is one independent model invocation producing raw text for a
//! single question. The pipeline only depends on the trait; tests and
//! embedders substitute their own implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GradingConfig;

/// Error from a single grader invocation.
///
/// Captured per-grader by the dispatcher; never aborts sibling calls.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("grader returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("grader returned an empty response")]
    EmptyResponse,
}

/// One rendered page of visual evidence, opaque to this crate.
///
/// The document-rendering collaborator supplies pages pre-encoded; they are
/// passed through to graders unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePage {
    /// MIME type of the rendered page (e.g. `image/png`).
    pub mime_type: String,
    /// Base64-encoded page bytes.
    pub data: String,
}

/// The identical input sent to every grader in the panel.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// Fully built grading prompt (rubric, question, output contract).
    pub prompt: String,
    /// Rendered pages of the student's answer sheet.
    pub evidence: Vec<EvidencePage>,
}

/// One independent AI grader.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Invoke the grader with a prompt and visual evidence, returning the
    /// raw response text.
    async fn grade(&self, request: &GradingRequest) -> Result<String, GraderError>;
}

/// Grader backed by a Gemini-style `generateContent` endpoint.
#[derive(Clone)]
pub struct HttpGrader {
    http: reqwest::Client,
    endpoint_url: String,
    api_key: String,
    model_name: String,
}

impl HttpGrader {
    /// Build a grader from pipeline configuration.
    pub fn from_config(config: &GradingConfig) -> Result<Self, GraderError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.grader_timeout_secs))
            .build()
            .map_err(|e| GraderError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint_url: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
        })
    }
}

#[async_trait]
impl Grader for HttpGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<String, GraderError> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Part {
            Text {
                text: String,
            },
            Inline {
                inline_data: InlineData,
            },
        }

        #[derive(Serialize)]
        struct InlineData {
            mime_type: String,
            data: String,
        }

        #[derive(Serialize)]
        struct Content {
            parts: Vec<Part>,
        }

        #[derive(Serialize)]
        struct GenerateRequest {
            contents: Vec<Content>,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<ResponseContent>,
        }

        #[derive(Deserialize)]
        struct ResponseContent {
            parts: Option<Vec<ResponsePart>>,
        }

        #[derive(Deserialize)]
        struct ResponsePart {
            text: Option<String>,
        }

        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        for page in &request.evidence {
            parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: page.mime_type.clone(),
                    data: page.data.clone(),
                },
            });
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint_url.trim_end_matches('/'),
            self.model_name
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest {
                contents: vec![Content { parts }],
            })
            .send()
            .await
            .map_err(|e| GraderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GraderError::Api { status, body });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GraderError::Http(e.to_string()))?;

        // Concatenate all text parts of the first candidate. An empty
        // candidate list or empty parts counts as a failed invocation.
        let text: String = generated
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GraderError::EmptyResponse);
        }

        debug!(model = %self.model_name, bytes = text.len(), "grader response received");
        Ok(text)
    }
}

//! Title generation through a language-model completion endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{TitleConfig, TitleProvider};

const USER_AGENT: &str = concat!("taglift/", env!("CARGO_PKG_VERSION"));
const LANGUAGE_PLACEHOLDER: &str = "{{LANGUAGE}}";

/// Errors raised by the title generator.
#[derive(Debug, Error)]
pub enum TitleError {
    #[error("missing title.api_key configuration value")]
    MissingApiKey,
    #[error("invalid title base URL `{0}`")]
    InvalidBaseUrl(String),
    #[error("failed to read prompt template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request error during `{stage}`: {source}")]
    Request {
        stage: &'static str,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("unexpected HTTP status {status} during `{stage}`")]
    HttpStatus { stage: &'static str, status: u16 },
    #[error("failed to read HTTP body during `{stage}`: {source}")]
    Body {
        stage: &'static str,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("JSON decode error during `{stage}`: {source}")]
    Json {
        stage: &'static str,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("model response contained no text output")]
    EmptyCompletion,
}

impl TitleError {
    fn request(stage: &'static str, error: reqwest::Error) -> Self {
        Self::Request {
            stage,
            source: Arc::new(error),
        }
    }

    fn body(stage: &'static str, error: reqwest::Error) -> Self {
        Self::Body {
            stage,
            source: Arc::new(error),
        }
    }

    fn json(stage: &'static str, error: serde_json::Error) -> Self {
        Self::Json {
            stage,
            source: Arc::new(error),
        }
    }
}

/// Load the provider's instruction template and substitute the configured
/// output language for the `{{LANGUAGE}}` placeholder.
pub fn load_instructions(
    dir: &Path,
    provider: TitleProvider,
    language: &str,
) -> Result<String, TitleError> {
    let path = dir.join(provider.template_file());
    let raw = std::fs::read_to_string(&path).map_err(|source| TitleError::Template {
        path: path.clone(),
        source,
    })?;
    Ok(raw.replace(LANGUAGE_PLACEHOLDER, language))
}

pub struct TitleGenerator {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    provider: TitleProvider,
    instructions: String,
    backoff: ExponentialBuilder,
}

impl TitleGenerator {
    pub fn from_config(cfg: &TitleConfig) -> Result<Self, TitleError> {
        let api_key = cfg.api_key.clone().ok_or(TitleError::MissingApiKey)?;
        let instructions = load_instructions(&cfg.prompt_dir, cfg.provider, &cfg.language)?;

        let base = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| cfg.provider.default_base_url().to_string());
        let path = match cfg.provider {
            TitleProvider::OpenAi => "v1/responses",
            TitleProvider::Mistral => "v1/chat/completions",
        };
        let endpoint = Url::parse(&base)
            .and_then(|parsed| parsed.join(path))
            .map_err(|_| TitleError::InvalidBaseUrl(base.clone()))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| TitleError::request("build_client", err))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(3)
            .with_jitter();

        Ok(Self {
            http,
            endpoint,
            api_key,
            model: cfg.model.clone(),
            provider: cfg.provider,
            instructions,
            backoff,
        })
    }

    /// Ask the model for a title for `text`.
    ///
    /// Callers are responsible for never passing empty or whitespace-only
    /// text; the input is forwarded to the model as-is.
    pub async fn generate_title(&self, text: &str) -> Result<String, TitleError> {
        let attempt = || async { self.complete(text).await };
        let title = attempt
            .retry(self.backoff.clone())
            .when(|err| matches!(err, TitleError::Request { .. }))
            .await?;

        debug!(model = %self.model, chars = title.len(), "model returned a title");
        Ok(title)
    }

    async fn complete(&self, text: &str) -> Result<String, TitleError> {
        match self.provider {
            TitleProvider::OpenAi => self.complete_openai(text).await,
            TitleProvider::Mistral => self.complete_mistral(text).await,
        }
    }

    async fn complete_openai(&self, text: &str) -> Result<String, TitleError> {
        let stage = "openai_responses";
        let request = ResponsesRequest {
            model: &self.model,
            instructions: &self.instructions,
            input: text,
        };

        let payload: ResponsesPayload = self.post_json(stage, &request).await?;
        let title = collect_output_text(&payload);
        if title.is_empty() {
            return Err(TitleError::EmptyCompletion);
        }
        Ok(title)
    }

    async fn complete_mistral(&self, text: &str) -> Result<String, TitleError> {
        let stage = "mistral_chat";
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let payload: ChatPayload = self.post_json(stage, &request).await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(TitleError::EmptyCompletion)
    }

    async fn post_json<R, P>(&self, stage: &'static str, request: &R) -> Result<P, TitleError>
    where
        R: Serialize,
        P: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| TitleError::request(stage, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TitleError::HttpStatus {
                stage,
                status: status.as_u16(),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|err| TitleError::body(stage, err))?;
        serde_json::from_slice(&payload).map_err(|err| TitleError::json(stage, err))
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ResponsesPayload {
    #[serde(default)]
    output: Vec<ResponsesOutput>,
}

#[derive(Deserialize)]
struct ResponsesOutput {
    #[serde(default)]
    content: Vec<ResponsesContent>,
}

#[derive(Deserialize)]
struct ResponsesContent {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn collect_output_text(payload: &ResponsesPayload) -> String {
    payload
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter(|part| part.kind == "output_text")
        .map(|part| part.text.as_str())
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatPayload {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn template_substitutes_language_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("title_openai.txt"),
            "Write the title in {{LANGUAGE}}.",
        )
        .expect("write template");

        let instructions = load_instructions(dir.path(), TitleProvider::OpenAi, "German")
            .expect("load instructions");
        assert_eq!(instructions, "Write the title in German.");
    }

    #[test]
    fn missing_template_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_instructions(dir.path(), TitleProvider::Mistral, "English")
            .expect_err("template should be missing");
        match err {
            TitleError::Template { path, .. } => {
                assert!(path.ends_with("title_mistral.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn responses_payload_collects_output_text_parts() {
        let payload: ResponsesPayload = serde_json::from_str(
            r#"{
                "output": [
                    { "content": [
                        { "type": "reasoning", "text": "thinking" },
                        { "type": "output_text", "text": "Invoice " },
                        { "type": "output_text", "text": "March" }
                    ]}
                ]
            }"#,
        )
        .expect("parse payload");
        assert_eq!(collect_output_text(&payload), "Invoice March");
    }

    #[test]
    fn chat_payload_takes_first_choice() {
        let payload: ChatPayload = serde_json::from_str(
            r#"{ "choices": [ { "message": { "content": "Lease agreement" } } ] }"#,
        )
        .expect("parse payload");
        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content);
        assert_eq!(content.as_deref(), Some("Lease agreement"));
    }
}

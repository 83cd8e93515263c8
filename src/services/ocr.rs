//! OCR extraction through the Mistral OCR REST endpoint.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::OcrConfig;
use crate::text::strip_markdown_images;

const USER_AGENT: &str = concat!("taglift/", env!("CARGO_PKG_VERSION"));
const OCR_ENDPOINT: &str = "v1/ocr";

/// Errors raised by the OCR extractor.
#[derive(Debug, Error, Clone)]
pub enum OcrError {
    #[error("missing ocr.api_key configuration value")]
    MissingApiKey,
    #[error("invalid OCR base URL `{0}`")]
    InvalidBaseUrl(String),
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
}

impl OcrError {
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

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
}

#[derive(Serialize)]
struct OcrDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    markdown: String,
}

#[derive(Debug, Clone)]
pub struct MistralOcr {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    backoff: ExponentialBuilder,
}

impl MistralOcr {
    pub fn from_config(cfg: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = cfg.api_key.clone().ok_or(OcrError::MissingApiKey)?;

        let endpoint = Url::parse(&cfg.base_url)
            .and_then(|base| base.join(OCR_ENDPOINT))
            .map_err(|_| OcrError::InvalidBaseUrl(cfg.base_url.clone()))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| OcrError::request("build_client", err))?;

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
            backoff,
        })
    }

    /// Run the document bytes through the OCR backend as a single
    /// multi-page job and return the reassembled text.
    ///
    /// Pages are joined by newlines in page order, markdown image
    /// references are stripped, and the result is trimmed. Empty input or
    /// an empty OCR result yields an empty string.
    pub async fn extract_text(&self, document: &[u8]) -> Result<String, OcrError> {
        let encoded = BASE64_STANDARD.encode(document);
        let request = OcrRequest {
            model: &self.model,
            document: OcrDocument {
                kind: "document_url",
                document_url: format!("data:application/pdf;base64,{encoded}"),
            },
        };

        let attempt = || async { self.submit(&request).await };
        let response = attempt
            .retry(self.backoff.clone())
            .when(|err| matches!(err, OcrError::Request { .. }))
            .await?;

        let mut pages = response.pages;
        pages.sort_by_key(|page| page.index);
        debug!(pages = pages.len(), model = %self.model, "OCR job completed");

        let joined = pages
            .iter()
            .map(|page| page.markdown.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(strip_markdown_images(&joined))
    }

    async fn submit(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let stage = "ocr_process";

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| OcrError::request(stage, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::HttpStatus {
                stage,
                status: status.as_u16(),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|err| OcrError::body(stage, err))?;
        serde_json::from_slice(&payload).map_err(|err| OcrError::json(stage, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_join_in_page_order() {
        let mut pages = vec![
            OcrPage {
                index: 1,
                markdown: "second".to_string(),
            },
            OcrPage {
                index: 0,
                markdown: "first".to_string(),
            },
        ];
        pages.sort_by_key(|page| page.index);
        let joined = pages
            .iter()
            .map(|page| page.markdown.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, "first\nsecond");
    }

    #[test]
    fn request_body_declares_pdf_data_url() {
        let request = OcrRequest {
            model: "mistral-ocr-latest",
            document: OcrDocument {
                kind: "document_url",
                document_url: format!(
                    "data:application/pdf;base64,{}",
                    BASE64_STANDARD.encode(b"%PDF-1.4")
                ),
            },
        };
        let body = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(body["model"], "mistral-ocr-latest");
        assert_eq!(body["document"]["type"], "document_url");
        let url = body["document"]["document_url"].as_str().expect("url");
        assert!(url.starts_with("data:application/pdf;base64,"));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let cfg = OcrConfig {
            base_url: "https://api.mistral.ai".to_string(),
            api_key: None,
            model: "mistral-ocr-latest".to_string(),
        };
        assert!(matches!(
            MistralOcr::from_config(&cfg),
            Err(OcrError::MissingApiKey)
        ));
    }
}

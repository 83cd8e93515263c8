//! REST client for the Paperless-ngx document store.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PaperlessConfig;

const USER_AGENT: &str = concat!("taglift/", env!("CARGO_PKG_VERSION"));

/// Transient snapshot of a stored document. The store owns the data; this
/// copy may be stale the moment it is fetched and is never cached.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<u64>,
}

/// Sparse partial update. `None` fields are omitted from the request body
/// and left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct DocumentPage {
    #[serde(default)]
    results: Vec<DocumentRef>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    id: u64,
}

/// Errors raised by the store client.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("missing paperless.api_key configuration value")]
    MissingApiKey,
    #[error("invalid paperless base URL `{0}`")]
    InvalidBaseUrl(String),
    #[error("paperless API key is not a valid header value")]
    InvalidToken,
    #[error("failed to join `{path}` onto base URL: {source}")]
    UrlJoin {
        path: String,
        #[source]
        source: Arc<url::ParseError>,
    },
    #[error("invalid pagination link `{url}`")]
    InvalidNextLink { url: String },
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

impl StoreError {
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

#[derive(Debug, Clone)]
pub struct PaperlessClient {
    http: Client,
    base_url: Url,
}

impl PaperlessClient {
    pub fn from_config(cfg: &PaperlessConfig) -> Result<Self, StoreError> {
        let token = cfg.api_key.as_deref().ok_or(StoreError::MissingApiKey)?;
        Self::new(&cfg.base_url, token)
    }

    pub fn new(base_url: &str, token: &str) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|_| StoreError::InvalidBaseUrl(base_url.to_string()))?;

        let mut auth = header::HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|_| StoreError::InvalidToken)?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|err| StoreError::request("build_client", err))?;

        Ok(Self { http, base_url })
    }

    fn join(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url.join(path).map_err(|err| StoreError::UrlJoin {
            path: path.to_string(),
            source: Arc::new(err),
        })
    }

    /// Collect the ids of all documents carrying `tag_id`, following the
    /// store's pagination links until exhausted, in server-provided order.
    ///
    /// A 404 on the filtered query means nothing is tagged and yields an
    /// empty list; any other non-2xx status is an error.
    pub async fn find_documents_with_tag(&self, tag_id: u64) -> Result<Vec<u64>, StoreError> {
        let stage = "find_documents";
        let mut url = self.join("api/documents/")?;
        url.set_query(Some(&format!(
            "is_tagged=true&tags__id__all={tag_id}&fields=id"
        )));

        let mut ids = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|err| StoreError::request(stage, err))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                info!(tag_id, "no documents found for the requested tag");
                return Ok(Vec::new());
            }
            if !status.is_success() {
                warn!(
                    tag_id,
                    status = status.as_u16(),
                    "document query returned an error status"
                );
                return Err(StoreError::HttpStatus {
                    stage,
                    status: status.as_u16(),
                });
            }

            let payload = response
                .bytes()
                .await
                .map_err(|err| StoreError::body(stage, err))?;
            let page: DocumentPage =
                serde_json::from_slice(&payload).map_err(|err| StoreError::json(stage, err))?;

            ids.extend(page.results.into_iter().map(|doc| doc.id));
            debug!(tag_id, collected = ids.len(), "collected document page");

            next = match page.next {
                Some(link) => Some(
                    Url::parse(&link).map_err(|_| StoreError::InvalidNextLink { url: link })?,
                ),
                None => None,
            };
        }

        Ok(ids)
    }

    /// Fetch full document metadata (title, content, tags) by id.
    pub async fn fetch_document(&self, id: u64) -> Result<Document, StoreError> {
        let stage = "fetch_document";
        let url = self.join(&format!("api/documents/{id}/"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| StoreError::request(stage, err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                doc_id = id,
                status = status.as_u16(),
                "failed to read document details"
            );
            return Err(StoreError::HttpStatus {
                stage,
                status: status.as_u16(),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|err| StoreError::body(stage, err))?;
        serde_json::from_slice(&payload).map_err(|err| StoreError::json(stage, err))
    }

    /// Download the original binary content of a document.
    pub async fn download_document(&self, id: u64) -> Result<Bytes, StoreError> {
        let stage = "download_document";
        let url = self.join(&format!("api/documents/{id}/download/"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| StoreError::request(stage, err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                doc_id = id,
                status = status.as_u16(),
                "failed to download document content"
            );
            return Err(StoreError::HttpStatus {
                stage,
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|err| StoreError::body(stage, err))
    }

    /// Apply a sparse update to a document. Content, title, and tags travel
    /// in one request; the store applies them atomically or not at all.
    pub async fn patch_document(&self, id: u64, patch: &DocumentPatch) -> Result<(), StoreError> {
        let stage = "patch_document";
        let url = self.join(&format!("api/documents/{id}/"))?;

        let response = self
            .http
            .patch(url)
            .json(patch)
            .send()
            .await
            .map_err(|err| StoreError::request(stage, err))?;

        let status = response.status();
        if status.is_success() {
            info!(doc_id = id, "document updated successfully");
            Ok(())
        } else {
            warn!(
                doc_id = id,
                status = status.as_u16(),
                "error updating the document"
            );
            Err(StoreError::HttpStatus {
                stage,
                status: status.as_u16(),
            })
        }
    }
}

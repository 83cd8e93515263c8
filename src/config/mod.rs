//! Configuration loading for the enrichment workflows.
//!
//! Settings come from defaults, an optional `config/settings.*` file, and
//! environment variables prefixed with `TAGLIFT` (e.g.
//! `TAGLIFT__PAPERLESS__API_KEY`). The loaded [`AppConfig`] is constructed
//! once at startup and passed by reference into each service constructor;
//! no component reads the environment on its own.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "config/settings";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub paperless: PaperlessConfig,
    pub ocr: OcrConfig,
    pub title: TitleConfig,
}

/// Connection settings for the document store.
#[derive(Debug, Deserialize, Clone)]
pub struct PaperlessConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Tag marking documents that still need OCR. Absent disables the pass.
    pub ocr_tag_id: Option<String>,
    /// Tag marking documents that still need a title. Absent disables the pass.
    pub title_tag_id: Option<String>,
}

/// OCR backend settings.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Language-model backend settings for title generation.
#[derive(Debug, Deserialize, Clone)]
pub struct TitleConfig {
    pub provider: TitleProvider,
    /// Override for the provider's API root; defaults per provider.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    /// Language the generated titles should be written in.
    pub language: String,
    /// Directory holding the instruction templates.
    pub prompt_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TitleProvider {
    OpenAi,
    Mistral,
}

impl TitleProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Mistral => "https://api.mistral.ai",
        }
    }

    pub fn template_file(self) -> &'static str {
        match self {
            Self::OpenAi => "title_openai.txt",
            Self::Mistral => "title_mistral.txt",
        }
    }
}

pub fn load() -> Result<AppConfig, AppConfigError> {
    let builder = Config::builder()
        .set_default("paperless.base_url", "http://localhost:8000")?
        .set_default("ocr.base_url", "https://api.mistral.ai")?
        .set_default("ocr.model", "mistral-ocr-latest")?
        .set_default("title.provider", "openai")?
        .set_default("title.model", "gpt-4o-mini")?
        .set_default("title.language", "English")?
        .set_default("title.prompt_dir", "prompts")?
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("TAGLIFT").separator("__"));

    let cfg = builder.build()?.try_deserialize()?;
    Ok(cfg)
}

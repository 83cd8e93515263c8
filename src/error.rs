//! Application-level error type shared across the CLI entry points.

use thiserror::Error;

use crate::config::AppConfigError;
use crate::services::{OcrError, ProcessError, StoreError, TitleError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] AppConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Title(#[from] TitleError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

//! Tag-driven batch passes over the document store.

use std::future::Future;

use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::ocr::MistralOcr;
use crate::services::processor::{ocr_document, titelize_document, ProcessError};
use crate::services::store::PaperlessClient;
use crate::services::title::TitleGenerator;

/// Which enrichment pass a batch run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Ocr,
    Title,
}

impl Workflow {
    fn describe(self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Title => "title",
        }
    }
}

/// Run the OCR pass to completion, then the title pass. Strictly
/// sequential: the title pass does not start until the OCR pass is done.
pub async fn run_batch(config: &AppConfig) -> Result<(), AppError> {
    let store = PaperlessClient::from_config(&config.paperless)?;

    info!("begin OCRing documents");
    if let Some(tag) = resolve_tag(config.paperless.ocr_tag_id.as_deref(), Workflow::Ocr) {
        let ocr = MistralOcr::from_config(&config.ocr)?;
        let ocr = &ocr;
        let store_ref = &store;
        run_for_tag(store_ref, tag, Workflow::Ocr, |id| {
            ocr_document(store_ref, ocr, id, Some(tag))
        })
        .await?;
    }

    info!("begin titelizing documents");
    if let Some(tag) = resolve_tag(config.paperless.title_tag_id.as_deref(), Workflow::Title) {
        let titles = TitleGenerator::from_config(&config.title)?;
        let titles = &titles;
        let store_ref = &store;
        run_for_tag(store_ref, tag, Workflow::Title, |id| {
            titelize_document(store_ref, titles, id, Some(tag))
        })
        .await?;
    }

    Ok(())
}

/// Parse the configured tag value for a workflow.
///
/// An absent value means the workflow is disabled; a non-integer value is a
/// configuration error. Neither aborts the sibling workflow.
fn resolve_tag(value: Option<&str>, workflow: Workflow) -> Option<u64> {
    let raw = match value {
        Some(raw) => raw,
        None => {
            info!(
                workflow = workflow.describe(),
                "no tag specified in the configuration; workflow disabled"
            );
            return None;
        }
    };

    match raw.trim().parse::<u64>() {
        Ok(tag) => Some(tag),
        Err(_) => {
            warn!(
                workflow = workflow.describe(),
                tag = raw,
                "invalid tag identifier; expected an integer, skipping workflow"
            );
            None
        }
    }
}

/// Apply `process` to every document carrying `tag`, in the order the
/// store returns them.
///
/// A failed store query or an empty result stops this pass without error.
/// A failure while processing one document aborts the remaining batch
/// rather than being skipped.
pub async fn run_for_tag<F, Fut>(
    store: &PaperlessClient,
    tag: u64,
    workflow: Workflow,
    mut process: F,
) -> Result<(), AppError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<(), ProcessError>>,
{
    let documents = match store.find_documents_with_tag(tag).await {
        Ok(ids) => ids,
        Err(err) => {
            error!(
                workflow = workflow.describe(),
                tag,
                error = %err,
                "document query failed; stopping this pass"
            );
            return Ok(());
        }
    };

    if documents.is_empty() {
        info!(workflow = workflow.describe(), tag, "no documents retrieved");
        return Ok(());
    }

    let total = documents.len();
    info!(
        workflow = workflow.describe(),
        tag, total, "found tagged documents"
    );

    for (index, document_id) in documents.into_iter().enumerate() {
        info!(
            workflow = workflow.describe(),
            doc_id = document_id,
            position = index + 1,
            total,
            "start processing document"
        );
        process(document_id).await?;
    }

    Ok(())
}

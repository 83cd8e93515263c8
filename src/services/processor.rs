//! Single-document enrichment pipelines.
//!
//! Both variants share one control shape: fetch the document, run the
//! transform, then apply the new field and the filtered tag set in a single
//! patch request. No state survives a call.

use thiserror::Error;
use tracing::{debug, info};

use crate::services::ocr::{MistralOcr, OcrError};
use crate::services::store::{DocumentPatch, PaperlessClient, StoreError};
use crate::services::title::{TitleError, TitleGenerator};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Title(#[from] TitleError),
}

/// Value-based set difference over tag identifiers.
pub fn tags_without(tags: &[u64], remove: u64) -> Vec<u64> {
    tags.iter().copied().filter(|&tag| tag != remove).collect()
}

/// OCR a document and overwrite its content in the store.
///
/// When `remove_tag` is given, the patch also rewrites the tag set to the
/// fetched set minus that tag; otherwise the tags field is omitted and
/// store-side tags stay untouched.
pub async fn ocr_document(
    store: &PaperlessClient,
    ocr: &MistralOcr,
    document_id: u64,
    remove_tag: Option<u64>,
) -> Result<(), ProcessError> {
    info!(doc_id = document_id, "processing document");

    let document = store.fetch_document(document_id).await?;
    let download = store.download_document(document_id).await?;
    debug!(
        doc_id = document_id,
        bytes = download.len(),
        "downloaded original document"
    );

    let content = ocr.extract_text(&download).await?;
    debug!(
        doc_id = document_id,
        chars = content.len(),
        "OCR text extracted"
    );

    if let Some(tag) = remove_tag {
        info!(doc_id = document_id, tag, tags = ?document.tags, "removing workflow tag");
    }
    let patch = DocumentPatch {
        content: Some(content),
        tags: remove_tag.map(|tag| tags_without(&document.tags, tag)),
        ..Default::default()
    };

    store.patch_document(document_id, &patch).await?;
    Ok(())
}

/// Generate a title for a document and write it back to the store.
///
/// Documents with empty or whitespace-only content are skipped without any
/// update: a title cannot be derived from nothing.
pub async fn titelize_document(
    store: &PaperlessClient,
    titles: &TitleGenerator,
    document_id: u64,
    remove_tag: Option<u64>,
) -> Result<(), ProcessError> {
    info!(doc_id = document_id, "processing document");

    let document = store.fetch_document(document_id).await?;
    if document.content.trim().is_empty() {
        info!(
            doc_id = document_id,
            "document content is empty; skipping title generation"
        );
        return Ok(());
    }

    let title = titles.generate_title(&document.content).await?;
    info!(doc_id = document_id, title = %title, "generated title");

    if let Some(tag) = remove_tag {
        info!(doc_id = document_id, tag, tags = ?document.tags, "removing workflow tag");
    }
    let patch = DocumentPatch {
        title: Some(title),
        tags: remove_tag.map(|tag| tags_without(&document.tags, tag)),
        ..Default::default()
    };

    store.patch_document(document_id, &patch).await?;
    Ok(())
}

//! IO-bound service clients and the orchestration around them.
//!
//! Modules here talk to external systems: the document store, the OCR
//! backend, and the language-model backend. Pure transforms stay in
//! `crate::text` so they can be composed without hidden IO.

pub mod ocr;
pub mod processor;
pub mod runner;
pub mod store;
pub mod title;

pub use ocr::{MistralOcr, OcrError};
pub use processor::{ocr_document, tags_without, titelize_document, ProcessError};
pub use runner::{run_batch, run_for_tag, Workflow};
pub use store::{Document, DocumentPatch, PaperlessClient, StoreError};
pub use title::{load_instructions, TitleError, TitleGenerator};

//! Answer-sheet text extraction.
//!
//! - `pdf`: poppler tools (`pdfinfo`, `pdftotext`, `pdftoppm`) behind [`PdfRenderer`]
//! - `extractor`: per-page choice between embedded text and OCR
//! - `batch`: chunked OCR calls against the generative-language API

mod batch;
mod extractor;
mod pdf;

pub use batch::{BatchOcr, CHUNK_SIZE};
pub use extractor::{Extraction, FileKind, HybridExtractor, QueuedImage, DEFAULT_MIN_CHARS};
pub use pdf::{ExtractionError, PdfRenderer, PopplerRenderer};

#[cfg(test)]
pub(crate) use pdf::fake;

//! Hybrid answer-sheet extraction.
//!
//! PDF pages that carry enough embedded text are used as-is. Sparse pages
//! (scans, handwriting) are rasterized and queued for OCR, as are uploaded
//! image files. Anything else is ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, info, warn};

use super::pdf::{ExtractionError, PdfRenderer};

/// Trimmed page text must be longer than this to skip OCR.
pub const DEFAULT_MIN_CHARS: usize = 50;

/// Character count with every whitespace run counted as one space.
///
/// Keeps sparse header-only pages (`Name: ....... Roll No:`) below the
/// threshold however the text layer spaces them out.
fn content_chars(text: &str) -> usize {
    text.split_whitespace()
        .map(|word| word.chars().count() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

/// An image waiting for OCR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedImage {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl QueuedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }
}

/// Output of extraction, in upload order then page order.
#[derive(Debug, Default)]
pub struct Extraction {
    pub local_texts: Vec<String>,
    pub queued: Vec<QueuedImage>,
}

/// How an uploaded file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Other,
}

impl FileKind {
    pub fn detect(path: &Path) -> Self {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.essence_str() == "application/pdf" {
            FileKind::Pdf
        } else if mime.type_() == mime_guess::mime::IMAGE {
            FileKind::Image
        } else {
            FileKind::Other
        }
    }
}

/// Splits answer sheets into direct text and OCR work.
pub struct HybridExtractor {
    renderer: Arc<dyn PdfRenderer>,
    min_chars: usize,
}

impl HybridExtractor {
    pub fn new(renderer: Arc<dyn PdfRenderer>) -> Self {
        Self {
            renderer,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Extract every file in order. Unreadable files are logged and skipped.
    pub async fn extract(&self, files: &[PathBuf]) -> Extraction {
        let mut extraction = Extraction::default();

        for path in files {
            let result = match FileKind::detect(path) {
                FileKind::Pdf => self.extract_pdf(path, &mut extraction).await,
                FileKind::Image => self.queue_image(path, &mut extraction).await,
                FileKind::Other => {
                    debug!("Skipping {}: not a PDF or image", path.display());
                    Ok(())
                }
            };

            if let Err(e) = result {
                warn!("Skipping {}: {}", path.display(), e);
            }
        }

        info!(
            "Extracted {} text pages, queued {} images for OCR",
            extraction.local_texts.len(),
            extraction.queued.len()
        );
        extraction
    }

    async fn extract_pdf(
        &self,
        path: &Path,
        extraction: &mut Extraction,
    ) -> Result<(), ExtractionError> {
        let pages = self.renderer.page_count(path).await?;

        for page in 1..=pages {
            let text = match self.renderer.page_text(path, page).await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    debug!("No text for page {} of {}: {}", page, path.display(), e);
                    String::new()
                }
            };

            if content_chars(&text) > self.min_chars {
                extraction.local_texts.push(text);
                continue;
            }

            match self.renderer.render_page_jpeg(path, page).await {
                Ok(bytes) => extraction
                    .queued
                    .push(QueuedImage::from_bytes("image/jpeg", &bytes)),
                Err(e) => warn!(
                    "Failed to render page {} of {}: {}",
                    page,
                    path.display(),
                    e
                ),
            }
        }

        Ok(())
    }

    async fn queue_image(
        &self,
        path: &Path,
        extraction: &mut Extraction,
    ) -> Result<(), ExtractionError> {
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        extraction
            .queued
            .push(QueuedImage::from_bytes(mime.essence_str(), &bytes));
        Ok(())
    }
}

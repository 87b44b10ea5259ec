//! Extraction pipeline for one upload: knowledge base plus answer sheets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GeminiSettings;
use crate::llm::{prompts, GenerateContent};
use crate::ocr::{BatchOcr, ExtractionError, HybridExtractor, PdfRenderer};

use super::evaluator::Evaluator;

/// Texts produced for one upload.
#[derive(Debug)]
pub struct PreparedScript {
    pub kb_text: String,
    /// Set when the knowledge base could not be read; `kb_text` is empty then.
    pub kb_error: Option<ExtractionError>,
    pub extracted_text: String,
}

/// Combine direct page text and OCR output into the final answer text.
pub fn assemble_answer(local_texts: &[String], ocr_text: &str) -> String {
    let combined = format!("{}\n{}", local_texts.join("\n"), ocr_text);
    let trimmed = combined.trim();
    if trimmed.is_empty() {
        prompts::NO_READABLE_PAGES.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Runs extraction, OCR and evaluation.
#[derive(Clone)]
pub struct GradingService {
    renderer: Arc<dyn PdfRenderer>,
    transport: Arc<dyn GenerateContent>,
    settings: GeminiSettings,
}

impl GradingService {
    pub fn new(
        renderer: Arc<dyn PdfRenderer>,
        transport: Arc<dyn GenerateContent>,
        settings: GeminiSettings,
    ) -> Self {
        Self {
            renderer,
            transport,
            settings,
        }
    }

    pub async fn knowledge_base_text(&self, path: &Path) -> Result<String, ExtractionError> {
        self.renderer.document_text(path).await
    }

    /// Answer text for the given files, in order.
    pub async fn answer_text(&self, files: &[PathBuf]) -> String {
        let extraction = HybridExtractor::new(self.renderer.clone())
            .extract(files)
            .await;

        let ocr_text = BatchOcr::new(self.transport.clone(), self.settings.chunk_delay)
            .run(&extraction.queued)
            .await;

        assemble_answer(&extraction.local_texts, &ocr_text)
    }

    /// Extract the knowledge base and answers of an upload.
    pub async fn prepare(&self, kb_path: &Path, answer_files: &[PathBuf]) -> PreparedScript {
        let (kb_text, kb_error) = match self.knowledge_base_text(kb_path).await {
            Ok(text) => (text, None),
            Err(e) => {
                warn!(
                    "Knowledge base extraction failed for {}: {}",
                    kb_path.display(),
                    e
                );
                (String::new(), Some(e))
            }
        };

        let extracted_text = self.answer_text(answer_files).await;
        info!(
            "Prepared script: {} knowledge base chars, {} answer chars",
            kb_text.len(),
            extracted_text.len()
        );

        PreparedScript {
            kb_text,
            kb_error,
            extracted_text,
        }
    }

    pub async fn evaluate(&self, kb_text: &str, answer: &str) -> String {
        Evaluator::new(self.transport.clone(), self.settings.evaluation_delay)
            .evaluate(kb_text, answer)
            .await
    }
}

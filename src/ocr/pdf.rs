//! PDF access through the poppler command-line tools.

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page-level PDF operations.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Number of pages; fails if the file cannot be parsed as a PDF.
    async fn page_count(&self, path: &Path) -> Result<u32, ExtractionError>;

    /// Embedded text of one 1-based page.
    async fn page_text(&self, path: &Path, page: u32) -> Result<String, ExtractionError>;

    /// JPEG bytes of one 1-based page at 72 DPI, quality 80.
    async fn render_page_jpeg(&self, path: &Path, page: u32) -> Result<Vec<u8>, ExtractionError>;

    /// Text of every page, concatenated.
    async fn document_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let pages = self.page_count(path).await?;
        let mut text = String::new();
        for page in 1..=pages {
            text.push_str(&self.page_text(path, page).await?);
        }
        Ok(text)
    }
}

const RENDER_DPI: &str = "72";
const JPEG_QUALITY: &str = "quality=80";

fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ExtractionError::ExtractionFailed(format!(
                "{}: {}",
                error_prefix,
                stderr.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Parse the `Pages:` line of `pdfinfo` output.
fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
}

/// Renderer backed by `pdfinfo`, `pdftotext` and `pdftoppm`.
#[derive(Debug, Default, Clone)]
pub struct PopplerRenderer;

impl PopplerRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Check which poppler tools are on the PATH.
    pub async fn check_tools() -> Vec<(String, bool)> {
        let mut tools = Vec::new();
        for tool in ["pdfinfo", "pdftotext", "pdftoppm"] {
            let found = Command::new(tool).arg("-v").output().await.is_ok();
            tools.push((tool.to_string(), found));
        }
        tools
    }
}

#[async_trait]
impl PdfRenderer for PopplerRenderer {
    async fn page_count(&self, path: &Path) -> Result<u32, ExtractionError> {
        let output = Command::new("pdfinfo").arg(path).output().await;
        let info = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;

        parse_page_count(&info).ok_or_else(|| {
            ExtractionError::ExtractionFailed(format!("no page count for {}", path.display()))
        })
    }

    async fn page_text(&self, path: &Path, page: u32) -> Result<String, ExtractionError> {
        let page_str = page.to_string();
        // Reading-order output; -layout pads column gaps with spaces
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(path)
            .arg("-")
            .output()
            .await;

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page),
        )
    }

    async fn render_page_jpeg(&self, path: &Path, page: u32) -> Result<Vec<u8>, ExtractionError> {
        let temp_dir = TempDir::new()?;
        let prefix = temp_dir.path().join("page");
        let page_str = page.to_string();

        let output = Command::new("pdftoppm")
            .args(["-jpeg", "-jpegopt", JPEG_QUALITY, "-r", RENDER_DPI])
            .args(["-f", &page_str, "-l", &page_str, "-singlefile"])
            .arg(path)
            .arg(&prefix)
            .output()
            .await;

        handle_cmd_output(
            output,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to render page {}", page),
        )?;

        let image_path = prefix.with_extension("jpg");
        tokio::fs::read(&image_path).await.map_err(|e| {
            ExtractionError::ExtractionFailed(format!("no image for page {}: {}", page, e))
        })
    }

    async fn document_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output()
            .await;

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory renderer keyed by file name.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeRenderer {
        documents: HashMap<String, Vec<String>>,
        pub rendered: Mutex<Vec<(String, u32)>>,
    }

    impl FakeRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a document by file name with the text of each page.
        pub fn with_document(mut self, name: &str, pages: &[&str]) -> Self {
            self.documents.insert(
                name.to_string(),
                pages.iter().map(|p| p.to_string()).collect(),
            );
            self
        }

        pub fn rendered_pages(&self) -> Vec<(String, u32)> {
            self.rendered.lock().unwrap().clone()
        }

        fn pages(&self, path: &Path) -> Result<&Vec<String>, ExtractionError> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.documents
                .get(&name)
                .ok_or_else(|| ExtractionError::ExtractionFailed(format!("not a PDF: {}", name)))
        }
    }

    #[async_trait]
    impl PdfRenderer for FakeRenderer {
        async fn page_count(&self, path: &Path) -> Result<u32, ExtractionError> {
            Ok(self.pages(path)?.len() as u32)
        }

        async fn page_text(&self, path: &Path, page: u32) -> Result<String, ExtractionError> {
            self.pages(path)?
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| ExtractionError::ExtractionFailed(format!("no page {}", page)))
        }

        async fn render_page_jpeg(
            &self,
            path: &Path,
            page: u32,
        ) -> Result<Vec<u8>, ExtractionError> {
            self.pages(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.rendered.lock().unwrap().push((name.clone(), page));
            Ok(format!("jpeg:{}:{}", name, page).into_bytes())
        }
    }
}

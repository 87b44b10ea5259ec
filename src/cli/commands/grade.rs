//! Offline grading command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::llm::{GeminiClient, GenerateContent};
use crate::ocr::PopplerRenderer;
use crate::services::{extract_total_marks, GradingService};

/// Extract (and optionally evaluate) answer sheets, printing the results.
pub async fn cmd_grade(
    settings: &Settings,
    knowledge_base: &Path,
    answers: &[PathBuf],
    extract_only: bool,
) -> anyhow::Result<()> {
    for path in std::iter::once(knowledge_base).chain(answers.iter().map(PathBuf::as_path)) {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let transport = Arc::new(GeminiClient::new(&settings.gemini)?);
    if !transport.is_configured() {
        println!(
            "{} No Gemini API key configured; OCR and evaluation will report errors",
            style("!").yellow()
        );
    }

    let service = GradingService::new(
        Arc::new(PopplerRenderer::new()),
        transport,
        settings.gemini.clone(),
    );

    println!("{} Extracting text...", style("→").cyan());
    let prepared = service.prepare(knowledge_base, answers).await;
    if let Some(e) = &prepared.kb_error {
        println!(
            "  {} Failed to extract text from knowledge base: {}",
            style("!").yellow(),
            e
        );
    }

    println!("\n{}", style("Extracted answer").bold());
    println!("{}", prepared.extracted_text);

    if extract_only {
        return Ok(());
    }

    println!("\n{} Evaluating...", style("→").cyan());
    let evaluation = service
        .evaluate(&prepared.kb_text, &prepared.extracted_text)
        .await;

    println!(
        "\n{} {}",
        style("Total Marks:").bold(),
        extract_total_marks(&evaluation)
    );
    println!("{}", evaluation);

    Ok(())
}

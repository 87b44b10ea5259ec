//! Chunked OCR through the generative-language API.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::extractor::QueuedImage;
use crate::llm::{
    call_with_retry, prompts, GenerateContent, GenerateRequest, Part, RetryOutcome, RetryPolicy,
};

/// Images sent per request.
pub const CHUNK_SIZE: usize = 3;

/// Sends queued images in fixed-size batches and joins the results.
pub struct BatchOcr {
    transport: Arc<dyn GenerateContent>,
    chunk_size: usize,
    chunk_delay: Duration,
    policy: RetryPolicy,
}

impl BatchOcr {
    pub fn new(transport: Arc<dyn GenerateContent>, chunk_delay: Duration) -> Self {
        Self {
            transport,
            chunk_size: CHUNK_SIZE,
            chunk_delay,
            policy: RetryPolicy::ocr_batch(),
        }
    }

    /// OCR all images. A failed batch yields a placeholder and later
    /// batches still run.
    pub async fn run(&self, images: &[QueuedImage]) -> String {
        if !self.transport.is_configured() {
            return prompts::API_KEY_MISSING.to_string();
        }
        if images.is_empty() {
            return String::new();
        }

        info!("Starting chunked OCR for {} pages", images.len());

        let chunk_count = images.len().div_ceil(self.chunk_size);
        let mut texts = Vec::with_capacity(chunk_count);

        for (index, chunk) in images.chunks(self.chunk_size).enumerate() {
            let first = index * self.chunk_size + 1;
            let last = first + chunk.len() - 1;
            let label = format!("OCR chunk {} (pages {}-{})", index + 1, first, last);
            info!("Processing {}", label);

            let mut parts = Vec::with_capacity(chunk.len() + 1);
            parts.push(Part::text(prompts::OCR_PROMPT));
            parts.extend(
                chunk
                    .iter()
                    .map(|img| Part::image(img.mime_type.clone(), img.data.clone())),
            );
            let request = GenerateRequest::new(parts);

            let outcome = call_with_retry(
                self.transport.as_ref(),
                &request,
                &self.policy,
                &label,
                |response| response.first_text().map(|t| t.trim().to_string()),
            )
            .await;

            let text = match outcome {
                RetryOutcome::Success(text) => text,
                other => {
                    warn!("{} failed: {}", label, describe_failure(&other));
                    prompts::chunk_failed(first, last)
                }
            };
            texts.push(text);

            if index + 1 < chunk_count {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        texts.join("\n\n")
    }
}

fn describe_failure(outcome: &RetryOutcome<String>) -> String {
    match outcome {
        RetryOutcome::Success(_) => "success".to_string(),
        RetryOutcome::Empty => "empty reply".to_string(),
        RetryOutcome::Terminal { status, .. } => format!("status {}", status),
        RetryOutcome::Failed(msg) => msg.clone(),
        RetryOutcome::Exhausted {
            attempts,
            last_status,
        } => format!("gave up after {} attempts (last status {:?})", attempts, last_status),
    }
}

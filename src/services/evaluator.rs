//! Scores an extracted answer against the knowledge base.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use crate::llm::{
    call_with_retry, prompts, ApiReply, GeminiError, GenerateContent, GenerateRequest,
    GenerationConfig, Part, RetryOutcome, RetryPolicy,
};

/// Shown when no mark can be found in an evaluation.
pub const MARKS_UNAVAILABLE: &str = "N/A";

static TOTAL_MARKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)total\s*marks\s*\**\s*[:=\-]?\s*\**\s*([0-9]+(?:\s*/\s*[0-9]+)?)")
        .expect("valid total marks regex")
});

/// Pull the "Total Marks" figure out of an evaluation, e.g. `35/50`.
pub fn extract_total_marks(evaluation: &str) -> String {
    TOTAL_MARKS
        .captures(evaluation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<String>())
        .unwrap_or_else(|| MARKS_UNAVAILABLE.to_string())
}

/// Examiner backed by the generative-language API.
///
/// Every failure is returned as evaluation text; nothing here errors.
pub struct Evaluator {
    transport: Arc<dyn GenerateContent>,
    delay: Duration,
    policy: RetryPolicy,
}

impl Evaluator {
    pub fn new(transport: Arc<dyn GenerateContent>, delay: Duration) -> Self {
        Self {
            transport,
            delay,
            policy: RetryPolicy::evaluation(),
        }
    }

    pub async fn evaluate(&self, kb_text: &str, student_answer: &str) -> String {
        if !self.transport.is_configured() {
            return prompts::evaluation_error(GeminiError::MissingApiKey);
        }

        let request = GenerateRequest::new(vec![Part::text(prompts::evaluation_prompt(
            kb_text,
            student_answer,
        ))])
        .with_generation_config(GenerationConfig {
            temperature: 0.0,
            top_k: 1,
        });

        tokio::time::sleep(self.delay).await;

        let outcome = call_with_retry(
            self.transport.as_ref(),
            &request,
            &self.policy,
            "evaluation",
            |response| response.first_text().map(str::to_string),
        )
        .await;

        match outcome {
            RetryOutcome::Success(text) => {
                info!("Evaluation complete ({} chars)", text.len());
                text
            }
            RetryOutcome::Empty => prompts::EVALUATION_NO_CONTENT.to_string(),
            RetryOutcome::Terminal { status, body } => {
                let reply = ApiReply { status, body };
                let detail = match reply.error_message() {
                    Some(message) => format!("HTTP {}: {}", status, message),
                    None => format!("HTTP {}", status),
                };
                prompts::evaluation_error(detail)
            }
            RetryOutcome::Failed(message) => prompts::evaluation_error(message),
            RetryOutcome::Exhausted { attempts, .. } => {
                warn!("Evaluation gave up after {} attempts", attempts);
                prompts::EVALUATION_RATE_LIMITED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{text_reply, Scripted, ScriptedTransport};

    fn evaluator(transport: Arc<ScriptedTransport>) -> Evaluator {
        Evaluator::new(transport, Duration::from_secs(2))
    }

    #[test]
    fn test_extract_total_marks() {
        assert_eq!(extract_total_marks("**Total Marks: 35/50**\nGood."), "35/50");
        assert_eq!(extract_total_marks("**Total Marks**: 42 / 50"), "42/50");
        assert_eq!(extract_total_marks("total marks = 12"), "12");
        assert_eq!(extract_total_marks("TotalMarks-7/50"), "7/50");
        assert_eq!(extract_total_marks("No score given."), "N/A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluation_success() {
        let transport = Arc::new(ScriptedTransport::always(
            200,
            &text_reply("**Total Marks: 40/50**\n**Relevance**: high"),
        ));

        let result = evaluator(transport.clone())
            .evaluate("Knowledge", "Answer")
            .await;

        assert_eq!(result, "**Total Marks: 40/50**\n**Relevance**: high");
        let requests = transport.requests.lock().unwrap();
        let json = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
        assert_eq!(json["generationConfig"]["topK"], 1);
        let prompt = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("\"\"\"Knowledge\"\"\""));
        assert!(prompt.contains("\"\"\"Answer\"\"\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_rate_limit() {
        let transport = Arc::new(ScriptedTransport::always(429, "{}"));

        let result = evaluator(transport.clone()).evaluate("kb", "answer").await;

        assert_eq!(
            result,
            "Error: Evaluation rate limit exceeded after retries. Please wait 1 minute and try again."
        );
        assert_eq!(transport.call_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_become_text() {
        let empty = Arc::new(ScriptedTransport::always(200, r#"{"candidates":[]}"#));
        assert_eq!(
            evaluator(empty).evaluate("kb", "a").await,
            "Evaluation failed (No content)."
        );

        let denied = Arc::new(ScriptedTransport::always(
            403,
            r#"{"error":{"message":"Permission denied"}}"#,
        ));
        assert_eq!(
            evaluator(denied.clone()).evaluate("kb", "a").await,
            "Error during evaluation: HTTP 403: Permission denied"
        );
        assert_eq!(denied.call_count(), 1);

        let broken = Arc::new(ScriptedTransport::new(vec![Scripted::Transport]));
        let result = evaluator(broken).evaluate("kb", "a").await;
        assert!(result.starts_with("Error during evaluation: "));
        assert!(result.contains("connection reset"));

        let unconfigured = Arc::new(ScriptedTransport::unconfigured());
        assert_eq!(
            evaluator(unconfigured).evaluate("kb", "a").await,
            "Error during evaluation: API key missing"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Scripted::Reply(500, String::new()),
            Scripted::Reply(200, text_reply("**Total Marks: 10/50**")),
        ]));

        let result = evaluator(transport.clone()).evaluate("kb", "a").await;

        assert_eq!(extract_total_marks(&result), "10/50");
        assert_eq!(transport.call_count(), 2);
    }
}

//! Bounded retry with status-dependent backoff.
//!
//! Rate-limit replies (429) and transient server errors (500, 502, 503,
//! 504) are retried with a linearly growing delay. Any other non-success
//! status ends the loop at once. No delay is taken after the final
//! attempt.

use std::time::Duration;

use tracing::{debug, warn};

use super::{GeminiError, GenerateContent, GenerateRequest, GenerateResponse};

/// Delay schedule for one class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * attempt` (attempts are 1-based).
    Linear(Duration),
    /// Same delay every time.
    Fixed(Duration),
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Linear(base) => base.saturating_mul(attempt.max(1)),
            Backoff::Fixed(delay) => *delay,
        }
    }
}

/// How a call is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limited: Backoff,
    pub server_error: Backoff,
    /// `None` gives up on the first transport failure.
    pub transport_error: Option<Backoff>,
    /// Retry a 200 reply with no text, without waiting.
    pub retry_empty: bool,
}

impl RetryPolicy {
    /// Policy for one OCR batch: three attempts.
    pub fn ocr_batch() -> Self {
        Self {
            max_attempts: 3,
            rate_limited: Backoff::Linear(Duration::from_secs(4)),
            server_error: Backoff::Linear(Duration::from_secs(2)),
            transport_error: Some(Backoff::Fixed(Duration::from_secs(2))),
            retry_empty: true,
        }
    }

    /// Policy for an evaluation: ten attempts, long waits on 429.
    pub fn evaluation() -> Self {
        Self {
            max_attempts: 10,
            rate_limited: Backoff::Linear(Duration::from_secs(10)),
            server_error: Backoff::Linear(Duration::from_secs(2)),
            transport_error: None,
            retry_empty: false,
        }
    }
}

/// Coarse classification of an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    RateLimited,
    ServerError,
    Terminal,
}

impl StatusClass {
    pub fn classify(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            429 => StatusClass::RateLimited,
            500 | 502 | 503 | 504 => StatusClass::ServerError,
            _ => StatusClass::Terminal,
        }
    }
}

/// Result of a retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    /// Success status but no usable content.
    Empty,
    /// Non-retryable status.
    Terminal { status: u16, body: String },
    /// Transport or decoding failure that was not retried.
    Failed(String),
    /// All attempts used on retryable failures.
    Exhausted { attempts: u32, last_status: Option<u16> },
}

/// Send `request` until `extract` yields a value or the policy gives up.
pub async fn call_with_retry<T, F>(
    transport: &dyn GenerateContent,
    request: &GenerateRequest,
    policy: &RetryPolicy,
    label: &str,
    extract: F,
) -> RetryOutcome<T>
where
    F: Fn(&GenerateResponse) -> Option<T>,
{
    let mut last_status = None;

    for attempt in 1..=policy.max_attempts {
        let is_last = attempt == policy.max_attempts;

        let failure = match transport.generate(request).await {
            Ok(reply) => {
                last_status = Some(reply.status);
                match StatusClass::classify(reply.status) {
                    StatusClass::Success => match reply.parse() {
                        Ok(response) => match extract(&response) {
                            Some(value) => return RetryOutcome::Success(value),
                            None if policy.retry_empty => {
                                debug!("{}: empty reply on attempt {}", label, attempt);
                                continue;
                            }
                            None => return RetryOutcome::Empty,
                        },
                        Err(e) => e,
                    },
                    StatusClass::RateLimited => {
                        let delay = policy.rate_limited.delay(attempt);
                        warn!(
                            "{}: rate limited (attempt {}/{}), waiting {:?}",
                            label, attempt, policy.max_attempts, delay
                        );
                        if !is_last {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }
                    StatusClass::ServerError => {
                        let delay = policy.server_error.delay(attempt);
                        warn!(
                            "{}: server error {} (attempt {}/{}), waiting {:?}",
                            label, reply.status, attempt, policy.max_attempts, delay
                        );
                        if !is_last {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }
                    StatusClass::Terminal => {
                        warn!("{}: request failed with status {}", label, reply.status);
                        return RetryOutcome::Terminal {
                            status: reply.status,
                            body: reply.body,
                        };
                    }
                }
            }
            Err(e) => e,
        };

        if matches!(failure, GeminiError::MissingApiKey) {
            return RetryOutcome::Failed(failure.to_string());
        }

        match policy.transport_error {
            Some(backoff) => {
                let delay = backoff.delay(attempt);
                warn!(
                    "{}: {} (attempt {}/{}), waiting {:?}",
                    label, failure, attempt, policy.max_attempts, delay
                );
                if !is_last {
                    tokio::time::sleep(delay).await;
                }
            }
            None => return RetryOutcome::Failed(failure.to_string()),
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{text_reply, Scripted, ScriptedTransport};
    use crate::llm::Part;
    use tokio::time::Instant;

    fn request() -> GenerateRequest {
        GenerateRequest::new(vec![Part::text("prompt")])
    }

    fn first_text(response: &GenerateResponse) -> Option<String> {
        response.first_text().map(|t| t.trim().to_string())
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatusClass::classify(200), StatusClass::Success);
        assert_eq!(StatusClass::classify(429), StatusClass::RateLimited);
        for status in [500, 502, 503, 504] {
            assert_eq!(StatusClass::classify(status), StatusClass::ServerError);
        }
        for status in [400, 401, 403, 404, 501] {
            assert_eq!(StatusClass::classify(status), StatusClass::Terminal);
        }
    }

    #[test]
    fn test_backoff_delay() {
        let linear = Backoff::Linear(Duration::from_secs(4));
        assert_eq!(linear.delay(1), Duration::from_secs(4));
        assert_eq!(linear.delay(3), Duration::from_secs(12));
        assert_eq!(
            Backoff::Fixed(Duration::from_secs(2)).delay(5),
            Duration::from_secs(2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_rate_limit() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Reply(429, "{}".into()),
            Scripted::Reply(200, text_reply("  page text \n")),
        ]);
        let start = Instant::now();

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::ocr_batch(),
            "ocr",
            first_text,
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success("page text".to_string()));
        assert_eq!(transport.call_count(), 2);
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluation_gives_up_after_ten_rate_limits() {
        let transport = ScriptedTransport::always(429, "{}");
        let start = Instant::now();

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::evaluation(),
            "evaluation",
            first_text,
        )
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                attempts: 10,
                last_status: Some(429)
            }
        );
        assert_eq!(transport.call_count(), 10);
        // 10s * (1 + 2 + ... + 9), nothing after the last attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(450));
        assert!(elapsed < Duration::from_secs(451));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_use_short_backoff() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Reply(503, String::new()),
            Scripted::Reply(502, String::new()),
            Scripted::Reply(200, text_reply("ok")),
        ]);
        let start = Instant::now();

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::ocr_batch(),
            "ocr",
            first_text,
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success("ok".to_string()));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_stops_immediately() {
        let transport = ScriptedTransport::always(400, r#"{"error":{"message":"bad"}}"#);

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::evaluation(),
            "evaluation",
            first_text,
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Terminal { status: 400, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_retried_without_delay() {
        let transport = ScriptedTransport::always(200, r#"{"candidates":[]}"#);
        let start = Instant::now();

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::ocr_batch(),
            "ocr",
            first_text,
        )
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                attempts: 3,
                last_status: Some(200)
            }
        );
        assert_eq!(transport.call_count(), 3);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_not_retried_for_evaluation() {
        let transport = ScriptedTransport::always(200, r#"{"candidates":[]}"#);

        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::evaluation(),
            "evaluation",
            first_text,
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Empty);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Transport,
            Scripted::Reply(200, text_reply("recovered")),
        ]);
        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::ocr_batch(),
            "ocr",
            first_text,
        )
        .await;
        assert_eq!(outcome, RetryOutcome::Success("recovered".to_string()));

        let transport = ScriptedTransport::new(vec![Scripted::Transport]);
        let outcome = call_with_retry(
            &transport,
            &request(),
            &RetryPolicy::evaluation(),
            "evaluation",
            first_text,
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::Failed(ref msg) if msg.contains("connection reset")));
        assert_eq!(transport.call_count(), 1);
    }
}

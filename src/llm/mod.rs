//! Client for the external generative-language API.
//!
//! Both OCR batches and evaluations go through the same `generateContent`
//! call. The transport sits behind [`GenerateContent`] so the pipeline can
//! be driven by scripted replies in tests; [`retry`] holds the shared
//! backoff policy.

mod client;
pub mod prompts;
pub mod retry;

pub use client::{
    ApiReply, Content, GeminiClient, GeminiError, GenerateContent, GenerateRequest,
    GenerateResponse, GenerationConfig, InlineData, Part,
};
pub use retry::{call_with_retry, Backoff, RetryOutcome, RetryPolicy, StatusClass};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for exercising retry behavior without a network.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{ApiReply, GeminiError, GenerateContent, GenerateRequest};

    /// One scripted reply.
    pub enum Scripted {
        Reply(u16, String),
        Transport,
    }

    /// Replies are consumed in order; once one entry is left it repeats.
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Scripted>>,
        pub requests: Mutex<Vec<GenerateRequest>>,
        configured: bool,
    }

    impl ScriptedTransport {
        pub fn new(replies: Vec<Scripted>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                configured: true,
            }
        }

        /// Transport that reports a missing API key.
        pub fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::new(Vec::new())
            }
        }

        /// Always answer with the same status and body.
        pub fn always(status: u16, body: &str) -> Self {
            Self::new(vec![Scripted::Reply(status, body.to_string())])
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn next(&self) -> Option<Scripted> {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                return replies.pop_front();
            }
            replies.front().map(|entry| match entry {
                Scripted::Reply(status, body) => Scripted::Reply(*status, body.clone()),
                Scripted::Transport => Scripted::Transport,
            })
        }
    }

    /// JSON body with a single text candidate.
    pub fn text_reply(text: &str) -> String {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string()
    }

    #[async_trait]
    impl GenerateContent for ScriptedTransport {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<ApiReply, GeminiError> {
            self.requests.lock().unwrap().push(request.clone());

            let entry = self.next().unwrap_or(Scripted::Transport);

            match entry {
                Scripted::Reply(status, body) => Ok(ApiReply { status, body }),
                Scripted::Transport => Err(GeminiError::Request("connection reset".to_string())),
            }
        }
    }
}

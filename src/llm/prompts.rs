//! Prompt text and fixed result strings.

/// Knowledge-base characters embedded in an evaluation prompt.
pub const KNOWLEDGE_BASE_LIMIT: usize = 20_000;

pub const OCR_PROMPT: &str = "Extract text from these images sequentially. Return text only.";

pub const API_KEY_MISSING: &str = "[Error: API Key missing]";
pub const NO_READABLE_PAGES: &str = "[Error: No readable pages found]";
pub const EVALUATION_NO_CONTENT: &str = "Evaluation failed (No content).";
pub const EVALUATION_RATE_LIMITED: &str =
    "Error: Evaluation rate limit exceeded after retries. Please wait 1 minute and try again.";

/// Placeholder for a batch whose OCR failed. `first` and `last` are 1-based.
pub fn chunk_failed(first: usize, last: usize) -> String {
    format!("[Error: Could not extract text from Pages {first}-{last}]")
}

pub fn evaluation_error(detail: impl std::fmt::Display) -> String {
    format!("Error during evaluation: {detail}")
}

/// First `KNOWLEDGE_BASE_LIMIT` characters of the knowledge base.
pub fn truncate_knowledge_base(kb_text: &str) -> &str {
    match kb_text.char_indices().nth(KNOWLEDGE_BASE_LIMIT) {
        Some((idx, _)) => &kb_text[..idx],
        None => kb_text,
    }
}

/// Examiner prompt comparing a student answer with the knowledge base.
pub fn evaluation_prompt(kb_text: &str, student_answer: &str) -> String {
    let kb = truncate_knowledge_base(kb_text);
    format!(
        r#"You are a professional examiner evaluating handwritten student answers.

Knowledge Base:
"""{kb}"""

Student Answer:
"""{student_answer}"""

Please evaluate and return the result in the following clear format:

Analyze thoroughly and provide:
- **Total Marks** (out of 50)
- **Relevance**
- **Accuracy**
- **Missing Key Points**
- **Suggestions**
- **One-line summary feedback**

Format the output with Markdown for bolding headings (e.g. **Total Marks: 35/50**).
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_knowledge_base() {
        let long = "a".repeat(KNOWLEDGE_BASE_LIMIT + 500);
        assert_eq!(truncate_knowledge_base(&long).len(), KNOWLEDGE_BASE_LIMIT);
        assert_eq!(truncate_knowledge_base("short"), "short");

        // Multi-byte characters count once each
        let wide = "é".repeat(KNOWLEDGE_BASE_LIMIT + 1);
        assert_eq!(
            truncate_knowledge_base(&wide).chars().count(),
            KNOWLEDGE_BASE_LIMIT
        );
    }

    #[test]
    fn test_evaluation_prompt_embeds_inputs() {
        let prompt = evaluation_prompt("Photosynthesis uses light.", "Plants eat light.");
        assert!(prompt.contains("\"\"\"Photosynthesis uses light.\"\"\""));
        assert!(prompt.contains("\"\"\"Plants eat light.\"\"\""));
        assert!(prompt.contains("**Total Marks** (out of 50)"));
    }

    #[test]
    fn test_chunk_placeholder() {
        assert_eq!(
            chunk_failed(4, 6),
            "[Error: Could not extract text from Pages 4-6]"
        );
    }
}

//! Reasoning segment extraction.
//!
//! Some models (DeepSeek-R1, Qwen3, ...) prefix their answer with their
//! deliberation wrapped in `<think>` ... `</think>`. The renderer shows that
//! segment separately from the answer itself.

/// Opening delimiter of a reasoning segment
pub const REASONING_OPEN: &str = "<think>";
/// Closing delimiter of a reasoning segment
pub const REASONING_CLOSE: &str = "</think>";

/// Result of splitting model text into reasoning and content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningSplit {
    pub has_reasoning: bool,
    pub reasoning: String,
    pub content: String,
}

/// Split the first `<think>...</think>` span out of `text`.
///
/// Only the first span is honored; later spans stay inside `content`.
/// An unterminated opening delimiter counts as no reasoning at all.
pub fn extract_reasoning(text: &str) -> ReasoningSplit {
    let Some(start) = text.find(REASONING_OPEN) else {
        return ReasoningSplit::plain(text);
    };
    let inner_start = start + REASONING_OPEN.len();
    let Some(inner_len) = text[inner_start..].find(REASONING_CLOSE) else {
        return ReasoningSplit::plain(text);
    };
    let inner_end = inner_start + inner_len;
    let span_end = inner_end + REASONING_CLOSE.len();

    let mut content = String::with_capacity(text.len() - (span_end - start));
    content.push_str(&text[..start]);
    content.push_str(&text[span_end..]);

    ReasoningSplit {
        has_reasoning: true,
        reasoning: text[inner_start..inner_end].trim().to_string(),
        content: content.trim().to_string(),
    }
}

impl ReasoningSplit {
    fn plain(text: &str) -> Self {
        Self {
            has_reasoning: false,
            reasoning: String::new(),
            content: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_extracts_leading_reasoning() {
        let split = extract_reasoning("<think>\n  Let me consider.\n</think>\n\nThe answer is 4.");
        assert!(split.has_reasoning);
        assert_eq!(split.reasoning, "Let me consider.");
        assert_eq!(split.content, "The answer is 4.");
    }

    #[test]
    fn test_plain_text_is_returned_untouched() {
        let text = "  No deliberation here.  ";
        let split = extract_reasoning(text);
        assert!(!split.has_reasoning);
        assert_eq!(split.reasoning, "");
        assert_eq!(split.content, text);
    }

    #[test]
    fn test_only_first_span_is_honored() {
        let split = extract_reasoning("<think>one</think>middle<think>two</think>end");
        assert_eq!(split.reasoning, "one");
        assert_eq!(split.content, "middle<think>two</think>end");
    }

    #[test]
    fn test_unterminated_delimiter_counts_as_absent() {
        let text = "<think>never closed, answer follows";
        let split = extract_reasoning(text);
        assert!(!split.has_reasoning);
        assert_eq!(split.content, text);
    }

    #[test]
    fn test_closing_before_opening_is_ignored() {
        let text = "</think>stray<think>";
        assert!(!extract_reasoning(text).has_reasoning);
    }

    #[test]
    fn test_reasoning_in_the_middle_joins_surroundings() {
        let split = extract_reasoning("Before. <think>hmm</think> After.");
        assert_eq!(split.content, "Before.  After.");
        assert_eq!(split.reasoning, "hmm");
    }

    #[test]
    fn test_content_and_reasoning_recover_original_characters() {
        let original = "Intro text\n<think>\nstep one\nstep two\n</think>\nFinal: 42";
        let split = extract_reasoning(original);
        let without_delimiters = original
            .replacen(REASONING_OPEN, "", 1)
            .replacen(REASONING_CLOSE, "", 1);

        let mut expected: Vec<char> = strip_whitespace(&without_delimiters).chars().collect();
        let mut recovered: Vec<char> = strip_whitespace(&format!("{}{}", split.content, split.reasoning))
            .chars()
            .collect();
        expected.sort_unstable();
        recovered.sort_unstable();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_multibyte_text_around_span() {
        let split = extract_reasoning("答え<think>考え中</think>です");
        assert_eq!(split.reasoning, "考え中");
        assert_eq!(split.content, "答えです");
    }
}

//! Prompt templates for the generation provider.

pub const CHUNK_SUMMARY_SYSTEM: &str = "You are an assistant that creates a detailed summary \
     from text. I want a general summary to be of what the keypoints are in the text.";

pub const OUTLINE_SYSTEM: &str = "You are an assistant that creates a hierarchical outline \
     from text. Provide a clear table of contents with up to 2 levels. List major topics \
     (Level 1) and subtopics (Level 2).";

pub const STUDY_SYSTEM: &str =
    "You are a tutor. Summarize the text in a concise, study-friendly way.";

pub const QUIZ_SYSTEM: &str = "You are a tutor. Given the text below, generate 3 \
     multiple-choice questions. Each question should have 4 options (A, B, C, D), and exactly \
     one correct answer. Make use of plausible distractors.";

#[inline]
pub fn chunk_summary_user(text: &str) -> String {
    format!(
        "Generate a summary for a reviewer covering the major keypoints of the text.\n\n\
         Text: {}\nOutline:",
        text
    )
}

#[inline]
pub fn outline_synthesis_user(summaries: &str) -> String {
    format!(
        "Here are partial summaries of a longer text. Please produce a single hierarchical \
         outline (2 levels deep) summarizing the entire text.\n\nText: {}\nOutline:",
        summaries
    )
}

#[inline]
pub fn study_user(text: &str) -> String {
    format!(
        "Summarize the text in a concise, study-friendly way. text: {}",
        text
    )
}

#[inline]
pub fn quiz_user(text: &str, difficulty: &str) -> String {
    format!(
        "Generate 3 {}-level multiple-choice questions from the text. text: {}",
        difficulty, text
    )
}

/// Reasoning models emit a `<think>...</think>` preamble before the answer;
/// keep only the text after the final marker.
#[inline]
pub fn strip_reasoning(text: &str) -> &str {
    text.rsplit("</think>")
        .next()
        .unwrap_or(text)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_reasoning_removes_preamble() {
        let raw = "<think>Let me work through the text...</think>\n1. What is a cell?";
        assert_eq!(strip_reasoning(raw), "1. What is a cell?");
    }

    #[test]
    fn strip_reasoning_keeps_plain_output() {
        let raw = "1. What is a cell?\nA) ...";
        assert_eq!(strip_reasoning(raw), raw);
    }

    #[test]
    fn strip_reasoning_uses_last_marker() {
        let raw = "<think>first</think> middle </think> final answer";
        assert_eq!(strip_reasoning(raw), "final answer");
    }

    #[test]
    fn quiz_prompt_carries_difficulty_and_count() {
        let prompt = quiz_user("some context", "hard");
        assert!(prompt.contains("3 hard-level multiple-choice questions"));
        assert!(prompt.contains("some context"));
    }
}

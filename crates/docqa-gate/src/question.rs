use once_cell::sync::Lazy;
use regex::Regex;

pub const UNCLEAR_QUESTION: &str = "I couldn't understand that. Please ask a clear question.";

pub const MIN_QUESTION_CHARS: usize = 3;

#[allow(clippy::expect_used)]
static ALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s?.,!@#$%^&*()_+='\-]*$").expect("question pattern compiles"));

/// Plain-text questions of at least three characters.
pub fn is_clear_question(question: &str) -> bool {
    question.trim().chars().count() >= MIN_QUESTION_CHARS && ALLOWED.is_match(question)
}

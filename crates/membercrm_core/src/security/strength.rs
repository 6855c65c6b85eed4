//! Password strength scoring.
//!
//! # Responsibility
//! - Score candidate passwords on a 0..=4 scale.
//! - Explain unmet rules to the caller.
//!
//! # Invariants
//! - Scoring is pure: no I/O, no logging of the candidate.
//! - `is_strong == (score >= STRONG_THRESHOLD)`.

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;
pub const MAX_SCORE: u8 = 4;
pub const STRONG_THRESHOLD: u8 = 3;

const STRONG_MESSAGE: &str = "Password is strong";

/// Result of scoring one password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    /// 0 (very weak) ..= 4 (very strong).
    pub score: u8,
    pub is_strong: bool,
    /// Unmet rules, or a single positive message when none are unmet.
    pub feedback: Vec<String>,
}

/// Scores `password` by starting at the cap and losing one point per unmet rule.
pub fn validate(password: &str) -> StrengthReport {
    let char_count = password.chars().count();
    let rules: [(bool, &str); 6] = [
        (
            char_count >= MIN_PASSWORD_CHARS,
            "Password must be at least 8 characters long",
        ),
        (
            char_count <= MAX_PASSWORD_CHARS,
            "Password must be at most 128 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Add at least one digit",
        ),
        (
            password.chars().any(char::is_lowercase),
            "Add at least one lowercase letter",
        ),
        (
            password.chars().any(char::is_uppercase),
            "Add at least one uppercase letter",
        ),
        (
            password.chars().any(is_symbol),
            "Add at least one symbol or punctuation character",
        ),
    ];

    let feedback: Vec<String> = rules
        .iter()
        .filter(|(met, _)| !met)
        .map(|(_, message)| (*message).to_string())
        .collect();

    let unmet = i32::try_from(feedback.len()).unwrap_or(i32::MAX);
    let score = (i32::from(MAX_SCORE) - unmet).clamp(0, i32::from(MAX_SCORE)) as u8;

    StrengthReport {
        score,
        is_strong: score >= STRONG_THRESHOLD,
        feedback: if feedback.is_empty() {
            vec![STRONG_MESSAGE.to_string()]
        } else {
            feedback
        },
    }
}

/// Five-level presentation label for a score.
pub fn strength_label(score: u8) -> &'static str {
    match score {
        0 => "very weak",
        1 => "weak",
        2 => "fair",
        3 => "strong",
        _ => "very strong",
    }
}

fn is_symbol(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace() && !c.is_control())
}

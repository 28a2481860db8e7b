//! Post title screening.

use std::borrow::Cow;

use validator::ValidationError;

/// Words that may not appear anywhere in a post title, in any letter case.
pub const FORBIDDEN_TITLE_WORDS: [&str; 3] = ["ерунда", "глупость", "чепуха"];

/// Reject titles containing a forbidden word. Length is checked by the derive.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let lowered = title.to_lowercase();
    if FORBIDDEN_TITLE_WORDS.iter().any(|word| lowered.contains(word)) {
        return Err(ValidationError::new("forbidden_words")
            .with_message(Cow::Borrowed("Title cannot contain forbidden words.")));
    }

    Ok(())
}

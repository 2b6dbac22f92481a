//! Reply classification for the structured conversation flow
//!
//! Two independent signals are extracted from a user message: whether it
//! reads as agreement or disagreement, and whether it touches on family.

use crate::state_machine::ResponseType;
use regex::Regex;
use std::sync::LazyLock;

/// Terms that mark a reply as agreement
const AFFIRMATIVE_TERMS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "definitely",
    "absolutely",
    "correct",
    "right",
    "true",
    "agreed",
    "exactly",
    "sure",
    "ok",
    "okay",
];

/// Terms that mark a reply as disagreement
const NEGATIVE_TERMS: &[&str] = &[
    "no",
    "nope",
    "not",
    "don't",
    "doesn't",
    "disagree",
    "incorrect",
    "wrong",
    "false",
    "nah",
    "not really",
];

/// Family/upbringing terms, matched as plain substrings
const PARENT_TERMS: &[&str] = &[
    "mom",
    "mother",
    "dad",
    "father",
    "parent",
    "parents",
    "family",
    "childhood",
    "growing up",
    "raised",
];

static AFFIRMATIVE_RE: LazyLock<Regex> = LazyLock::new(|| whole_word_regex(AFFIRMATIVE_TERMS));
static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| whole_word_regex(NEGATIVE_TERMS));

/// Build a case-insensitive alternation that only matches whole words
fn whole_word_regex(terms: &[&str]) -> Regex {
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("term list is a valid regex")
}

/// Classify a reply as agreement, disagreement, or neither.
///
/// Agreement wins when both kinds of term are present, so
/// `"not correct"` is [`ResponseType::Yes`].
pub fn detect_response(message: &str) -> ResponseType {
    let lowered = message.to_lowercase();

    if AFFIRMATIVE_RE.is_match(&lowered) {
        ResponseType::Yes
    } else if NEGATIVE_RE.is_match(&lowered) {
        ResponseType::No
    } else {
        ResponseType::Unknown
    }
}

/// Whether the message mentions parents, family or upbringing anywhere,
/// including inside longer words ("grandparents").
pub fn detect_parent_mention(message: &str) -> bool {
    let lowered = message.to_lowercase();
    PARENT_TERMS.iter().any(|term| lowered.contains(term))
}

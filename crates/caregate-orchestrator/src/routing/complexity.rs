//! Complexity classification for backend routing.

use caregate_abstraction::{Complexity, TaskCategory};
use tracing::debug;

/// Messages longer than this many characters are complex.
pub const COMPLEX_CHAR_THRESHOLD: usize = 500;
/// Messages with more than this many words are complex.
pub const COMPLEX_WORD_THRESHOLD: usize = 80;
/// Messages shorter than this many characters are simple.
pub const SIMPLE_CHAR_THRESHOLD: usize = 50;
/// Short questions below this word count may be simple.
pub const SIMPLE_WORD_THRESHOLD: usize = 10;

const COMPLEX_KEYWORDS: &[&str] = &[
    "regulation",
    "regulatory",
    "compliance",
    "compliant",
    "audit",
    "inspection",
    "deficiency",
    "citation",
    "compare",
    "comparison",
    "analyze",
    "analyse",
    "calculate",
    "calculation",
];

const SIMPLE_KEYWORDS: &[&str] = &[
    "what is",
    "what's",
    "what are",
    "who is",
    "when is",
    "where is",
    "how do i",
    "how to",
    "define",
    "definition of",
    "meaning of",
];

/// Rule-based complexity classifier.
///
/// Rules are evaluated in order and the first match wins:
/// complex (long, wordy, or regulatory/analytical vocabulary), then simple
/// (very short, or a short definitional question), otherwise medium.
#[derive(Debug, Clone)]
pub struct ComplexityClassifier {
    complex_keywords: Vec<String>,
    simple_keywords: Vec<String>,
}

impl ComplexityClassifier {
    /// Creates a classifier with the built-in keyword sets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_keywords(COMPLEX_KEYWORDS, SIMPLE_KEYWORDS)
    }

    /// Creates a classifier with custom keyword sets.
    ///
    /// Keywords are matched case-insensitively as substrings.
    #[must_use]
    pub fn with_keywords(complex: &[&str], simple: &[&str]) -> Self {
        Self {
            complex_keywords: complex.iter().map(|k| k.to_lowercase()).collect(),
            simple_keywords: simple.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Labels a message.
    ///
    /// Compliance requests are still labelled normally; forcing them to the
    /// top tier is the router's job.
    pub fn classify(&self, message: &str, category: TaskCategory) -> Complexity {
        let char_count = message.chars().count();
        let word_count = message.split_whitespace().count();
        let lower = message.to_lowercase();

        let complexity = if char_count > COMPLEX_CHAR_THRESHOLD
            || word_count > COMPLEX_WORD_THRESHOLD
            || contains_any(&lower, &self.complex_keywords)
        {
            Complexity::Complex
        } else if char_count < SIMPLE_CHAR_THRESHOLD
            || (word_count < SIMPLE_WORD_THRESHOLD && contains_any(&lower, &self.simple_keywords))
        {
            Complexity::Simple
        } else {
            Complexity::Medium
        };

        debug!(
            category = %category,
            char_count,
            word_count,
            complexity = %complexity,
            "Classified request complexity"
        );

        complexity
    }
}

impl Default for ComplexityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

//! Struggle detection over model replies.
//!
//! This is a heuristic: a reply that tells the student to try again is taken
//! as a sign the student answered incorrectly. Detection is a pluggable
//! predicate so the phrase set (or the whole approach) can be swapped.

/// Decides whether a model reply signals that the student is struggling.
pub trait StruggleSignal: Send + Sync {
    fn indicates_struggle(&self, reply: &str) -> bool;
}

/// Default phrases, matched case-insensitively as substrings.
pub const DEFAULT_STRUGGLE_PHRASES: &[&str] = &[
    "not quite correct",
    "try again",
    "mistake",
    "that's wrong",
    "take another look",
];

/// Case-insensitive substring match against a phrase set.
#[derive(Debug, Clone)]
pub struct PhraseDetector {
    phrases: Vec<String>,
}

impl PhraseDetector {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl Default for PhraseDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STRUGGLE_PHRASES)
    }
}

impl StruggleSignal for PhraseDetector {
    fn indicates_struggle(&self, reply: &str) -> bool {
        let reply = reply.to_lowercase();
        self.phrases.iter().any(|p| reply.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let detector = PhraseDetector::default();
        assert!(detector.indicates_struggle("Hmm, NOT QUITE CORRECT. Let's check step 2."));
        assert!(detector.indicates_struggle("Good effort! Try again with a common denominator."));
        assert!(!detector.indicates_struggle("Excellent, that's exactly right!"));
    }

    #[test]
    fn custom_phrases_replace_defaults() {
        let detector = PhraseDetector::new(["Incorrect", "  ", ""]);
        assert_eq!(detector.phrases(), &["incorrect".to_string()]);
        assert!(detector.indicates_struggle("That is incorrect."));
        assert!(!detector.indicates_struggle("Try again."));
    }

    #[test]
    fn empty_phrase_set_never_matches() {
        let detector = PhraseDetector::new(Vec::<String>::new());
        assert!(!detector.indicates_struggle("try again"));
    }
}

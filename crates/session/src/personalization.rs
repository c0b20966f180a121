//! Personalized system instruction.

use mathtutor_core::{Grade, Mode, TopicStats};

/// A topic counts as struggling once its struggles exceed this.
pub const STRUGGLE_THRESHOLD: u32 = 3;

const PRACTICE_DIRECTIVE: &str = "The student is in GUIDED PRACTICE mode. Pose practice problems \
that match the topic the student chose and guide them through solving each one.";

/// Topics whose struggle count exceeds [`STRUGGLE_THRESHOLD`], in insertion order.
pub fn struggling_topics(stats: &TopicStats) -> Vec<&str> {
    stats.struggling(STRUGGLE_THRESHOLD)
}

/// Build the instruction sent with every request.
///
/// Pure: the same inputs always produce the same text.
pub fn build_instruction(base: &str, grade: Grade, mode: Mode, stats: &TopicStats) -> String {
    let mut instruction = format!(
        "{base}\n\nYou are currently supporting a grade {} student. ",
        grade.number()
    );

    if mode == Mode::GuidedPractice {
        instruction.push_str(PRACTICE_DIRECTIVE);
    }

    let struggling = struggling_topics(stats);
    if !struggling.is_empty() {
        instruction.push_str(&format!(
            "\n\nPERSONALIZATION NOTE: This student is struggling with: {}. \
             Be more patient and give more worked examples for these areas.",
            struggling.join(", ")
        ));
    }

    instruction
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stats_with_struggles(entries: &[(&str, u32)]) -> TopicStats {
        let mut stats = TopicStats::new();
        for (topic, struggles) in entries {
            stats.record_practice(topic, Utc::now());
            for _ in 0..*struggles {
                stats.record_struggle(topic, Utc::now());
            }
        }
        stats
    }

    #[test]
    fn fractions_with_four_struggles_in_grade_six_practice() {
        let stats = stats_with_struggles(&[("Fractions", 4)]);
        let text = build_instruction("BASE", Grade::Six, Mode::GuidedPractice, &stats);

        assert!(text.starts_with("BASE\n\n"));
        assert!(text.contains("grade 6 student"));
        assert!(text.contains(PRACTICE_DIRECTIVE));
        assert!(text.contains("struggling with: Fractions."));
    }

    #[test]
    fn clause_present_iff_some_topic_exceeds_threshold() {
        let at_threshold = stats_with_struggles(&[("Integers", 3), ("Circles", 0)]);
        let text = build_instruction("B", Grade::Nine, Mode::Chat, &at_threshold);
        assert!(!text.contains("PERSONALIZATION NOTE"));

        let above = stats_with_struggles(&[("Integers", 3), ("Circles", 4)]);
        let text = build_instruction("B", Grade::Nine, Mode::Chat, &above);
        assert!(text.contains("struggling with: Circles."));
        assert!(!text.contains("Integers"));

        let empty = TopicStats::new();
        assert!(!build_instruction("B", Grade::Six, Mode::Chat, &empty).contains("PERSONALIZATION"));
    }

    #[test]
    fn struggling_topics_keep_insertion_order() {
        let stats = stats_with_struggles(&[("Polynomials", 5), ("Fractions", 0), ("Angles", 4)]);
        assert_eq!(struggling_topics(&stats), vec!["Polynomials", "Angles"]);

        let text = build_instruction("B", Grade::Eight, Mode::Chat, &stats);
        assert!(text.contains("struggling with: Polynomials, Angles."));
    }

    #[test]
    fn chat_mode_omits_practice_directive() {
        let text = build_instruction("B", Grade::Seven, Mode::Chat, &TopicStats::new());
        assert_eq!(text, "B\n\nYou are currently supporting a grade 7 student. ");
    }

    #[test]
    fn deterministic_for_same_snapshot() {
        let stats = stats_with_struggles(&[("Fractions", 4), ("Integers", 6)]);
        let a = build_instruction("B", Grade::Six, Mode::GuidedPractice, &stats);
        let b = build_instruction("B", Grade::Six, Mode::GuidedPractice, &stats.clone());
        assert_eq!(a, b);
    }
}

//! Grades, interaction modes, and the per-grade topic catalog.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::topic::TopicStats;

/// A lower-secondary school grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Six, Grade::Seven, Grade::Eight, Grade::Nine];

    pub fn number(self) -> u8 {
        match self {
            Grade::Six => 6,
            Grade::Seven => 7,
            Grade::Eight => 8,
            Grade::Nine => 9,
        }
    }

    /// The fixed practice topics offered for this grade.
    pub fn topics(self) -> &'static [&'static str] {
        match self {
            Grade::Six => &[
                "Natural numbers",
                "Integers",
                "Fractions & decimals",
                "Intuitive geometry",
            ],
            Grade::Seven => &[
                "Rational & real numbers",
                "Statistics & probability",
                "Angles & parallel lines",
                "Triangles",
            ],
            Grade::Eight => &[
                "Polynomials & identities",
                "Algebraic fractions",
                "Quadrilaterals",
                "Thales' theorem",
            ],
            Grade::Nine => &[
                "Square & cube roots",
                "Systems of equations",
                "The function y = ax^2",
                "Circles",
            ],
        }
    }

    /// Up to two of this grade's topics the student has the most history
    /// with, weighting struggles double. Topics with no history are skipped.
    pub fn suggested_topics(self, stats: &TopicStats) -> Vec<&'static str> {
        let mut scored: Vec<(&'static str, u32)> = self
            .topics()
            .iter()
            .map(|&topic| {
                let score = stats
                    .get(topic)
                    .map(|s| s.struggles * 2 + s.count)
                    .unwrap_or(0);
                (topic, score)
            })
            .filter(|(_, score)| *score > 0)
            .collect();
        // sort_by is stable: ties keep catalog order
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().take(2).map(|(t, _)| t).collect()
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "6" => Ok(Grade::Six),
            "7" => Ok(Grade::Seven),
            "8" => Ok(Grade::Eight),
            "9" => Ok(Grade::Nine),
            other => Err(format!("unknown grade '{other}', expected 6, 7, 8 or 9")),
        }
    }
}

/// How the student wants to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Open-ended homework questions
    Chat,
    /// The tutor proactively poses problems on a chosen topic
    GuidedPractice,
}

impl Mode {
    /// The other mode, used by "switch mode".
    pub fn toggled(self) -> Self {
        match self {
            Mode::Chat => Mode::GuidedPractice,
            Mode::GuidedPractice => Mode::Chat,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Chat => write!(f, "chat"),
            Mode::GuidedPractice => write!(f, "practice"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Mode::Chat),
            "practice" | "guided" | "guided-practice" => Ok(Mode::GuidedPractice),
            other => Err(format!("unknown mode '{other}', expected chat or practice")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn grade_parses_and_displays() {
        assert_eq!("8".parse::<Grade>().unwrap(), Grade::Eight);
        assert_eq!(Grade::Nine.to_string(), "9");
        assert!("5".parse::<Grade>().is_err());
    }

    #[test]
    fn every_grade_has_four_topics() {
        for grade in Grade::ALL {
            assert_eq!(grade.topics().len(), 4);
        }
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("practice".parse::<Mode>().unwrap(), Mode::GuidedPractice);
        assert_eq!("Chat".parse::<Mode>().unwrap(), Mode::Chat);
        assert_eq!(Mode::Chat.toggled(), Mode::GuidedPractice);
    }

    #[test]
    fn suggestions_rank_struggles_double() {
        let mut stats = TopicStats::new();
        let now = Utc::now();
        // Integers: count 3 -> score 3
        for _ in 0..3 {
            stats.record_practice("Integers", now);
        }
        // Natural numbers: count 1, struggles 2 -> score 5
        stats.record_practice("Natural numbers", now);
        stats.record_struggle("Natural numbers", now);
        stats.record_struggle("Natural numbers", now);
        // Intuitive geometry: score 1
        stats.record_practice("Intuitive geometry", now);
        // Off-grade topic is ignored
        stats.record_practice("Circles", now);

        assert_eq!(
            Grade::Six.suggested_topics(&stats),
            vec!["Natural numbers", "Integers"]
        );
    }

    #[test]
    fn no_history_means_no_suggestions() {
        assert!(Grade::Seven.suggested_topics(&TopicStats::new()).is_empty());
    }
}

//! Cross-session topic statistics.
//!
//! A `TopicStat` is created the first time a topic is practiced (or first
//! flagged as a struggle) and only ever grows afterwards. The map keeps
//! insertion order so that derived summaries are stable across runs.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Aggregate practice record for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStat {
    /// Times a guided-practice session was started on this topic
    pub count: u32,

    /// Times a struggle signal was detected in a tutor reply
    pub struggles: u32,

    /// When the topic was last started
    #[serde(rename = "lastPracticed", with = "chrono::serde::ts_milliseconds")]
    pub last_practiced_at: DateTime<Utc>,
}

impl TopicStat {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            struggles: 0,
            last_practiced_at: now,
        }
    }
}

/// Insertion-ordered map of topic name → stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicStats(IndexMap<String, TopicStat>);

impl TopicStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: &str) -> Option<&TopicStat> {
        self.0.get(topic)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TopicStat)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record the start of a guided-practice session on `topic`.
    pub fn record_practice(&mut self, topic: &str, now: DateTime<Utc>) {
        let stat = self
            .0
            .entry(topic.to_string())
            .or_insert_with(|| TopicStat::fresh(now));
        stat.count += 1;
        stat.last_practiced_at = now;
    }

    /// Record one struggle signal on `topic`.
    pub fn record_struggle(&mut self, topic: &str, now: DateTime<Utc>) {
        self.0
            .entry(topic.to_string())
            .or_insert_with(|| TopicStat::fresh(now))
            .struggles += 1;
    }

    /// Topics whose struggle count exceeds `threshold`, in insertion order.
    pub fn struggling(&self, threshold: u32) -> Vec<&str> {
        self.iter()
            .filter(|(_, stat)| stat.struggles > threshold)
            .map(|(topic, _)| topic)
            .collect()
    }
}

use crate::memory::Topic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Process-wide preference accumulator. Updated as a side effect of every
/// conversation turn across all sessions; grows monotonically, never evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub preferred_analysis_depth: String,
    pub frequently_asked_topics: BTreeSet<String>,
    pub response_preferences: String,
    pub flight_history: Vec<String>,
    pub learning_patterns: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            preferred_analysis_depth: "detailed".to_string(),
            frequently_asked_topics: BTreeSet::new(),
            response_preferences: "technical".to_string(),
            flight_history: Vec::new(),
            learning_patterns: Vec::new(),
        }
    }
}

impl UserProfile {
    /// Fold one classified turn into the profile. Depth preference is
    /// last-write-wins between the technical and general signals.
    pub fn observe_topic(&mut self, topic: Topic) {
        self.frequently_asked_topics.insert(topic.as_str().to_string());
        match topic {
            Topic::Technical => self.preferred_analysis_depth = "detailed".to_string(),
            Topic::General => self.preferred_analysis_depth = "summary".to_string(),
            _ => {}
        }
    }

    pub fn record_flight(&mut self, flight_id: &str) {
        if !self.flight_history.iter().any(|f| f == flight_id) {
            self.flight_history.push(flight_id.to_string());
        }
    }
}

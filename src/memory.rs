use crate::profile::UserProfile;
use crate::store::MemoryStore;
use crate::summary::FlightSummary;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MEMORY_KEY: &str = "agent_memory";
const DEFAULT_RETENTION_DAYS: i64 = 30;
const DEFAULT_CONTEXT_TURNS: usize = 5;

/// Fixed topic vocabulary, in classification priority order. First matching
/// category wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Gps,
    Battery,
    Altitude,
    Vibration,
    Safety,
    Performance,
    Anomalies,
    Technical,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Gps => "gps",
            Topic::Battery => "battery",
            Topic::Altitude => "altitude",
            Topic::Vibration => "vibration",
            Topic::Safety => "safety",
            Topic::Performance => "performance",
            Topic::Anomalies => "anomalies",
            Topic::Technical => "technical",
            Topic::General => "general",
        }
    }

    /// Keyword-set classification over the lowered message. Categories are
    /// tested in declaration order; `General` is the default.
    pub fn classify(message: &str) -> Topic {
        let lower = message.to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if hit(&["gps", "signal", "satellite", "location"]) {
            Topic::Gps
        } else if hit(&["battery", "voltage", "power", "charge"]) {
            Topic::Battery
        } else if hit(&["altitude", "height", "elevation", "drop"]) {
            Topic::Altitude
        } else if hit(&["vibration", "shake", "oscillation"]) {
            Topic::Vibration
        } else if hit(&["safety", "danger", "risk", "concern"]) {
            Topic::Safety
        } else if hit(&["performance", "efficiency", "optimize"]) {
            Topic::Performance
        } else if hit(&["anomaly", "error", "issue", "problem"]) {
            Topic::Anomalies
        } else if hit(&["technical", "detail", "data", "metric"]) {
            Topic::Technical
        } else {
            Topic::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn classify(message: &str) -> Sentiment {
        const POSITIVE: &[&str] = &["good", "great", "excellent", "perfect", "amazing", "thanks"];
        const NEGATIVE: &[&str] = &["bad", "terrible", "awful", "concerned", "worried", "problem"];

        let lower = message.to_lowercase();
        let pos = POSITIVE.iter().filter(|w| lower.contains(*w)).count();
        let neg = NEGATIVE.iter().filter(|w| lower.contains(*w)).count();
        match pos.cmp(&neg) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}

/// One question/answer exchange. Immutable once created; sessions only ever
/// append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
    pub flight_id: String,
    /// Snapshot of the flight data the answer was based on; the `altitude`
    /// key marks a usable metrics proxy for cross-flight comparison.
    pub context: serde_json::Value,
    pub topic: Topic,
    pub sentiment: Sentiment,
}

/// Per-flight conversational state, created lazily on the first turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSession {
    pub flight_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub conversation_turns: Vec<ConversationTurn>,
    pub topics_discussed: Vec<Topic>,
    pub insights_shared: Vec<String>,
    pub user_interests: Vec<String>,
    pub anomalies_explored: Vec<String>,
}

impl FlightSession {
    fn new(flight_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            flight_id: flight_id.to_string(),
            start_time: now,
            last_activity: now,
            conversation_turns: Vec::new(),
            topics_discussed: Vec::new(),
            insights_shared: Vec::new(),
            user_interests: Vec::new(),
            anomalies_explored: Vec::new(),
        }
    }
}

// Persisted shape: sessions plus profile under one key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MemorySnapshot {
    flight_sessions: Vec<FlightSession>,
    user_profile: UserProfile,
    last_updated: Option<DateTime<Utc>>,
}

/// Conversation memory engine: all session and profile state, with an
/// injected persistence port. Callers serialize access (the chat layer holds
/// this behind a mutex); the engine itself is a plain value.
pub struct ConversationMemory {
    sessions: HashMap<String, FlightSession>,
    profile: UserProfile,
    store: Box<dyn MemoryStore>,
    retention_days: i64,
}

impl ConversationMemory {
    /// Load persisted state through the store port; store failures leave a
    /// fresh empty memory, they never fail construction.
    pub fn load(store: Box<dyn MemoryStore>) -> Self {
        let mut sessions = HashMap::new();
        let mut profile = UserProfile::default();
        match store.load(MEMORY_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<MemorySnapshot>(&blob) {
                Ok(snapshot) => {
                    for session in snapshot.flight_sessions {
                        sessions.insert(session.flight_id.clone(), session);
                    }
                    profile = snapshot.user_profile;
                }
                Err(err) => tracing::warn!(%err, "discarding unreadable memory snapshot"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "memory load failed, starting empty"),
        }
        Self {
            sessions,
            profile,
            store,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn session(&self, flight_id: &str) -> Option<&FlightSession> {
        self.sessions.get(flight_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Append a turn: classify topic and sentiment, create the session if
    /// this is the flight's first turn, update profile, persist.
    pub fn record_turn(
        &mut self,
        flight_id: &str,
        user_message: &str,
        assistant_response: &str,
        context: serde_json::Value,
    ) {
        let now = Utc::now();
        let topic = Topic::classify(user_message);
        let sentiment = Sentiment::classify(user_message);

        let session = self
            .sessions
            .entry(flight_id.to_string())
            .or_insert_with(|| FlightSession::new(flight_id, now));

        session.conversation_turns.push(ConversationTurn {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            user_message: user_message.to_string(),
            assistant_response: assistant_response.to_string(),
            flight_id: flight_id.to_string(),
            context,
            topic,
            sentiment,
        });
        session.last_activity = now;
        if !session.topics_discussed.contains(&topic) {
            session.topics_discussed.push(topic);
        }

        self.profile.observe_topic(topic);
        self.profile.record_flight(flight_id);
        self.persist();
    }

    /// Text block of the most recent turns for prompt construction.
    pub fn conversation_context(&self, flight_id: &str, recent_turns: usize) -> String {
        let Some(session) = self.sessions.get(flight_id) else {
            return String::new();
        };
        let n = if recent_turns == 0 { DEFAULT_CONTEXT_TURNS } else { recent_turns };
        let start = session.conversation_turns.len().saturating_sub(n);

        let mut out = format!("Previous conversation context for flight {flight_id}:\n");
        for turn in &session.conversation_turns[start..] {
            let response: String = turn.assistant_response.chars().take(200).collect();
            out.push_str(&format!("User: {}\n", turn.user_message));
            out.push_str(&format!("Assistant: {response}...\n"));
            out.push_str(&format!("Topic: {}\n\n", turn.topic.as_str()));
        }
        out
    }

    /// Proactive suggestions from undiscussed topics crossed with the
    /// flight's anomaly signals. At most two, in fixed priority order:
    /// gps, battery, safety, technical deep-dive.
    pub fn proactive_suggestions(&self, flight_id: &str, summary: &FlightSummary) -> Vec<String> {
        let Some(session) = self.sessions.get(flight_id) else {
            return Vec::new();
        };

        let discussed = &session.topics_discussed;
        let anomalies = &summary.anomalies;
        let mut suggestions = Vec::new();

        if !discussed.contains(&Topic::Gps) && anomalies.iter().any(|a| a.contains("GPS")) {
            suggestions.push(
                "I notice we haven't discussed the GPS signal instability yet. Would you like me \
to analyze the GPS performance patterns?"
                    .to_string(),
            );
        }
        if !discussed.contains(&Topic::Battery)
            && anomalies.iter().any(|a| a.to_lowercase().contains("battery"))
        {
            suggestions.push(
                "You might want to know about the battery performance degradation I detected. \
Should I explain the voltage patterns?"
                    .to_string(),
            );
        }
        if !discussed.contains(&Topic::Safety) && anomalies.len() > 2 {
            suggestions.push(
                "Given the multiple anomalies detected, would you like me to provide a \
comprehensive safety assessment?"
                    .to_string(),
            );
        }

        let turns = &session.conversation_turns;
        let recent_technical = turns
            .iter()
            .rev()
            .take(3)
            .filter(|t| t.topic == Topic::Technical)
            .count();
        if recent_technical >= 2 {
            suggestions.push(
                "I see you're interested in technical details. Would you like me to dive deeper \
into the telemetry data analysis?"
                    .to_string(),
            );
        }

        suggestions.truncate(2);
        suggestions
    }

    /// Compare the current flight against proxy metrics recovered from other
    /// sessions' turn contexts. Empty string when fewer than two sessions
    /// exist, no proxy data is found, or no threshold is exceeded.
    pub fn flight_comparison(&self, flight_id: &str, summary: &FlightSummary) -> String {
        if self.sessions.len() < 2 {
            return String::new();
        }

        // Proxy: the first turn context in each other session carrying an
        // "altitude" key. Known limitation, see DESIGN.md.
        let mut previous: Vec<(f64, f64)> = Vec::new();
        for (id, session) in &self.sessions {
            if id == flight_id {
                continue;
            }
            for turn in &session.conversation_turns {
                if let Some(alt) = turn.context.get("altitude").and_then(|v| v.as_f64()) {
                    let duration = turn
                        .context
                        .get("duration")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0);
                    previous.push((alt, duration));
                    break;
                }
            }
        }
        if previous.is_empty() {
            return String::new();
        }

        let n = previous.len() as f64;
        let avg_altitude = previous.iter().map(|(a, _)| a).sum::<f64>() / n;
        let avg_duration = previous.iter().map(|(_, d)| d).sum::<f64>() / n;

        let mut insights = Vec::new();
        if summary.max_altitude > avg_altitude * 1.2 {
            insights.push(format!(
                "This flight reached {:.1}m - significantly higher than your average of {:.1}m",
                summary.max_altitude, avg_altitude
            ));
        }
        if summary.duration > avg_duration * 1.3 {
            insights.push(format!(
                "This was a longer flight ({:.1}s vs avg {:.1}s)",
                summary.duration, avg_duration
            ));
        }
        insights.join(" | ")
    }

    /// Maintenance: drop sessions idle past the retention window, persisting
    /// the reduced set. Never invoked by turn processing.
    pub fn cleanup_old_sessions(&mut self) -> usize {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_activity >= cutoff);
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::info!(removed, "evicted idle sessions");
            self.persist();
        }
        removed
    }

    /// Synchronous save through the store port. Failures are logged; the
    /// in-memory state stays authoritative for this process.
    pub fn persist(&self) {
        let mut sessions: Vec<&FlightSession> = self.sessions.values().collect();
        sessions.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
        let snapshot = MemorySnapshot {
            flight_sessions: sessions.into_iter().cloned().collect(),
            user_profile: self.profile.clone(),
            last_updated: Some(Utc::now()),
        };
        match serde_json::to_string_pretty(&snapshot) {
            Ok(blob) => {
                if let Err(err) = self.store.save(MEMORY_KEY, &blob) {
                    tracing::warn!(%err, "memory save failed, continuing in-memory");
                }
            }
            Err(err) => tracing::warn!(%err, "memory snapshot serialization failed"),
        }
    }
}

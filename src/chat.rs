use crate::memory::ConversationMemory;
use crate::provider::ReasoningProvider;
use crate::summary::FlightRecord;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

const FLIGHT_CACHE_CAPACITY: usize = 64;

const ANALYST_PREAMBLE: &str = "You are an expert UAV flight data analyst with advanced memory \
capabilities. You help users understand flight telemetry data, identify issues, and provide \
insights about drone flights.\n\n\
You can analyze GPS coordinates and flight paths, altitude and speed data, battery performance, \
vibration levels, flight anomalies and safety concerns.\n\n\
You have conversation memory: reference previous discussions when relevant, build upon earlier \
analyses, avoid repeating information already covered, and be proactive in suggesting related \
topics.\n\n\
Provide clear, technical answers while being accessible to users.";

/// A well-formed chat result. Every processing path, including internal
/// failure, produces one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub proactive_suggestions: Vec<String>,
    pub comparison_insights: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatOutcome {
    fn bare(answer: String) -> Self {
        Self {
            answer,
            proactive_suggestions: Vec::new(),
            comparison_insights: String::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Chat orchestration: owns the flight-record cache and the conversation
/// memory, and talks to the optional reasoning provider. Mutexes serialize
/// turn processing; flights are independent but a coarse lock is correct and
/// sufficient for a single-operator tool.
pub struct ChatEngine {
    cache: Mutex<LruCache<String, FlightRecord>>,
    memory: Mutex<ConversationMemory>,
    provider: Option<Box<dyn ReasoningProvider>>,
}

impl ChatEngine {
    pub fn new(memory: ConversationMemory, provider: Option<Box<dyn ReasoningProvider>>) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(FLIGHT_CACHE_CAPACITY).unwrap(),
            )),
            memory: Mutex::new(memory),
            provider,
        }
    }

    pub fn cache_flight(&self, record: FlightRecord) {
        self.lock_cache().put(record.flight_id.clone(), record);
    }

    pub fn flight(&self, flight_id: &str) -> Option<FlightRecord> {
        self.lock_cache().get(flight_id).cloned()
    }

    pub fn memory(&self) -> MutexGuard<'_, ConversationMemory> {
        recover(self.memory.lock())
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<String, FlightRecord>> {
        recover(self.cache.lock())
    }

    /// System-prompt text for one turn: analyst preamble, conversation
    /// memory, then the flight-data context block.
    pub fn build_context(&self, flight_id: &str, record: Option<&FlightRecord>) -> String {
        let mut out = String::from(ANALYST_PREAMBLE);

        let conversation = self.memory().conversation_context(flight_id, 0);
        if !conversation.is_empty() {
            out.push_str("\n\nConversation History:\n");
            out.push_str(&conversation);
        }

        if let Some(record) = record {
            let s = &record.summary;
            let anomalies = if s.anomalies.is_empty() {
                "None".to_string()
            } else {
                s.anomalies.join(", ")
            };
            out.push_str(&format!(
                "\n\nCurrent Flight Data:\n\
- Duration: {:.1} seconds\n\
- Max Altitude: {:.1} meters\n\
- GPS Points: {}\n\
- Battery Data Points: {}\n\
- Detected Anomalies: {anomalies}\n\n\
Use this data to answer questions about the flight.",
                s.duration,
                s.max_altitude,
                record.channels.gps.len(),
                record.channels.battery.len() + record.channels.system_status.len(),
            ));
        }
        out
    }

    /// Process one chat turn. Never fails: provider errors fall back to the
    /// deterministic answer, malformed input degrades to an apology with
    /// remediation hints.
    pub fn process_message(&self, message: &str, flight_id: Option<&str>) -> ChatOutcome {
        if message.trim().is_empty() {
            return ChatOutcome::bare(
                "Sorry, I couldn't process that message. Try asking a question about the \
flight, for example \"how high did it fly?\" or \"were there any anomalies?\"."
                    .to_string(),
            );
        }

        let record = flight_id.and_then(|id| self.flight(id));

        let answer = match &self.provider {
            Some(provider) => {
                let system = self.build_context(flight_id.unwrap_or(""), record.as_ref());
                match provider.generate(&system, message) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(provider = provider.name(), %err, "chat provider failed");
                        fallback_answer(record.as_ref())
                    }
                }
            }
            None => fallback_answer(record.as_ref()),
        };

        let mut suggestions = Vec::new();
        let mut comparison = String::new();
        if let Some(id) = flight_id {
            let context = record
                .as_ref()
                .map(|r| r.metrics_snapshot())
                .unwrap_or(serde_json::Value::Null);
            let mut memory = self.memory();
            memory.record_turn(id, message, &answer, context);
            if let Some(record) = &record {
                suggestions = memory.proactive_suggestions(id, &record.summary);
                comparison = memory.flight_comparison(id, &record.summary);
            }
        }

        ChatOutcome {
            answer,
            proactive_suggestions: suggestions,
            comparison_insights: comparison,
            timestamp: Utc::now(),
        }
    }
}

// Keep serving through a poisoned lock; the protected state is always left
// structurally valid.
fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, std::sync::PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Deterministic answer used with zero providers configured or after a
/// provider failure.
fn fallback_answer(record: Option<&FlightRecord>) -> String {
    match record {
        Some(record) => {
            let s = &record.summary;
            let anomalies = if s.anomalies.is_empty() {
                "None detected".to_string()
            } else {
                s.anomalies.join(", ")
            };
            format!(
                "I can see you're asking about flight data. Here's what I found:\n\n\
Flight Summary:\n\
- Duration: {:.1} seconds\n\
- Max Altitude: {:.1} meters\n\
- Anomalies: {anomalies}\n\n\
To get more detailed analysis, configure a reasoning provider.",
                s.duration, s.max_altitude,
            )
        }
        None => "I'm ready to analyze flight data! Please upload a flight log first, then I can \
answer questions about the telemetry."
            .to_string(),
    }
}

use crate::digest::{self, PatternDigest};
use crate::heuristics::{self, DetectionConfig};
use crate::ingest::{self, IngestError, IngestLimits};
use crate::narrative::{self, AnomalyAnalysis};
use crate::provider::ReasoningProvider;
use crate::telemetry::{ChannelSet, DecodedMessage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar flight metrics plus the derived anomaly products. All metrics fail
/// soft: an empty dependency yields the metric's zero default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSummary {
    pub duration: f64,
    pub max_altitude: f64,
    pub max_speed: f64,
    /// Signed first-minus-last remaining delta; negative means the reported
    /// charge increased mid-flight, itself an anomaly signal.
    pub battery_usage: f64,
    /// Legacy flat anomaly strings from the heuristic tier.
    pub anomalies: Vec<String>,
    pub pattern_digest: PatternDigest,
    pub anomaly_analysis: AnomalyAnalysis,
}

/// One fully parsed flight. Immutable after creation except for summary
/// regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_id: String,
    pub channels: ChannelSet,
    pub total_messages: usize,
    pub message_types: BTreeMap<String, usize>,
    pub skipped_messages: usize,
    pub summary: FlightSummary,
}

impl FlightRecord {
    /// Build a record from decoder output: normalize, guard, summarize.
    pub fn from_messages(
        messages: impl IntoIterator<Item = DecodedMessage>,
        limits: &IngestLimits,
        cfg: &DetectionConfig,
        provider: Option<&dyn ReasoningProvider>,
    ) -> Result<FlightRecord, IngestError> {
        let normalized = ingest::normalize(messages, limits)?;
        if normalized.channels.is_empty() {
            return Err(IngestError::NoEssentialTelemetry);
        }
        let summary = summarize(&normalized.channels, cfg, provider);
        Ok(FlightRecord {
            flight_id: uuid::Uuid::new_v4().to_string(),
            channels: normalized.channels,
            total_messages: normalized.total_messages,
            message_types: normalized.message_types.into_iter().collect(),
            skipped_messages: normalized.skipped,
            summary,
        })
    }

    pub fn regenerate_summary(
        &mut self,
        cfg: &DetectionConfig,
        provider: Option<&dyn ReasoningProvider>,
    ) {
        self.summary = summarize(&self.channels, cfg, provider);
    }

    /// Metrics snapshot stored into conversation turn contexts. The
    /// `altitude` key doubles as the marker the cross-flight comparison scans
    /// for.
    pub fn metrics_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "altitude": self.summary.max_altitude,
            "duration": self.summary.duration,
            "max_speed": self.summary.max_speed,
            "anomaly_count": self.summary.anomalies.len(),
        })
    }
}

/// Compute the full flight summary: scalar metrics, heuristic anomalies,
/// pattern digest, then the narrative tier over the digest.
pub fn summarize(
    channels: &ChannelSet,
    cfg: &DetectionConfig,
    provider: Option<&dyn ReasoningProvider>,
) -> FlightSummary {
    let altitude = channels.preferred_altitude_series();

    let duration = match (altitude.first(), altitude.last()) {
        (Some((first, _)), Some((last, _))) => last - first,
        _ => 0.0,
    };

    let max_altitude = altitude
        .iter()
        .map(|(_, alt)| *alt)
        .reduce(f64::max)
        .unwrap_or(0.0);

    // GPS carries no velocity vector in this model; only fused position
    // contributes to speed.
    let max_speed = channels
        .position
        .iter()
        .map(|p| (p.vx * p.vx + p.vy * p.vy + p.vz * p.vz).sqrt())
        .fold(0.0f64, f64::max);

    let battery = channels.preferred_battery_series();
    let battery_usage = match (battery.first(), battery.last()) {
        (Some((_, _, first)), Some((_, _, last))) => first - last,
        _ => 0.0,
    };

    let anomalies = heuristics::detect(channels, cfg);
    let pattern_digest = digest::build(channels);
    let anomaly_analysis = narrative::analyze(&pattern_digest, &anomalies, provider);

    FlightSummary {
        duration,
        max_altitude,
        max_speed,
        battery_usage,
        anomalies,
        pattern_digest,
        anomaly_analysis,
    }
}

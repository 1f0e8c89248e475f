use crate::digest::PatternDigest;
use crate::provider::ReasoningProvider;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LIST_ITEM_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+[.)]|[-*])\s*").unwrap()
});

/// Severity levels ordered by rank; Unknown sorts below Low so "worst seen"
/// comparisons treat an unparsed severity as the least alarming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Normalize a free-text severity line: the highest-ranked keyword present
    /// wins, case-insensitive substring match.
    pub fn from_text(text: &str) -> Severity {
        let lower = text.to_lowercase();
        for (keyword, severity) in [
            ("critical", Severity::Critical),
            ("high", Severity::High),
            ("medium", Severity::Medium),
            ("low", Severity::Low),
        ] {
            if lower.contains(keyword) {
                return severity;
            }
        }
        Severity::Unknown
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured anomaly analysis, identical in shape whether the narrative came
/// from a live provider or the deterministic fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyAnalysis {
    pub anomalies: Vec<String>,
    pub severity: Severity,
    pub summary: String,
    pub recommendations: Vec<String>,
    /// Raw analyzer output, kept for audit.
    pub raw: String,
}

const SYSTEM_PROMPT: &str = "You are an expert UAV flight-log analyst. You are given statistical \
digests of one flight's telemetry channels. Analyze them across five dimensions: GPS quality, \
vibration, battery trend, altitude behavior, and cross-sensor correlation. Reply with exactly four \
sections, each starting at column zero:\n\
ANOMALIES: <comma-separated or numbered findings>\n\
SEVERITY: <one of critical, high, medium, low>\n\
REASONING: <free text>\n\
RECOMMENDATIONS: <comma-separated or numbered actions>";

/// Render the digest as the user half of the provider prompt, one block per
/// analysis dimension.
pub fn build_prompt(digest: &PatternDigest) -> String {
    let mut out = String::from("Telemetry digests for this flight:\n");

    if let Some(gps) = &digest.gps {
        let h = &gps.fix_histogram;
        out.push_str(&format!(
            "\nGPS quality: fix histogram no_fix={} gps_fix={} dgps_fix={} rtk_fix={}",
            h.no_fix, h.gps_fix, h.dgps_fix, h.rtk_fix
        ));
        if let Some(hdop) = &gps.hdop {
            out.push_str(&format!(", hdop {:.2}..{:.2}", hdop.min, hdop.max));
        }
        if let Some(sats) = &gps.num_sats {
            out.push_str(&format!(", satellites {:.0}..{:.0}", sats.min, sats.max));
        }
    } else {
        out.push_str("\nGPS quality: no GPS data");
    }

    match &digest.vibration {
        Some(v) => out.push_str(&format!(
            "\nVibration: x {:.1}..{:.1}, y {:.1}..{:.1}, z {:.1}..{:.1}",
            v.x.min, v.x.max, v.y.min, v.y.max, v.z.min, v.z.max
        )),
        None => out.push_str("\nVibration: no vibration data"),
    }

    match &digest.battery {
        Some(b) => {
            out.push_str(&format!(
                "\nBattery trend: voltage {:.2}..{:.2} V",
                b.voltage.min, b.voltage.max
            ));
            if let Some(c) = &b.current {
                out.push_str(&format!(", current {:.2}..{:.2} A", c.min, c.max));
            }
            let trend: Vec<String> = b.voltage_trend.iter().map(|v| format!("{v:.2}")).collect();
            out.push_str(&format!(", voltage samples [{}]", trend.join(", ")));
        }
        None => out.push_str("\nBattery trend: no battery data"),
    }

    match &digest.altitude {
        Some(a) => {
            let profile: Vec<String> = a.profile.iter().map(|v| format!("{v:.1}")).collect();
            out.push_str(&format!(
                "\nAltitude behavior: range {:.1}..{:.1} m, largest climb step {:+.1} m, largest drop step {:+.1} m, profile [{}]",
                a.range.min, a.range.max, a.largest_climb, a.largest_drop,
                profile.join(", ")
            ));
        }
        None => out.push_str("\nAltitude behavior: no altitude data"),
    }

    out.push_str(
        "\nCross-sensor correlation: consider whether GPS degradation, vibration peaks, \
battery sag and altitude changes line up in time.",
    );
    out
}

/// Parse the four-section analyzer reply. Any reply without a recognizable
/// section degrades to a well-formed record; this function never fails.
pub fn parse_analysis(raw: &str) -> AnomalyAnalysis {
    #[derive(PartialEq, Clone, Copy)]
    enum Section {
        None,
        Anomalies,
        Severity,
        Reasoning,
        Recommendations,
    }

    let mut anomalies = Vec::new();
    let mut severity_text = String::new();
    let mut reasoning = Vec::new();
    let mut recommendations = Vec::new();
    let mut current = Section::None;
    let mut saw_header = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(rest) = strip_header(trimmed, "ANOMALIES:") {
            current = Section::Anomalies;
            saw_header = true;
            push_list_items(&mut anomalies, rest);
            continue;
        }
        if let Some(rest) = strip_header(trimmed, "SEVERITY:") {
            current = Section::Severity;
            saw_header = true;
            severity_text = rest.trim().to_string();
            continue;
        }
        if let Some(rest) = strip_header(trimmed, "REASONING:") {
            current = Section::Reasoning;
            saw_header = true;
            let text = rest.trim();
            if !text.is_empty() {
                reasoning.push(text.to_string());
            }
            continue;
        }
        if let Some(rest) = strip_header(trimmed, "RECOMMENDATIONS:") {
            current = Section::Recommendations;
            saw_header = true;
            push_list_items(&mut recommendations, rest);
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        match current {
            Section::Anomalies => push_list_items(&mut anomalies, trimmed),
            Section::Severity => {
                severity_text.push(' ');
                severity_text.push_str(trimmed);
            }
            Section::Reasoning => reasoning.push(trimmed.to_string()),
            Section::Recommendations => push_list_items(&mut recommendations, trimmed),
            Section::None => {}
        }
    }

    if !saw_header {
        return AnomalyAnalysis {
            anomalies: vec!["Analysis parsing error".to_string()],
            severity: Severity::Unknown,
            summary: raw.to_string(),
            recommendations: Vec::new(),
            raw: raw.to_string(),
        };
    }

    AnomalyAnalysis {
        anomalies,
        severity: Severity::from_text(&severity_text),
        summary: reasoning.join(" "),
        recommendations,
        raw: raw.to_string(),
    }
}

// Case-insensitive header match; headers are ASCII so the byte offset into
// the original line is safe.
fn strip_header<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    let head = line.get(..header.len())?;
    if head.eq_ignore_ascii_case(header) {
        Some(&line[header.len()..])
    } else {
        None
    }
}

// Split a content line into list entries: numbered/bulleted lines are one
// entry each, plain lines split on commas.
fn push_list_items(out: &mut Vec<String>, line: &str) {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("none") {
        return;
    }
    if LIST_ITEM_PREFIX.is_match(line) {
        let item = LIST_ITEM_PREFIX.replace(line, "").trim().to_string();
        if !item.is_empty() {
            out.push(item);
        }
        return;
    }
    for part in line.split(',') {
        let part = part.trim();
        if !part.is_empty() {
            out.push(part.to_string());
        }
    }
}

/// Deterministic narrative synthesized from the digests when no provider is
/// available. It mirrors the heuristic checks and always names an explicit
/// severity keyword, so parsed severity is never Unknown on this path.
pub fn fallback_narrative(digest: &PatternDigest, heuristic_anomalies: &[String]) -> String {
    let mut anomalies: Vec<String> = heuristic_anomalies.to_vec();
    let mut recommendations = Vec::new();

    for finding in heuristic_anomalies {
        if finding.contains("GPS") {
            recommendations.push("Review GPS antenna placement and fly away from obstructions".to_string());
        } else if finding.contains("vibration") {
            recommendations.push("Balance propellers and check motor mounts".to_string());
        } else if finding.contains("battery") {
            recommendations.push("Inspect battery health and verify cell voltages under load".to_string());
        } else if finding.contains("altitude") {
            recommendations.push("Inspect the altitude controller and barometer readings".to_string());
        }
    }

    if let Some(b) = &digest.battery {
        let trend = &b.voltage_trend;
        if trend.len() >= 2 && trend[trend.len() - 1] < trend[0] - 1.0 {
            anomalies.push("Pronounced voltage sag across the flight".to_string());
        }
    }

    let severity = if anomalies.len() >= 3 {
        Severity::High
    } else if !anomalies.is_empty() {
        Severity::Medium
    } else {
        Severity::Low
    };

    // "None" parses back to an empty anomaly list.
    let anomalies_line = if anomalies.is_empty() {
        "None".to_string()
    } else {
        anomalies.join(", ")
    };
    let recommendations_line = if recommendations.is_empty() {
        "Routine post-flight inspection".to_string()
    } else {
        recommendations.join(", ")
    };

    format!(
        "ANOMALIES: {anomalies_line}\n\
SEVERITY: {severity}\n\
REASONING: Deterministic digest review without an external reasoning provider. \
{count} heuristic finding(s) over {channels} populated channel(s).\n\
RECOMMENDATIONS: {recommendations_line}",
        count = heuristic_anomalies.len(),
        channels = digest.counts.len(),
    )
}

/// Run the narrative tier: provider when available, deterministic fallback
/// otherwise, one parser for both. Never returns an error past this boundary.
pub fn analyze(
    digest: &PatternDigest,
    heuristic_anomalies: &[String],
    provider: Option<&dyn ReasoningProvider>,
) -> AnomalyAnalysis {
    let raw = match provider {
        Some(p) => match p.generate(SYSTEM_PROMPT, &build_prompt(digest)) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(provider = p.name(), %err, "narrative provider failed, using fallback");
                fallback_narrative(digest, heuristic_anomalies)
            }
        },
        None => fallback_narrative(digest, heuristic_anomalies),
    };
    parse_analysis(&raw)
}

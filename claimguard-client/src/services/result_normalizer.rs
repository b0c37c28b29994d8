//! Result normalizer
//!
//! Maps the scoring service's loosely-typed JSON onto [`AnalysisResult`].
//! `normalize` is total: any JSON value, including `{}`, `null`, or values of
//! the wrong shape, yields a result by applying defaults:
//!
//! | field                           | default          |
//! |---------------------------------|------------------|
//! | `fraud_analysis.probability`    | 0, clamped 0-100 |
//! | `fraud_analysis.risk_level`     | Unknown          |
//! | `fraud_analysis.summary`        | ""               |
//! | `fraud_analysis.raw_analysis`   | ""               |
//! | `fraud_analysis.key_findings`   | []               |
//! | `fraud_analysis.red_flags`      | []               |
//! | `fraud_analysis.recommendations`| []               |
//! | `claim_details`                 | {}               |
//!
//! When all three sequences are empty but raw model text is present, the
//! sections are recovered from the raw text.

use crate::models::{AnalysisResult, RiskLevel};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Wire shape of a successful response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysisResponse {
    #[serde(deserialize_with = "lenient_fraud_analysis")]
    fraud_analysis: RawFraudAnalysis,
    #[serde(deserialize_with = "lenient_value")]
    claim_details: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFraudAnalysis {
    #[serde(deserialize_with = "lenient_number")]
    probability: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    risk_level: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    summary: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    raw_analysis: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    key_findings: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    red_flags: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    recommendations: Vec<String>,
}

/// Normalize a raw service response. Never fails.
pub fn normalize(raw: &Value) -> AnalysisResult {
    // Non-object top level (array, string, null) decodes as "everything absent"
    let response = if raw.is_object() {
        RawAnalysisResponse::deserialize(raw).unwrap_or_default()
    } else {
        RawAnalysisResponse::default()
    };
    let analysis = response.fraud_analysis;

    let raw_model_output = analysis.raw_analysis.unwrap_or_default();

    let (key_findings, red_flags, recommendations) = if analysis.key_findings.is_empty()
        && analysis.red_flags.is_empty()
        && analysis.recommendations.is_empty()
        && !raw_model_output.trim().is_empty()
    {
        let sections = extract_sections(&raw_model_output);
        debug!(
            key_findings = sections.key_findings.len(),
            red_flags = sections.red_flags.len(),
            recommendations = sections.recommendations.len(),
            "Sections recovered from raw model output"
        );
        (sections.key_findings, sections.red_flags, sections.recommendations)
    } else {
        (analysis.key_findings, analysis.red_flags, analysis.recommendations)
    };

    AnalysisResult {
        probability: clamp_probability(analysis.probability.unwrap_or(0.0)),
        risk_level: analysis
            .risk_level
            .as_deref()
            .map(RiskLevel::from_label)
            .unwrap_or_default(),
        summary: analysis.summary.unwrap_or_default(),
        raw_model_output,
        key_findings,
        red_flags,
        recommendations,
        claim_details: match response.claim_details {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(details) => details,
        },
    }
}

/// Clamp to `[0, 100]`; non-finite values become 0
pub fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 100.0)
    }
}

/// Bullet sections found in free-form model text
#[derive(Debug, Default, PartialEq)]
pub struct ExtractedSections {
    pub key_findings: Vec<String>,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Copy)]
enum Section {
    KeyFindings,
    RedFlags,
    Recommendations,
}

/// Scan model text for "Key Findings", "Red Flags" and "Recommendations"
/// headings and collect the bullet lines (`-`, `*`, `•`) under each.
pub fn extract_sections(text: &str) -> ExtractedSections {
    let mut sections = ExtractedSections::default();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        let line = line.trim();

        if let Some(section) = heading(line) {
            current = Some(section);
        } else if let Some(item) = bullet_text(line) {
            let target = match current {
                Some(Section::KeyFindings) => &mut sections.key_findings,
                Some(Section::RedFlags) => &mut sections.red_flags,
                Some(Section::Recommendations) => &mut sections.recommendations,
                None => continue,
            };
            if !item.is_empty() {
                target.push(item.to_string());
            }
        }
    }

    sections
}

/// A heading line starts with a section name once markdown emphasis,
/// `#` markers and list numbering are stripped. `- ... recommendations`
/// is a bullet, not a heading.
fn heading(line: &str) -> Option<Section> {
    let title = line
        .trim_start_matches(|c: char| {
            c == '#' || c == '*' || c == '.' || c == ')' || c.is_ascii_digit() || c.is_whitespace()
        })
        .to_lowercase();

    if title.starts_with("key findings") {
        Some(Section::KeyFindings)
    } else if title.starts_with("red flags") {
        Some(Section::RedFlags)
    } else if title.starts_with("recommendations") {
        Some(Section::Recommendations)
    } else {
        None
    }
}

fn bullet_text(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('•'))
        .or_else(|| line.strip_prefix('*'))?;
    Some(
        rest.trim_start_matches(|c: char| c == '-' || c == '•' || c == '*' || c.is_whitespace())
            .trim(),
    )
}

// ============================================================================
// Lenient field decoders
//
// Each decoder reads an arbitrary JSON value and maps anything of the wrong
// shape to "absent", so a single bad field cannot fail the whole response.
// ============================================================================

fn lenient_fraud_analysis<'de, D>(deserializer: D) -> Result<RawFraudAnalysis, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(RawFraudAnalysis::default());
    }
    Ok(RawFraudAnalysis::deserialize(&value).unwrap_or_default())
}

fn lenient_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Value::deserialize(deserializer)?))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

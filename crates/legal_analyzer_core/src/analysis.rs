//! crates/legal_analyzer_core/src/analysis.rs
//!
//! The analysis prompt and the trust boundary for vendor output: fenced JSON
//! is cleaned, parsed and validated into an [`AnalysisReport`] exactly once,
//! so nothing downstream has to second-guess field shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Builds the fixed instruction prompt sent with a document for analysis.
pub fn analysis_prompt(document_text: &str) -> String {
    format!(
        "Analyze this legal document and return valid JSON (no markdown) with these keys: \
         summary, documentType, parties, keyTerms, obligations, risks, recommendations, \
         expiryDate, jurisdiction.\n\nDocument:\n{}",
        document_text
    )
}

/// Removes every ```` ```json ```` and ```` ``` ```` marker and trims the rest.
pub fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "").trim().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected a JSON object but the model returned {0}")]
    NotAnObject(&'static str),
}

//=========================================================================================
// Validated Schema
//=========================================================================================

/// A structured list entry, typically a party and what it owes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<String>,
}

impl AnalysisEntry {
    fn is_empty(&self) -> bool {
        self.party.is_none()
            && self.name.is_none()
            && self.role.is_none()
            && self.description.is_none()
            && self.obligations.is_empty()
    }
}

/// One element of a list field in the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisItem {
    Text(String),
    Entry(AnalysisEntry),
}

impl AnalysisItem {
    /// A single-line rendering suitable for terminals and transcripts.
    pub fn display(&self) -> String {
        match self {
            AnalysisItem::Text(text) => text.clone(),
            AnalysisItem::Entry(entry) => {
                let mut out = Vec::new();
                if let Some(party) = &entry.party {
                    out.push(party.to_uppercase());
                }
                if let Some(name) = &entry.name {
                    out.push(name.clone());
                }
                if let Some(role) = &entry.role {
                    out.push(format!("({})", role));
                }
                if let Some(description) = &entry.description {
                    out.push(description.clone());
                }
                if !entry.obligations.is_empty() {
                    out.push(entry.obligations.join("; "));
                }
                out.join(" ")
            }
        }
    }
}

/// The validated view of an analysis. Every field is optional; malformed
/// values degrade to `None` or are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default)]
    pub parties: Vec<AnalysisItem>,
    #[serde(default)]
    pub key_terms: Vec<AnalysisItem>,
    #[serde(default)]
    pub obligations: Vec<AnalysisItem>,
    #[serde(default)]
    pub risks: Vec<AnalysisItem>,
    #[serde(default)]
    pub recommendations: Vec<AnalysisItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

impl AnalysisReport {
    /// Validates an arbitrary JSON value. Only the top-level shape can fail.
    pub fn from_value(value: &Value) -> Result<Self, AnalysisError> {
        let object = value
            .as_object()
            .ok_or_else(|| AnalysisError::NotAnObject(kind_of(value)))?;

        Ok(Self {
            summary: text_field(object.get("summary")),
            document_type: text_field(object.get("documentType")),
            parties: list_field(object.get("parties")),
            key_terms: list_field(object.get("keyTerms")),
            obligations: list_field(object.get("obligations")),
            risks: list_field(object.get("risks")),
            recommendations: list_field(object.get("recommendations")),
            expiry_date: text_field(object.get("expiryDate")),
            jurisdiction: text_field(object.get("jurisdiction")),
        })
    }
}

/// Vendor output after fence stripping, parsing and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    /// The JSON exactly as the model produced it; this is what gets persisted.
    pub raw: Value,
    pub report: AnalysisReport,
}

impl ParsedAnalysis {
    pub fn from_value(raw: Value) -> Result<Self, AnalysisError> {
        let report = AnalysisReport::from_value(&raw)?;
        Ok(Self { raw, report })
    }
}

/// Parses model output, tolerating Markdown code fences around the JSON.
pub fn parse_analysis(content: &str) -> Result<ParsedAnalysis, AnalysisError> {
    let cleaned = strip_code_fences(content);
    let raw: Value = serde_json::from_str(&cleaned)?;
    ParsedAnalysis::from_value(raw)
}

//=========================================================================================
// Field Coercion
//=========================================================================================

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text_field(Some(v))).collect(),
        other => text_field(other).into_iter().collect(),
    }
}

fn list_field(value: Option<&Value>) -> Vec<AnalysisItem> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(item).collect(),
        Some(other) => item(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn item(value: &Value) -> Option<AnalysisItem> {
    match value {
        Value::Object(object) => entry(object),
        other => text_field(Some(other)).map(AnalysisItem::Text),
    }
}

fn entry(object: &Map<String, Value>) -> Option<AnalysisItem> {
    let parsed = AnalysisEntry {
        party: text_field(object.get("party")),
        name: text_field(object.get("name")),
        role: text_field(object.get("role")),
        description: text_field(object.get("description")),
        obligations: text_list(object.get("obligations")),
    };
    if !parsed.is_empty() {
        return Some(AnalysisItem::Entry(parsed));
    }

    // Unrecognised keys: keep the scalar pairs as text rather than lose them.
    let pairs: Vec<String> = object
        .iter()
        .filter_map(|(key, value)| text_field(Some(value)).map(|text| format!("{}: {}", key, text)))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(AnalysisItem::Text(pairs.join("; ")))
    }
}

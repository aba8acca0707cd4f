//! Data models for the report pipeline.
//!
//! This module contains the request, agent result, bundle and response
//! structures shared by the selector, engine, formatter and renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Placeholder text for bundle keys outside the active agent set.
pub const NOT_REQUESTED: &str = "Not requested.";

/// A single report request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub user_id: String,
    /// Free-text label driving agent and template selection.
    pub report_type: String,
    /// Filter term for stored history and focus for chart extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl AnalysisRequest {
    pub fn new(user_id: impl Into<String>, report_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            report_type: report_type.into(),
            keyword: None,
            raw_text: None,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// Keyword with surrounding whitespace removed, `None` when blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Analysis agents that can be switched on per request.
///
/// Document identification is not a tag: it always runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTag {
    Summary,
    Keywords,
    Decision,
    Trends,
    Chart,
    Risks,
    Sentiment,
    Cognitive,
}

impl AgentTag {
    pub const ALL: [AgentTag; 8] = [
        AgentTag::Summary,
        AgentTag::Keywords,
        AgentTag::Decision,
        AgentTag::Trends,
        AgentTag::Chart,
        AgentTag::Risks,
        AgentTag::Sentiment,
        AgentTag::Cognitive,
    ];

    /// Bundle key the tag's result is stored under.
    pub fn result_key(&self) -> &'static str {
        match self {
            AgentTag::Summary => "summary",
            AgentTag::Keywords => "keywords",
            AgentTag::Decision => "decisions",
            AgentTag::Trends => "trends",
            AgentTag::Chart => "chart",
            AgentTag::Risks => "risks",
            AgentTag::Sentiment => "sentiment",
            AgentTag::Cognitive => "cognitive",
        }
    }
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentTag::Summary => "summary",
            AgentTag::Keywords => "keywords",
            AgentTag::Decision => "decision",
            AgentTag::Trends => "trends",
            AgentTag::Chart => "chart",
            AgentTag::Risks => "risks",
            AgentTag::Sentiment => "sentiment",
            AgentTag::Cognitive => "cognitive",
        };
        write!(f, "{}", name)
    }
}

/// The agent tags active for one request. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveAgentSet(BTreeSet<AgentTag>);

impl ActiveAgentSet {
    pub fn new(tags: impl IntoIterator<Item = AgentTag>) -> Self {
        Self(tags.into_iter().collect())
    }

    pub fn contains(&self, tag: AgentTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentTag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ActiveAgentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|t| t.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// A named field inside a structured agent result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
    Texts(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Numbers(ns) => {
                let parts: Vec<String> = ns.iter().map(|n| n.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
            FieldValue::Texts(ts) => write!(f, "{}", ts.join(", ")),
        }
    }
}

/// Output of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentResult {
    Text(String),
    List(Vec<String>),
    Structured(BTreeMap<String, FieldValue>),
    Failure(String),
    /// The key was outside the active set.
    NotRequested,
    /// Requested, but the sub-task's precondition did not hold.
    Skipped(String),
}

impl AgentResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        AgentResult::Failure(reason.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AgentResult::Failure(_))
    }

    /// True for `NotRequested` and `Skipped`.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, AgentResult::NotRequested | AgentResult::Skipped(_))
    }

    /// True when the result carries analysis content.
    pub fn is_usable(&self) -> bool {
        match self {
            AgentResult::Text(s) => !s.trim().is_empty(),
            AgentResult::List(items) => !items.is_empty(),
            AgentResult::Structured(fields) => !fields.is_empty(),
            _ => false,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        match self {
            AgentResult::Structured(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Plain-text rendering used in prompts and responses.
    pub fn to_text(&self) -> String {
        match self {
            AgentResult::Text(s) => s.clone(),
            AgentResult::List(items) => items.join("\n"),
            AgentResult::Structured(fields) => fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("\n"),
            AgentResult::Failure(reason) => format!("Analysis unavailable ({})", reason),
            AgentResult::NotRequested => NOT_REQUESTED.to_string(),
            AgentResult::Skipped(reason) => format!("Skipped: {}", reason),
        }
    }
}

/// Structured chart data extracted from a context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl ChartData {
    /// Pull `labels`/`values` out of a structured result. `None` when the
    /// result has no non-empty `values` field.
    pub fn from_result(result: &AgentResult) -> Option<Self> {
        let values = match result.field("values")? {
            FieldValue::Numbers(values) if !values.is_empty() => values.clone(),
            FieldValue::Number(n) => vec![*n],
            _ => return None,
        };
        let labels = match result.field("labels") {
            Some(FieldValue::Texts(labels)) => labels.clone(),
            Some(FieldValue::Text(label)) => vec![label.clone()],
            _ => Vec::new(),
        };
        Some(Self { labels, values })
    }

    /// Label for the value at `index`, synthesized when labels run short.
    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Item {}", index + 1))
    }
}

/// Per-request aggregate of agent results.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBundle {
    results: BTreeMap<String, AgentResult>,
    /// Document type label from the identification task.
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_artifact: Option<PathBuf>,
}

impl Default for ReportBundle {
    fn default() -> Self {
        Self {
            results: BTreeMap::new(),
            identity: "Document".to_string(),
            chart_artifact: None,
        }
    }
}

impl ReportBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, result: AgentResult) {
        self.results.insert(key.into(), result);
    }

    pub fn get(&self, key: &str) -> Option<&AgentResult> {
        self.results.get(key)
    }

    /// Text for `key`, or the not-requested placeholder when absent.
    pub fn text(&self, key: &str) -> String {
        self.results
            .get(key)
            .map(AgentResult::to_text)
            .unwrap_or_else(|| NOT_REQUESTED.to_string())
    }

    /// Fill every tag key that has no result yet with `NotRequested`.
    pub fn fill_missing(&mut self) {
        for tag in AgentTag::ALL {
            self.results
                .entry(tag.result_key().to_string())
                .or_insert(AgentResult::NotRequested);
        }
    }

    pub fn failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_failure())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A stored OCR record, as persisted by the upload service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub user_id: String,
    #[serde(default)]
    pub extracted_text: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Per-request pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    ContextAssembled,
    AgentsDispatched,
    AgentsDrained,
    Formatted,
    Rendered,
    Responded,
    /// No usable context; reachable only from `Received`.
    Rejected,
    /// Rendering collaborator failed after formatting.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::ContextAssembled => "context_assembled",
            PipelineStage::AgentsDispatched => "agents_dispatched",
            PipelineStage::AgentsDrained => "agents_drained",
            PipelineStage::Formatted => "formatted",
            PipelineStage::Rendered => "rendered",
            PipelineStage::Responded => "responded",
            PipelineStage::Rejected => "rejected",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Response returned for every request, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub report: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub trends: Vec<String>,
    pub decisions: String,
    pub risks: String,
    pub sentiment: String,
    pub cognitive: String,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ReportResponse {
    /// A failed response carrying only the error.
    pub fn failed(stage: PipelineStage, error: impl Into<String>) -> Self {
        Self {
            success: false,
            report: String::new(),
            summary: String::new(),
            keywords: Vec::new(),
            trends: Vec::new(),
            decisions: String::new(),
            risks: String::new(),
            sentiment: String::new(),
            cognitive: String::new(),
            identity: String::new(),
            chart_path: None,
            related_topics: Vec::new(),
            download_link: None,
            template: None,
            stage,
            error: Some(error.into()),
            generated_at: Utc::now(),
        }
    }
}

/// List-shaped bundle entry for the response; placeholders become one line.
pub fn list_or_placeholder(result: Option<&AgentResult>) -> Vec<String> {
    match result {
        Some(AgentResult::List(items)) => items.clone(),
        Some(other) => vec![other.to_text()],
        None => vec![NOT_REQUESTED.to_string()],
    }
}

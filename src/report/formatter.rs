//! Report formatting.
//!
//! Merges a finished [`ReportBundle`] into the final narrative, either through
//! the generic formatting prompt or one of the specialized templates.

use crate::agent::prompts::{self, fill};
use crate::llm::LanguageModel;
use crate::models::{AgentResult, ReportBundle};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Narrative returned when neither the model nor the summary yields text.
pub const EMPTY_REPORT_PLACEHOLDER: &str =
    "Report could not be generated: the formatting model failed and no summary is available.";

/// Formatter template, chosen once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatTemplate {
    CriminalProfile,
    LegalCase,
    Interrogation,
    CustodyMovement,
    GangNetwork,
    CourtReady,
    Generic,
}

/// Ordered selection table; the first matching row wins.
const TEMPLATE_TABLE: &[(&[&str], FormatTemplate)] = &[
    (&["profile", "criminal"], FormatTemplate::CriminalProfile),
    (&["fir", "case"], FormatTemplate::LegalCase),
    (&["interrogation"], FormatTemplate::Interrogation),
    (&["custody"], FormatTemplate::CustodyMovement),
    (&["gang"], FormatTemplate::GangNetwork),
    (&["court"], FormatTemplate::CourtReady),
];

impl FormatTemplate {
    pub fn id(&self) -> &'static str {
        match self {
            FormatTemplate::CriminalProfile => "criminal_profile",
            FormatTemplate::LegalCase => "legal_case",
            FormatTemplate::Interrogation => "interrogation",
            FormatTemplate::CustodyMovement => "custody_movement",
            FormatTemplate::GangNetwork => "gang_network",
            FormatTemplate::CourtReady => "court_ready",
            FormatTemplate::Generic => "generic",
        }
    }

    pub fn is_specialized(&self) -> bool {
        !matches!(self, FormatTemplate::Generic)
    }

    fn prompt(&self) -> &'static str {
        match self {
            FormatTemplate::CriminalProfile => prompts::CRIMINAL_PROFILE,
            FormatTemplate::LegalCase => prompts::LEGAL_CASE,
            FormatTemplate::Interrogation => prompts::INTERROGATION,
            FormatTemplate::CustodyMovement => prompts::CUSTODY_MOVEMENT,
            FormatTemplate::GangNetwork => prompts::GANG_NETWORK,
            FormatTemplate::CourtReady => prompts::COURT_READY,
            FormatTemplate::Generic => prompts::GENERIC_REPORT,
        }
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Pick the formatter template for a report type (case-insensitive).
pub fn select_template(report_type: &str) -> FormatTemplate {
    let report_type = report_type.to_lowercase();
    TEMPLATE_TABLE
        .iter()
        .find(|(triggers, _)| triggers.iter().any(|t| report_type.contains(t)))
        .map(|(_, template)| *template)
        .unwrap_or(FormatTemplate::Generic)
}

/// Produces the final narrative. Never fails.
pub struct Formatter {
    model: Arc<dyn LanguageModel>,
}

impl Formatter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Format `bundle` with the template selected for `report_type`.
    pub async fn format(&self, bundle: &ReportBundle, report_type: &str, context: &str) -> String {
        self.format_with(select_template(report_type), bundle, report_type, context)
            .await
    }

    /// Format `bundle` with an already selected template.
    pub async fn format_with(
        &self,
        template: FormatTemplate,
        bundle: &ReportBundle,
        report_type: &str,
        context: &str,
    ) -> String {
        let prompt = build_prompt(template, bundle, report_type, context);
        debug!(template = %template, prompt_len = prompt.len(), "Formatting report");

        match self.model.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Formatter returned empty output, falling back to summary");
                fallback_narrative(bundle)
            }
            Err(e) => {
                warn!("Formatter failed ({}), falling back to summary", e);
                fallback_narrative(bundle)
            }
        }
    }
}

fn build_prompt(
    template: FormatTemplate,
    bundle: &ReportBundle,
    report_type: &str,
    context: &str,
) -> String {
    if template.is_specialized() {
        let risks = bundle.text("risks");
        let sentiment = bundle.text("sentiment");
        return fill(
            template.prompt(),
            &[
                ("context", context),
                ("risks", risks.as_str()),
                ("sentiment", sentiment.as_str()),
            ],
        );
    }

    let summary = bundle.text("summary");
    let keywords = joined(bundle.get("keywords"), ", ");
    let trends = joined(bundle.get("trends"), "; ");
    let decisions = bundle.text("decisions");
    fill(
        template.prompt(),
        &[
            ("report_type", report_type),
            ("identity", bundle.identity.as_str()),
            ("summary", summary.as_str()),
            ("keywords", keywords.as_str()),
            ("trends", trends.as_str()),
            ("decisions", decisions.as_str()),
        ],
    )
}

fn joined(result: Option<&AgentResult>, separator: &str) -> String {
    match result {
        Some(AgentResult::List(items)) => items.join(separator),
        Some(other) => other.to_text(),
        None => crate::models::NOT_REQUESTED.to_string(),
    }
}

/// Raw summary text, or a placeholder when the summary is unusable.
fn fallback_narrative(bundle: &ReportBundle) -> String {
    match bundle.get("summary") {
        Some(summary) if summary.is_usable() => summary.to_text(),
        _ => EMPTY_REPORT_PLACEHOLDER.to_string(),
    }
}

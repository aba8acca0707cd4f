//! Artifact rendering.
//!
//! The pipeline hands finished narratives to a [`DocumentRenderer`] and chart
//! data to a [`ChartRenderer`]. The shipped implementations write Markdown
//! files into an output directory.

use crate::error::RenderError;
use crate::models::{AgentResult, ChartData, ReportBundle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Width of the longest bar in a rendered chart.
const BAR_WIDTH: usize = 40;

/// Maximum length of the `{user}_{keyword}` part of artifact names.
const STEM_PREFIX_CHARS: usize = 15;

/// Turns chart data into an artifact.
pub trait ChartRenderer: Send + Sync {
    fn render_chart(&self, chart: &ChartData, title: &str, stem: &str)
        -> Result<PathBuf, RenderError>;
}

/// Turns a formatted report into an artifact.
pub trait DocumentRenderer: Send + Sync {
    fn render_document(&self, document: &RenderDocument) -> Result<PathBuf, RenderError>;
}

/// Document layout chosen from the report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTemplate {
    Security,
    Technical,
    Finance,
    Corporate,
    MasterCriminalProfile,
    FirCase,
    Interrogation,
    Custody,
    GangNetwork,
    CourtReady,
}

impl RenderTemplate {
    /// Select the layout for a report type.
    ///
    /// Substring rules are checked first, then exact law-enforcement labels;
    /// anything else gets the corporate layout.
    pub fn for_report_type(report_type: &str) -> Self {
        let report_type = report_type.to_lowercase();

        if report_type.contains("security") {
            RenderTemplate::Security
        } else if report_type.contains("technical") || report_type.contains("deep dive") {
            RenderTemplate::Technical
        } else if report_type.contains("market") {
            RenderTemplate::Finance
        } else if report_type.contains("executive") {
            RenderTemplate::Corporate
        } else {
            match report_type.as_str() {
                "master_criminal_profile" => RenderTemplate::MasterCriminalProfile,
                "fir_case_analysis" => RenderTemplate::FirCase,
                "interrogation_intelligence" => RenderTemplate::Interrogation,
                "custody_movement" => RenderTemplate::Custody,
                "gang_network" => RenderTemplate::GangNetwork,
                "court_ready_summary" => RenderTemplate::CourtReady,
                _ => RenderTemplate::Corporate,
            }
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            RenderTemplate::Security => "security",
            RenderTemplate::Technical => "technical",
            RenderTemplate::Finance => "finance",
            RenderTemplate::Corporate => "corporate",
            RenderTemplate::MasterCriminalProfile => "master_profile",
            RenderTemplate::FirCase => "fir_case",
            RenderTemplate::Interrogation => "interrogation",
            RenderTemplate::Custody => "custody",
            RenderTemplate::GangNetwork => "gang_network",
            RenderTemplate::CourtReady => "court_ready",
        }
    }

    /// Appendix sections rendered after the narrative, as (heading, field).
    fn sections(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            RenderTemplate::Security => &[
                ("Threat Summary", "summary"),
                ("Risk Assessment", "risk"),
                ("Remediation", "decisions"),
                ("Indicators", "keywords"),
            ],
            RenderTemplate::Technical => &[
                ("Overview", "summary"),
                ("Key Concepts", "keywords"),
                ("Observed Patterns", "trends"),
                ("Recommendations", "decisions"),
            ],
            RenderTemplate::Finance => &[
                ("Market Overview", "summary"),
                ("Trends", "trends"),
                ("Risk Factors", "risk"),
                ("Key Terms", "keywords"),
                ("Decisions", "decisions"),
            ],
            RenderTemplate::Corporate => &[
                ("Summary", "summary"),
                ("Keywords", "keywords"),
                ("Trends", "trends"),
                ("Risks", "risk"),
                ("Sentiment", "sentiment"),
                ("Decisions", "decisions"),
            ],
            RenderTemplate::MasterCriminalProfile => &[
                ("Identity", "identity"),
                ("Record Summary", "summary"),
                ("Risk Assessment", "risk"),
                ("Behavioral Indicators", "cognitive"),
            ],
            RenderTemplate::FirCase => &[
                ("Case Overview", "summary"),
                ("Timeline", "timeline"),
                ("Risk Assessment", "risk"),
                ("Next Steps", "decisions"),
            ],
            RenderTemplate::Interrogation => &[
                ("Statement Summary", "summary"),
                ("Sentiment", "sentiment"),
                ("Cognitive Assessment", "cognitive"),
                ("Leads", "keywords"),
            ],
            RenderTemplate::Custody => &[
                ("Subject Overview", "summary"),
                ("Risk Assessment", "risk"),
                ("Flagged Terms", "keywords"),
            ],
            RenderTemplate::GangNetwork => &[
                ("Network Overview", "summary"),
                ("Key Individuals and Terms", "keywords"),
                ("Risk Assessment", "risk"),
            ],
            RenderTemplate::CourtReady => &[
                ("Case Summary", "summary"),
                ("Timeline", "timeline"),
                ("Observations", "risk"),
            ],
        }
    }
}

impl fmt::Display for RenderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Subtitle shown under the report title.
pub fn subtitle(report_type: &str) -> &'static str {
    let report_type = report_type.to_lowercase();
    if report_type.contains("criminal") || report_type.contains("investigation") {
        "Forensic Investigation Log"
    } else if report_type.contains("interrogation") || report_type.contains("interview") {
        "Subject Interview Analysis"
    } else {
        "Strategic Analysis"
    }
}

/// Field names handed to the document renderer.
pub const FIELD_NAMES: [&str; 11] = [
    "title",
    "executive_summary",
    "summary",
    "identity",
    "risk",
    "sentiment",
    "cognitive",
    "keywords",
    "trends",
    "decisions",
    "timeline",
];

/// Build the field mapping from a bundle. Placeholders and failures map to
/// empty strings.
pub fn field_mapping(bundle: &ReportBundle, report_type: &str) -> BTreeMap<String, String> {
    let usable = |key: &str| -> String {
        match bundle.get(key) {
            Some(AgentResult::List(items)) => items
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n"),
            Some(result) if result.is_usable() => result.to_text(),
            _ => String::new(),
        }
    };

    let summary = usable("summary");
    let executive_summary = summary
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut fields = BTreeMap::new();
    for name in FIELD_NAMES {
        let value = match name {
            "title" => title_case(report_type),
            "executive_summary" => executive_summary.clone(),
            "summary" => summary.clone(),
            "identity" => bundle.identity.clone(),
            "risk" => usable("risks"),
            "timeline" => String::new(),
            other => usable(other),
        };
        fields.insert(name.to_string(), value);
    }
    fields
}

fn title_case(text: &str) -> String {
    let title = text
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");

    if title.is_empty() {
        "Analysis Report".to_string()
    } else {
        title
    }
}

/// Base file name for a request's artifacts.
///
/// `{user}_{keyword or "report"}` cut to a short prefix, made filesystem
/// safe, then suffixed with the generation timestamp.
pub fn artifact_stem(user_id: &str, keyword: Option<&str>, at: DateTime<Utc>) -> String {
    let prefix: String = format!("{}_{}", user_id, keyword.unwrap_or("report"))
        .chars()
        .take(STEM_PREFIX_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}_{}", prefix, at.format("%Y%m%d%H%M%S"))
}

/// Everything the document renderer needs for one report.
#[derive(Debug, Clone)]
pub struct RenderDocument {
    pub template: RenderTemplate,
    pub report_type: String,
    pub subtitle: String,
    pub narrative: String,
    pub fields: BTreeMap<String, String>,
    pub chart_path: Option<PathBuf>,
    pub stem: String,
    pub generated_at: DateTime<Utc>,
}

impl RenderDocument {
    pub fn new(
        bundle: &ReportBundle,
        report_type: &str,
        narrative: impl Into<String>,
        stem: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            template: RenderTemplate::for_report_type(report_type),
            report_type: report_type.to_string(),
            subtitle: subtitle(report_type).to_string(),
            narrative: narrative.into(),
            fields: field_mapping(bundle, report_type),
            chart_path: bundle.chart_artifact.clone(),
            stem: stem.into(),
            generated_at,
        }
    }

    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

fn write_artifact(path: &Path, content: &str) -> Result<(), RenderError> {
    let to_error = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, content).map_err(to_error)
}

/// Writes Markdown report documents.
pub struct MarkdownDocumentRenderer {
    output_dir: PathBuf,
}

impl MarkdownDocumentRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl DocumentRenderer for MarkdownDocumentRenderer {
    fn render_document(&self, document: &RenderDocument) -> Result<PathBuf, RenderError> {
        let path = self.output_dir.join(format!("{}.md", document.stem));
        write_artifact(&path, &generate_markdown_document(document))?;
        debug!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Render a complete Markdown document.
pub fn generate_markdown_document(document: &RenderDocument) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", document.field("title")));
    output.push_str(&format!("*{}*\n\n", document.subtitle));

    output.push_str(&generate_metadata_section(document));
    output.push_str(&generate_narrative_section(&document.narrative));
    output.push_str(&generate_appendix(document));

    if let Some(ref chart) = document.chart_path {
        output.push_str("## Chart\n\n");
        output.push_str(&format!("See [{}]({}).\n\n", chart.display(), chart.display()));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(document: &RenderDocument) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Reference:** {}\n", document.stem));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        document.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    section.push_str(&format!("- **Document Type:** {}\n", document.field("identity")));
    section.push_str(&format!("- **Layout:** {}\n", document.template));
    section.push('\n');

    section
}

fn generate_narrative_section(narrative: &str) -> String {
    let mut section = String::new();

    section.push_str("## Report\n\n");
    section.push_str(narrative.trim());
    section.push_str("\n\n");

    section
}

/// Supporting analysis, only for fields that carry content.
fn generate_appendix(document: &RenderDocument) -> String {
    let filled: Vec<(&str, &str)> = document
        .template
        .sections()
        .iter()
        .map(|(heading, field)| (*heading, document.field(field)))
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();

    if filled.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Supporting Analysis\n\n");
    for (heading, value) in filled {
        section.push_str(&format!("### {}\n\n{}\n\n", heading, value.trim()));
    }
    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by reportsmith*\n".to_string()
}

/// Writes Markdown bar charts.
pub struct MarkdownChartRenderer {
    output_dir: PathBuf,
}

impl MarkdownChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ChartRenderer for MarkdownChartRenderer {
    fn render_chart(
        &self,
        chart: &ChartData,
        title: &str,
        stem: &str,
    ) -> Result<PathBuf, RenderError> {
        let content = generate_bar_chart(chart, title)?;
        let path = self.output_dir.join(format!("{}_chart.md", stem));
        write_artifact(&path, &content)?;
        debug!("Chart written to {}", path.display());
        Ok(path)
    }
}

/// Render chart data as a Markdown table with text bars.
pub fn generate_bar_chart(chart: &ChartData, title: &str) -> Result<String, RenderError> {
    if chart.values.is_empty() {
        return Err(RenderError::EmptyChart);
    }

    let max = chart
        .values
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", title));
    output.push_str("| Label | Value | |\n|---|---:|---|\n");

    for (i, value) in chart.values.iter().enumerate() {
        let width = if max > 0.0 {
            ((value.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            chart.label(i),
            value,
            "#".repeat(width)
        ));
    }

    Ok(output)
}

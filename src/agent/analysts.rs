//! Model-backed agent implementations.

use crate::agent::prompts::{self, fill};
use crate::agent::Agent;
use crate::llm::{strip_code_fence, LanguageModel};
use crate::models::{AgentResult, ChartData, FieldValue};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a [`PromptAgent`] turns model text into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Text,
    /// One item per line or comma, deduplicated, capped at the given count.
    List(usize),
}

/// An agent made of one prompt template and one output shape.
pub struct PromptAgent {
    name: String,
    template: &'static str,
    shape: ResultShape,
    /// Characters of context handed to the model; `None` for all of it.
    context_limit: Option<usize>,
    model: Arc<dyn LanguageModel>,
}

impl PromptAgent {
    pub fn new(
        name: impl Into<String>,
        template: &'static str,
        shape: ResultShape,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            shape,
            context_limit: None,
            model,
        }
    }

    pub fn with_context_limit(mut self, chars: usize) -> Self {
        self.context_limit = Some(chars);
        self
    }

    pub fn summarizer(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("summarizer", prompts::SUMMARY, ResultShape::Text, model)
    }

    pub fn keyword_extractor(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("keywords", prompts::KEYWORDS, ResultShape::List(15), model)
    }

    pub fn decision_extractor(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("decisions", prompts::DECISIONS, ResultShape::Text, model)
    }

    pub fn trend_analyzer(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("trends", prompts::TRENDS, ResultShape::List(10), model)
    }

    pub fn risk_analyzer(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("risks", prompts::RISKS, ResultShape::Text, model)
    }

    pub fn cognitive_analyzer(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("cognitive", prompts::COGNITIVE, ResultShape::Text, model)
    }

    pub fn document_identifier(model: Arc<dyn LanguageModel>, context_chars: usize) -> Self {
        Self::new("identity", prompts::IDENTIFY, ResultShape::Text, model)
            .with_context_limit(context_chars)
    }

    pub fn related_topics(model: Arc<dyn LanguageModel>) -> Self {
        Self::new("related", prompts::RELATED_TOPICS, ResultShape::List(5), model)
    }
}

#[async_trait]
impl Agent for PromptAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &str, focus: Option<&str>) -> AgentResult {
        let context = match self.context_limit {
            Some(limit) => truncate_chars(context, limit),
            None => context,
        };
        let prompt = fill(
            self.template,
            &[("context", context), ("focus", focus.unwrap_or("Metrics"))],
        );

        let text = match self.model.generate(&prompt).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("{} agent got an empty reply", self.name);
                return AgentResult::failure(EMPTY_OUTPUT);
            }
            Ok(text) => text,
            Err(e) => {
                warn!("{} agent failed: {}", self.name, e);
                return AgentResult::failure(e.to_string());
            }
        };

        match self.shape {
            ResultShape::Text => AgentResult::Text(text),
            ResultShape::List(max) => {
                let items = parse_list(&text, max);
                if items.is_empty() {
                    AgentResult::failure("model returned no list items")
                } else {
                    AgentResult::List(items)
                }
            }
        }
    }
}

/// Extracts `{labels, values}` chart data as a structured result.
pub struct ChartDataAgent {
    model: Arc<dyn LanguageModel>,
}

impl ChartDataAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Agent for ChartDataAgent {
    fn name(&self) -> &str {
        "chart"
    }

    async fn run(&self, context: &str, focus: Option<&str>) -> AgentResult {
        let prompt = fill(
            prompts::CHART_DATA,
            &[("context", context), ("focus", focus.unwrap_or("Metrics"))],
        );

        match self.model.generate(&prompt).await {
            Ok(text) => match parse_chart_data(&text) {
                Some(chart) => chart_to_result(chart),
                None => AgentResult::failure("chart data was not valid JSON"),
            },
            Err(e) => {
                warn!("chart agent failed: {}", e);
                AgentResult::failure(e.to_string())
            }
        }
    }
}

const EMPTY_OUTPUT: &str = "model returned empty output";

/// Lexicon polarity score plus a model explanation.
pub struct SentimentAgent {
    model: Arc<dyn LanguageModel>,
}

impl SentimentAgent {
    /// Characters of context the explanation prompt sees.
    const EXPLAIN_CHARS: usize = 1500;

    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Agent for SentimentAgent {
    fn name(&self) -> &str {
        "sentiment"
    }

    async fn run(&self, context: &str, _focus: Option<&str>) -> AgentResult {
        let score = polarity(context);
        let label = sentiment_label(score);
        let score_text = format!("{:.2}", score);

        let prompt = fill(
            prompts::SENTIMENT,
            &[
                ("context", truncate_chars(context, Self::EXPLAIN_CHARS)),
                ("score", score_text.as_str()),
                ("label", label),
            ],
        );

        match self.model.generate(&prompt).await {
            Ok(analysis) if analysis.trim().is_empty() => {
                warn!("sentiment agent got an empty reply");
                AgentResult::failure(EMPTY_OUTPUT)
            }
            Ok(analysis) => {
                let mut fields = BTreeMap::new();
                fields.insert("score".to_string(), FieldValue::Number(score));
                fields.insert("label".to_string(), FieldValue::Text(label.to_string()));
                fields.insert("analysis".to_string(), FieldValue::Text(analysis));
                AgentResult::Structured(fields)
            }
            Err(e) => {
                warn!("sentiment agent failed: {}", e);
                AgentResult::failure(e.to_string())
            }
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Split model output into clean list items.
///
/// One item per line; a single line is split on commas instead. Bullet and
/// numbering prefixes are removed and duplicates dropped (case-insensitive).
pub fn parse_list(text: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let raw: Vec<&str> = if lines.len() == 1 {
        lines[0].split(',').collect()
    } else {
        lines
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for item in raw {
        let cleaned = strip_list_marker(item)
            .trim_matches(|c: char| c == '*' || c == '"' || c.is_whitespace())
            .to_string();
        if cleaned.is_empty() || cleaned.ends_with(':') {
            continue;
        }
        if seen.insert(cleaned.to_lowercase()) {
            items.push(cleaned);
        }
        if items.len() >= max {
            break;
        }
    }
    items
}

fn strip_list_marker(item: &str) -> &str {
    let item = item.trim();
    for bullet in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = item.strip_prefix(bullet) {
            return rest;
        }
    }

    let digits = item.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &item[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest;
        }
    }
    item
}

/// Parse `{labels, values}` JSON out of model output.
pub fn parse_chart_data(text: &str) -> Option<ChartData> {
    let body = strip_code_fence(text);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }

    let mut chart: ChartData = match serde_json::from_str(&body[start..=end]) {
        Ok(chart) => chart,
        Err(e) => {
            debug!("Chart JSON rejected: {}", e);
            return None;
        }
    };
    chart.values.retain(|v| v.is_finite());
    Some(chart)
}

fn chart_to_result(chart: ChartData) -> AgentResult {
    let mut fields = BTreeMap::new();
    fields.insert("labels".to_string(), FieldValue::Texts(chart.labels));
    fields.insert("values".to_string(), FieldValue::Numbers(chart.values));
    AgentResult::Structured(fields)
}

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "positive", "growth", "grew", "gain", "gains", "improved",
    "improvement", "success", "successful", "profit", "profitable", "strong", "increase",
    "benefit", "cooperative", "calm", "confident", "resolved", "approved", "satisfied",
    "happy", "stable", "compliant", "record",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "loss", "losses", "decline", "declined", "negative", "risk", "fraud",
    "failure", "failed", "weak", "decrease", "penalty", "violation", "threat", "angry",
    "hostile", "deceptive", "denied", "crime", "criminal", "assault", "theft", "breach",
    "delay", "unpaid", "suspicious", "nervous",
];

/// Lexicon polarity in [-1, 1]: (positive - negative) / matched words.
pub fn polarity(text: &str) -> f64 {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if POSITIVE_WORDS.contains(&word.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            negative += 1;
        }
    }

    let matched = positive + negative;
    if matched == 0 {
        return 0.0;
    }
    let score = (positive as f64 - negative as f64) / matched as f64;
    (score * 100.0).round() / 100.0
}

pub fn sentiment_label(score: f64) -> &'static str {
    if score > 0.1 {
        "Positive"
    } else if score < -0.1 {
        "Negative"
    } else {
        "Neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with a fixed answer and records the prompts it saw.
    struct CannedModel {
        reply: Result<String, LlmError>,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl CannedModel {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(error: LlmError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_text_agent() {
        let model = CannedModel::ok("A short summary.");
        let agent = PromptAgent::summarizer(model.clone());
        let result = agent.run("Revenue grew 20% in Q3.", None).await;
        assert_eq!(result, AgentResult::Text("A short summary.".into()));
        assert!(model.prompts.lock().unwrap()[0].contains("Revenue grew 20% in Q3."));
    }

    #[tokio::test]
    async fn test_agent_failure_is_captured() {
        let model = CannedModel::err(LlmError::Timeout(30));
        let agent = PromptAgent::risk_analyzer(model);
        let result = agent.run("context", None).await;
        assert_eq!(result, AgentResult::Failure("Request timed out after 30s".into()));
    }

    #[tokio::test]
    async fn test_empty_reply_is_failure() {
        for reply in ["", "  \n "] {
            let summary = PromptAgent::summarizer(CannedModel::ok(reply))
                .run("Revenue grew 20% in Q3.", None)
                .await;
            assert_eq!(summary, AgentResult::Failure(EMPTY_OUTPUT.into()));

            let sentiment = SentimentAgent::new(CannedModel::ok(reply))
                .run("Strong growth and record profit.", None)
                .await;
            assert!(sentiment.is_failure());
        }
    }

    #[tokio::test]
    async fn test_placeholder_in_document_reaches_model() {
        let model = CannedModel::ok("Summary.");
        let agent = PromptAgent::summarizer(model.clone());
        agent
            .run("Template var {focus} appears in the source code listing.", None)
            .await;

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.ends_with("Template var {focus} appears in the source code listing."));
    }

    #[tokio::test]
    async fn test_keyword_list_agent() {
        let model = CannedModel::ok("revenue, Q3, growth, Revenue, margin");
        let agent = PromptAgent::keyword_extractor(model);
        let result = agent.run("context", None).await;
        assert_eq!(
            result,
            AgentResult::List(vec![
                "revenue".into(),
                "Q3".into(),
                "growth".into(),
                "margin".into()
            ])
        );
    }

    #[tokio::test]
    async fn test_identifier_sees_truncated_context() {
        let model = CannedModel::ok("Quarterly report");
        let agent = PromptAgent::document_identifier(model.clone(), 10);
        agent.run("0123456789ABCDEFGHIJ", None).await;
        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("0123456789"));
        assert!(!prompt.contains("ABCDEFGHIJ"));
    }

    #[tokio::test]
    async fn test_chart_agent_parses_json() {
        let model = CannedModel::ok("```json\n{\"labels\": [\"Q1\", \"Q2\"], \"values\": [5, 7.5]}\n```");
        let agent = ChartDataAgent::new(model.clone());
        let result = agent.run("context", Some("Revenue")).await;

        let chart = ChartData::from_result(&result).unwrap();
        assert_eq!(chart.labels, vec!["Q1", "Q2"]);
        assert_eq!(chart.values, vec![5.0, 7.5]);
        assert!(model.prompts.lock().unwrap()[0].contains("\"Revenue\""));
    }

    #[tokio::test]
    async fn test_chart_agent_rejects_prose() {
        let model = CannedModel::ok("There is no numeric data here.");
        let agent = ChartDataAgent::new(model);
        assert!(agent.run("context", None).await.is_failure());
    }

    #[tokio::test]
    async fn test_sentiment_agent_structured() {
        let model = CannedModel::ok("The tone is upbeat.");
        let agent = SentimentAgent::new(model.clone());
        let result = agent
            .run("Strong growth and record profit despite one delay.", None)
            .await;

        assert_eq!(
            result.field("label"),
            Some(&FieldValue::Text("Positive".into()))
        );
        assert_eq!(
            result.field("analysis"),
            Some(&FieldValue::Text("The tone is upbeat.".into()))
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_list_bullets_and_numbers() {
        let text = "Trends:\n- Revenue up 20%\n* Costs flat\n1. Hiring slowed\n2) Churn fell\n- Revenue up 20%";
        assert_eq!(
            parse_list(text, 10),
            vec!["Revenue up 20%", "Costs flat", "Hiring slowed", "Churn fell"]
        );
        assert_eq!(parse_list(text, 2).len(), 2);
        assert!(parse_list("   \n  ", 5).is_empty());
    }

    #[test]
    fn test_polarity() {
        assert_eq!(polarity("growth success profit"), 1.0);
        assert_eq!(polarity("fraud and theft"), -1.0);
        assert_eq!(polarity("the meeting was on tuesday"), 0.0);
        assert_eq!(sentiment_label(0.5), "Positive");
        assert_eq!(sentiment_label(-0.5), "Negative");
        assert_eq!(sentiment_label(0.05), "Neutral");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}

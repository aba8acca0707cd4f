//! Request pipeline.
//!
//! Drives one request through context assembly, agent selection, parallel
//! execution, formatting and rendering, and turns the outcome into a
//! [`ReportResponse`]. Every failure ends up in the response; `run` never
//! returns an error.

use crate::agent::AgentRegistry;
use crate::analysis::engine::DEFAULT_CHART_FOCUS;
use crate::analysis::{select, ContextAssembler, ExecutionEngine};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::llm::LanguageModel;
use crate::models::{
    list_or_placeholder, ActiveAgentSet, AnalysisRequest, ChartData, PipelineStage,
    ReportBundle, ReportResponse,
};
use crate::report::renderer::subtitle;
use crate::report::{
    artifact_stem, select_template, ChartRenderer, DocumentRenderer, FormatTemplate, Formatter,
    RenderDocument, RenderTemplate,
};
use crate::store::RecordStore;
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const REQUEST_PANICKED: &str = "internal error while processing the request";

/// Tracks the per-request state machine.
struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("Stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn current(&self) -> PipelineStage {
        self.stage
    }
}

/// What a request would do, computed without calling the model.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub user_id: String,
    pub report_type: String,
    pub context_chars: usize,
    pub context_preview: String,
    pub agents: ActiveAgentSet,
    pub chart_eligible: bool,
    pub format_template: FormatTemplate,
    pub render_template: RenderTemplate,
    pub subtitle: String,
}

/// The orchestrator, with every collaborator injected.
pub struct ReportPipeline {
    assembler: ContextAssembler,
    engine: ExecutionEngine,
    formatter: Formatter,
    chart_renderer: Arc<dyn ChartRenderer>,
    document_renderer: Arc<dyn DocumentRenderer>,
}

impl ReportPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: AgentRegistry,
        formatter_model: Arc<dyn LanguageModel>,
        chart_renderer: Arc<dyn ChartRenderer>,
        document_renderer: Arc<dyn DocumentRenderer>,
        config: &Config,
    ) -> Self {
        Self {
            assembler: ContextAssembler::new(store, config.context.clone()),
            engine: ExecutionEngine::new(registry, config.engine.clone()),
            formatter: Formatter::new(formatter_model),
            chart_renderer,
            document_renderer,
        }
    }

    /// Show a progress bar while agents run.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.engine = self.engine.with_progress(show_progress);
        self
    }

    /// Process one request.
    pub async fn run(&self, request: &AnalysisRequest) -> ReportResponse {
        let mut tracker = StageTracker::new();
        info!(
            user = %request.user_id,
            report_type = %request.report_type,
            "Processing report request"
        );

        let outcome = AssertUnwindSafe(self.process(request, &mut tracker))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracker.advance(PipelineStage::Failed);
                error!("Request for {} panicked", request.user_id);
                return ReportResponse::failed(tracker.current(), REQUEST_PANICKED);
            }
        };

        match result {
            Ok(response) => response,
            Err(PipelineError::NoContent) => {
                tracker.advance(PipelineStage::Rejected);
                warn!("Rejected request for {}: no usable text", request.user_id);
                ReportResponse::failed(tracker.current(), PipelineError::NoContent.to_string())
            }
            Err(e) => {
                tracker.advance(PipelineStage::Failed);
                error!("Request for {} failed: {}", request.user_id, e);
                ReportResponse::failed(tracker.current(), e.to_string())
            }
        }
    }

    /// Assemble the context and report what would run, without model calls.
    pub fn plan(&self, request: &AnalysisRequest) -> Result<RunPlan> {
        let context = self.assembler.assemble(
            &request.user_id,
            request.raw_text.as_deref(),
            request.keyword(),
        )?;

        Ok(RunPlan {
            user_id: request.user_id.clone(),
            report_type: request.report_type.clone(),
            context_chars: context.chars().count(),
            context_preview: context.chars().take(200).collect(),
            agents: select(&request.report_type),
            chart_eligible: self.engine.chart_eligible(&context),
            format_template: select_template(&request.report_type),
            render_template: RenderTemplate::for_report_type(&request.report_type),
            subtitle: subtitle(&request.report_type).to_string(),
        })
    }

    async fn process(
        &self,
        request: &AnalysisRequest,
        tracker: &mut StageTracker,
    ) -> Result<ReportResponse> {
        let keyword = request.keyword();
        let context = self.assembler.assemble(
            &request.user_id,
            request.raw_text.as_deref(),
            keyword,
        )?;
        tracker.advance(PipelineStage::ContextAssembled);

        let active = select(&request.report_type);
        info!("Active agents: {}", active);

        let related = self.engine.spawn_related(context.clone());
        tracker.advance(PipelineStage::AgentsDispatched);
        let mut bundle = self.engine.execute(context.clone(), &active, keyword).await;
        tracker.advance(PipelineStage::AgentsDrained);

        let failures = bundle.failures();
        if !failures.is_empty() {
            warn!("Agents failed: {}", failures.join(", "));
        }

        let generated_at = Utc::now();
        let stem = artifact_stem(&request.user_id, keyword, generated_at);
        self.render_chart(&mut bundle, keyword, &stem);

        let template = select_template(&request.report_type);
        let narrative = self
            .formatter
            .format_with(template, &bundle, &request.report_type, &context)
            .await;
        tracker.advance(PipelineStage::Formatted);

        let document =
            RenderDocument::new(&bundle, &request.report_type, narrative.clone(), stem, generated_at);
        let download_link = match self.document_renderer.render_document(&document) {
            Ok(path) => {
                tracker.advance(PipelineStage::Rendered);
                info!("Report saved to {}", path.display());
                Some(path.display().to_string())
            }
            Err(e) => {
                tracker.advance(PipelineStage::Failed);
                warn!("Rendering failed: {}", e);
                None
            }
        };

        let related_topics = match related {
            Some(task) => task.join().await,
            None => Vec::new(),
        };

        if tracker.current() == PipelineStage::Rendered {
            tracker.advance(PipelineStage::Responded);
        }

        Ok(build_response(
            &bundle,
            narrative,
            download_link,
            related_topics,
            template,
            tracker.current(),
            generated_at,
        ))
    }

    /// Render chart data when the chart agent produced values. Failures only
    /// leave the chart out.
    fn render_chart(&self, bundle: &mut ReportBundle, keyword: Option<&str>, stem: &str) {
        let Some(chart) = bundle.get("chart").and_then(ChartData::from_result) else {
            return;
        };

        let title = keyword.unwrap_or(DEFAULT_CHART_FOCUS);
        match self.chart_renderer.render_chart(&chart, title, stem) {
            Ok(path) => {
                debug!("Chart rendered to {}", path.display());
                bundle.chart_artifact = Some(path);
            }
            Err(e) => warn!("Chart rendering failed: {}", e),
        }
    }
}

fn build_response(
    bundle: &ReportBundle,
    report: String,
    download_link: Option<String>,
    related_topics: Vec<String>,
    template: FormatTemplate,
    stage: PipelineStage,
    generated_at: chrono::DateTime<Utc>,
) -> ReportResponse {
    ReportResponse {
        success: true,
        report,
        summary: bundle.text("summary"),
        keywords: list_or_placeholder(bundle.get("keywords")),
        trends: list_or_placeholder(bundle.get("trends")),
        decisions: bundle.text("decisions"),
        risks: bundle.text("risks"),
        sentiment: bundle.text("sentiment"),
        cognitive: bundle.text("cognitive"),
        identity: bundle.identity.clone(),
        chart_path: bundle
            .chart_artifact
            .as_ref()
            .map(|p| p.display().to_string()),
        related_topics,
        download_link,
        template: Some(template.id().to_string()),
        stage,
        error: None,
        generated_at,
    }
}

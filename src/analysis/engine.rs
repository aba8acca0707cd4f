//! Parallel execution engine.
//!
//! Runs the document identifier and one task per active agent tag
//! concurrently over a shared context, and collects the results into a
//! [`ReportBundle`] in whatever order they complete.

use crate::agent::{Agent, AgentRegistry};
use crate::config::EngineConfig;
use crate::models::{ActiveAgentSet, AgentResult, AgentTag, ReportBundle};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Focus handed to the chart extractor when the request has no keyword.
pub const DEFAULT_CHART_FOCUS: &str = "Metrics";

const IDENTITY_KEY: &str = "identity";
const DEFAULT_IDENTITY: &str = "Document";

/// One unit of work submitted to the pool.
struct AgentTask {
    key: String,
    agent: Arc<dyn Agent>,
    focus: Option<String>,
}

/// Handle to the related-topics side task.
///
/// The task runs alongside the agents and is joined before the response is
/// built; failures yield an empty list.
pub struct RelatedTask {
    handle: JoinHandle<Vec<String>>,
}

impl RelatedTask {
    pub async fn join(self) -> Vec<String> {
        match self.handle.await {
            Ok(topics) => topics,
            Err(e) => {
                warn!("Related topics task failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Runs agents concurrently with isolated failure handling.
pub struct ExecutionEngine {
    registry: AgentRegistry,
    config: EngineConfig,
    show_progress: bool,
}

impl ExecutionEngine {
    pub fn new(registry: AgentRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Whether the chart extractor runs for a context of this size.
    pub fn chart_eligible(&self, context: &str) -> bool {
        context.chars().count() > self.config.chart_min_context_chars
    }

    /// Run the identifier plus every active agent and collect a bundle.
    ///
    /// Every tag key is present in the returned bundle: results for active
    /// tags, `NotRequested` for the rest.
    pub async fn execute(
        &self,
        context: Arc<str>,
        active: &ActiveAgentSet,
        keyword: Option<&str>,
    ) -> ReportBundle {
        let mut bundle = ReportBundle::new();
        let tasks = self.plan_tasks(&context, active, keyword, &mut bundle);

        let workers = match self.config.max_workers {
            Some(cap) => cap.clamp(1, tasks.len().max(1)),
            None => tasks.len().max(1),
        };
        debug!(tasks = tasks.len(), workers, "Dispatching agents");

        let progress = self.progress_bar(tasks.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let timeout = self.config.agent_timeout_seconds;

        let mut pending = FuturesUnordered::new();
        for task in tasks {
            let semaphore = semaphore.clone();
            let context = context.clone();
            let key = task.key.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let started = Instant::now();
                let result = run_agent(&task, &context, timeout).await;
                (result, started.elapsed())
            });
            pending.push(async move { (key, handle.await) });
        }

        while let Some((key, joined)) = pending.next().await {
            let result = match joined {
                Ok((result, elapsed)) => {
                    info!(
                        key = %key,
                        ok = !result.is_failure(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Agent finished"
                    );
                    result
                }
                Err(e) => {
                    warn!(key = %key, "Agent task aborted: {}", e);
                    if e.is_panic() {
                        AgentResult::failure("agent panicked")
                    } else {
                        AgentResult::failure("agent task cancelled")
                    }
                }
            };

            if key == IDENTITY_KEY {
                bundle.identity = identity_label(&result);
            } else {
                bundle.insert(key, result);
            }

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        bundle.fill_missing();
        bundle
    }

    /// Spawn the related-topics generator when enabled.
    pub fn spawn_related(&self, context: Arc<str>) -> Option<RelatedTask> {
        if !self.config.related_topics {
            return None;
        }
        let agent = self.registry.related()?;

        let handle = tokio::spawn(async move {
            match agent.run(&context, None).await {
                AgentResult::List(topics) => topics,
                AgentResult::Text(text) => text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect(),
                other => {
                    debug!("No related topics: {}", other.to_text());
                    Vec::new()
                }
            }
        });
        Some(RelatedTask { handle })
    }

    /// Build the task list, recording skipped or unavailable tags directly in
    /// the bundle.
    fn plan_tasks(
        &self,
        context: &str,
        active: &ActiveAgentSet,
        keyword: Option<&str>,
        bundle: &mut ReportBundle,
    ) -> Vec<AgentTask> {
        let mut tasks = vec![AgentTask {
            key: IDENTITY_KEY.to_string(),
            agent: self.registry.identifier(),
            focus: None,
        }];

        for tag in active.iter() {
            let key = tag.result_key();

            let focus = if tag == AgentTag::Chart {
                if !self.chart_eligible(context) {
                    bundle.insert(
                        key,
                        AgentResult::Skipped(format!(
                            "context shorter than {} characters",
                            self.config.chart_min_context_chars
                        )),
                    );
                    continue;
                }
                Some(keyword.unwrap_or(DEFAULT_CHART_FOCUS).to_string())
            } else {
                None
            };

            match self.registry.get(tag) {
                Some(agent) => tasks.push(AgentTask {
                    key: key.to_string(),
                    agent,
                    focus,
                }),
                None => {
                    warn!("No agent registered for {}", tag);
                    bundle.insert(key, AgentResult::failure("no agent registered"));
                }
            }
        }

        tasks
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} agents")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}

async fn run_agent(task: &AgentTask, context: &str, timeout: Option<u64>) -> AgentResult {
    let run = task.agent.run(context, task.focus.as_deref());
    match timeout {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {}s", task.agent.name(), secs);
                AgentResult::failure(format!("timed out after {}s", secs))
            }
        },
        None => run.await,
    }
}

/// First non-empty line of the identifier's answer, or the default label.
fn identity_label(result: &AgentResult) -> String {
    match result {
        AgentResult::Text(text) => text
            .lines()
            .map(|l| l.trim().trim_matches(|c: char| c == '*' || c == '"' || c == '.'))
            .find(|l| !l.is_empty())
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
        _ => DEFAULT_IDENTITY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::selector::select;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Agent returning a fixed result and counting calls.
    struct FixedAgent {
        name: &'static str,
        result: AgentResult,
        calls: Arc<AtomicUsize>,
        seen_focus: std::sync::Mutex<Option<String>>,
    }

    impl FixedAgent {
        fn new(name: &'static str, result: AgentResult, calls: Arc<AtomicUsize>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls,
                seen_focus: std::sync::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Agent for FixedAgent {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, _context: &str, focus: Option<&str>) -> AgentResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_focus.lock().unwrap() = focus.map(String::from);
            self.result.clone()
        }
    }

    struct PanickingAgent;

    #[async_trait]
    impl Agent for PanickingAgent {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self, _context: &str, _focus: Option<&str>) -> AgentResult {
            panic!("boom");
        }
    }

    struct SlowAgent;

    #[async_trait]
    impl Agent for SlowAgent {
        fn name(&self) -> &str {
            "slow"
        }

        async fn run(&self, _context: &str, _focus: Option<&str>) -> AgentResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            AgentResult::Text("late".into())
        }
    }

    fn full_registry(calls: &Arc<AtomicUsize>) -> AgentRegistry {
        let mut registry = AgentRegistry::new(FixedAgent::new(
            "identity",
            AgentResult::Text("**Quarterly Financial Report**\n".into()),
            calls.clone(),
        ));
        for tag in AgentTag::ALL {
            let result = match tag {
                AgentTag::Keywords | AgentTag::Trends => {
                    AgentResult::List(vec![format!("{} item", tag)])
                }
                _ => AgentResult::Text(format!("{} output", tag)),
            };
            registry = registry.with_agent(tag, FixedAgent::new("fixed", result, calls.clone()));
        }
        registry
    }

    fn long_context() -> Arc<str> {
        Arc::from("Revenue grew 20% in Q3 while costs stayed flat. ".repeat(10).as_str())
    }

    #[tokio::test]
    async fn test_financial_summary_bundle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = ExecutionEngine::new(full_registry(&calls), EngineConfig::default());

        let bundle = engine
            .execute(long_context(), &select("financial summary"), None)
            .await;

        // identifier + summary, keywords, decision, trends, chart
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(bundle.identity, "Quarterly Financial Report");
        assert_eq!(bundle.get("chart"), Some(&AgentResult::Text("chart output".into())));
        assert!(bundle.get("trends").unwrap().is_usable());
        for key in ["risks", "sentiment", "cognitive"] {
            assert_eq!(bundle.get(key), Some(&AgentResult::NotRequested));
            assert_eq!(bundle.text(key), "Not requested.");
        }
        assert_eq!(bundle.len(), AgentTag::ALL.len());
    }

    #[tokio::test]
    async fn test_chart_skipped_on_short_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = ExecutionEngine::new(full_registry(&calls), EngineConfig::default());

        let bundle = engine
            .execute(Arc::from("Revenue grew 20% in Q3."), &select("market"), None)
            .await;

        assert!(matches!(bundle.get("chart"), Some(AgentResult::Skipped(_))));
        // identifier + summary, keywords, decision, trends
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_chart_focus_uses_keyword() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chart = FixedAgent::new("chart", AgentResult::Text("c".into()), calls.clone());
        let registry = full_registry(&calls).with_agent(AgentTag::Chart, chart.clone());
        let engine = ExecutionEngine::new(registry, EngineConfig::default());

        engine
            .execute(long_context(), &select("sales"), Some("Revenue"))
            .await;
        assert_eq!(chart.seen_focus.lock().unwrap().as_deref(), Some("Revenue"));

        engine.execute(long_context(), &select("sales"), None).await;
        assert_eq!(
            chart.seen_focus.lock().unwrap().as_deref(),
            Some(DEFAULT_CHART_FOCUS)
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = full_registry(&calls)
            .with_agent(AgentTag::Risks, Arc::new(PanickingAgent))
            .with_agent(
                AgentTag::Summary,
                FixedAgent::new("summary", AgentResult::failure("model down"), calls.clone()),
            );
        let engine = ExecutionEngine::new(
            registry,
            EngineConfig {
                max_workers: Some(2),
                ..EngineConfig::default()
            },
        );

        let bundle = engine
            .execute(long_context(), &select("risk audit"), None)
            .await;

        assert_eq!(bundle.get("risks"), Some(&AgentResult::failure("agent panicked")));
        assert_eq!(bundle.get("summary"), Some(&AgentResult::failure("model down")));
        assert!(bundle.get("keywords").unwrap().is_usable());
        assert!(bundle.get("decisions").unwrap().is_usable());
        let mut failures = bundle.failures();
        failures.sort();
        assert_eq!(failures, vec!["risks", "summary"]);
    }

    #[tokio::test]
    async fn test_agent_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = full_registry(&calls).with_agent(AgentTag::Summary, Arc::new(SlowAgent));
        let engine = ExecutionEngine::new(
            registry,
            EngineConfig {
                agent_timeout_seconds: Some(1),
                ..EngineConfig::default()
            },
        );

        let bundle = engine.execute(long_context(), &select(""), None).await;
        assert_eq!(
            bundle.get("summary"),
            Some(&AgentResult::failure("timed out after 1s"))
        );
        assert!(bundle.get("keywords").unwrap().is_usable());
    }

    #[tokio::test]
    async fn test_missing_agent_and_identity_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = AgentRegistry::new(FixedAgent::new(
            "identity",
            AgentResult::failure("offline"),
            calls.clone(),
        ))
        .with_agent(
            AgentTag::Summary,
            FixedAgent::new("summary", AgentResult::Text("s".into()), calls.clone()),
        );
        let engine = ExecutionEngine::new(registry, EngineConfig::default());

        let bundle = engine.execute(long_context(), &select(""), None).await;
        assert_eq!(bundle.identity, "Document");
        assert_eq!(
            bundle.get("keywords"),
            Some(&AgentResult::failure("no agent registered"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_related_topics_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = full_registry(&calls).with_related(FixedAgent::new(
            "related",
            AgentResult::List(vec!["Cash flow".into(), "Hiring".into()]),
            calls.clone(),
        ));

        let disabled = ExecutionEngine::new(registry.clone(), EngineConfig::default());
        assert!(disabled.spawn_related(long_context()).is_none());

        let enabled = ExecutionEngine::new(
            registry,
            EngineConfig {
                related_topics: true,
                ..EngineConfig::default()
            },
        );
        let task = enabled.spawn_related(long_context()).unwrap();
        assert_eq!(task.join().await, vec!["Cash flow", "Hiring"]);
    }

    #[test]
    fn test_identity_label() {
        assert_eq!(
            identity_label(&AgentResult::Text("\n \"Invoice.\"\nextra".into())),
            "Invoice"
        );
        assert_eq!(identity_label(&AgentResult::Text("   ".into())), "Document");
        assert_eq!(identity_label(&AgentResult::NotRequested), "Document");
    }

    #[test]
    fn test_execute_blocking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = ExecutionEngine::new(full_registry(&calls), EngineConfig::default());
        let bundle = tokio_test::block_on(engine.execute(long_context(), &select(""), None));
        assert_eq!(bundle.failures().len(), 0);
    }
}

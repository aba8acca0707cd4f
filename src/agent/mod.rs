//! Analysis agents.
//!
//! Every agent turns the shared context into one [`AgentResult`]. Agents
//! never return errors: a failed model call or unparseable output becomes
//! `AgentResult::Failure` so one agent cannot take down its siblings.

pub mod analysts;
pub mod prompts;
pub mod registry;

pub use analysts::{ChartDataAgent, PromptAgent, SentimentAgent};
pub use registry::AgentRegistry;

use crate::models::AgentResult;
use async_trait::async_trait;

/// Contract shared by every analysis agent.
///
/// Implementations are called concurrently on the same instance and must
/// not mutate shared state.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Analyze `context`, optionally steered by `focus`.
    async fn run(&self, context: &str, focus: Option<&str>) -> AgentResult;
}

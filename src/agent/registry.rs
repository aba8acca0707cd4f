//! Lookup from agent tags to agent instances.

use crate::agent::{Agent, ChartDataAgent, PromptAgent, SentimentAgent};
use crate::config::ContextConfig;
use crate::llm::LanguageModel;
use crate::models::AgentTag;
use std::collections::HashMap;
use std::sync::Arc;

/// The agents available to the execution engine.
///
/// Besides the tagged agents the registry always holds the document
/// identifier, and optionally a related-topics generator.
#[derive(Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentTag, Arc<dyn Agent>>,
    identifier: Arc<dyn Agent>,
    related: Option<Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new(identifier: Arc<dyn Agent>) -> Self {
        Self {
            agents: HashMap::new(),
            identifier,
            related: None,
        }
    }

    pub fn with_agent(mut self, tag: AgentTag, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(tag, agent);
        self
    }

    pub fn with_related(mut self, agent: Arc<dyn Agent>) -> Self {
        self.related = Some(agent);
        self
    }

    /// Registry with the shipped agent for every tag, all backed by `model`.
    pub fn from_model(model: Arc<dyn LanguageModel>, context: &ContextConfig) -> Self {
        let identifier = PromptAgent::document_identifier(model.clone(), context.identity_chars);

        Self::new(Arc::new(identifier))
            .with_agent(AgentTag::Summary, Arc::new(PromptAgent::summarizer(model.clone())))
            .with_agent(
                AgentTag::Keywords,
                Arc::new(PromptAgent::keyword_extractor(model.clone())),
            )
            .with_agent(
                AgentTag::Decision,
                Arc::new(PromptAgent::decision_extractor(model.clone())),
            )
            .with_agent(AgentTag::Trends, Arc::new(PromptAgent::trend_analyzer(model.clone())))
            .with_agent(AgentTag::Chart, Arc::new(ChartDataAgent::new(model.clone())))
            .with_agent(AgentTag::Risks, Arc::new(PromptAgent::risk_analyzer(model.clone())))
            .with_agent(AgentTag::Sentiment, Arc::new(SentimentAgent::new(model.clone())))
            .with_agent(
                AgentTag::Cognitive,
                Arc::new(PromptAgent::cognitive_analyzer(model.clone())),
            )
            .with_related(Arc::new(PromptAgent::related_topics(model)))
    }

    pub fn get(&self, tag: AgentTag) -> Option<Arc<dyn Agent>> {
        self.agents.get(&tag).cloned()
    }

    pub fn identifier(&self) -> Arc<dyn Agent> {
        self.identifier.clone()
    }

    pub fn related(&self) -> Option<Arc<dyn Agent>> {
        self.related.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("echo".to_string())
        }
    }

    #[test]
    fn test_from_model_covers_every_tag() {
        let registry = AgentRegistry::from_model(Arc::new(EchoModel), &ContextConfig::default());
        for tag in AgentTag::ALL {
            assert!(registry.get(tag).is_some(), "missing agent for {}", tag);
        }
        assert_eq!(registry.identifier().name(), "identity");
        assert!(registry.related().is_some());
        assert_eq!(registry.get(AgentTag::Chart).unwrap().name(), "chart");
    }

    #[test]
    fn test_partial_registry() {
        let model: Arc<dyn LanguageModel> = Arc::new(EchoModel);
        let registry = AgentRegistry::new(Arc::new(PromptAgent::document_identifier(
            model.clone(),
            100,
        )))
        .with_agent(AgentTag::Summary, Arc::new(PromptAgent::summarizer(model)));

        assert!(registry.get(AgentTag::Summary).is_some());
        assert!(registry.get(AgentTag::Risks).is_none());
        assert!(registry.related().is_none());
    }
}

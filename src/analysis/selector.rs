//! Report-type driven agent selection.

use crate::models::{ActiveAgentSet, AgentTag};

/// Tags every request runs.
pub const BASE_AGENTS: [AgentTag; 3] = [AgentTag::Summary, AgentTag::Keywords, AgentTag::Decision];

/// Substring groups and the tags they switch on. Matches are additive.
const SELECTION_RULES: &[(&[&str], &[AgentTag])] = &[
    (
        &["financial", "market", "sales", "trend"],
        &[AgentTag::Trends, AgentTag::Chart],
    ),
    (
        &["risk", "audit", "compliance", "legal", "fir", "criminal", "case"],
        &[AgentTag::Risks],
    ),
    (
        &["psych", "sentiment", "hr", "interrogation", "interview"],
        &[AgentTag::Sentiment, AgentTag::Cognitive],
    ),
    (
        &["custody", "prison", "gang"],
        &[AgentTag::Risks, AgentTag::Keywords],
    ),
    (
        &["comprehensive", "full", "detailed"],
        &[
            AgentTag::Trends,
            AgentTag::Chart,
            AgentTag::Risks,
            AgentTag::Sentiment,
            AgentTag::Cognitive,
        ],
    ),
];

/// Compute the active agent set for a report type.
///
/// Matching is a case-insensitive substring test, so short triggers such
/// as `hr` or `fir` also fire inside longer words.
pub fn select(report_type: &str) -> ActiveAgentSet {
    let report_type = report_type.to_lowercase();
    let mut tags: Vec<AgentTag> = BASE_AGENTS.to_vec();

    for (triggers, enabled) in SELECTION_RULES {
        if triggers.iter().any(|t| report_type.contains(t)) {
            tags.extend_from_slice(enabled);
        }
    }

    ActiveAgentSet::new(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(set: &ActiveAgentSet) -> Vec<AgentTag> {
        set.iter().collect()
    }

    #[test]
    fn test_base_set_always_active() {
        let set = select("");
        assert_eq!(
            tags(&set),
            vec![AgentTag::Summary, AgentTag::Keywords, AgentTag::Decision]
        );
        assert_eq!(select("quarterly memo").len(), 3);
    }

    #[test]
    fn test_financial_summary() {
        let set = select("financial summary");
        assert!(set.contains(AgentTag::Trends));
        assert!(set.contains(AgentTag::Chart));
        assert!(!set.contains(AgentTag::Risks));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_case_insensitive_and_additive() {
        let set = select("Market RISK Interview");
        for tag in [
            AgentTag::Trends,
            AgentTag::Chart,
            AgentTag::Risks,
            AgentTag::Sentiment,
            AgentTag::Cognitive,
        ] {
            assert!(set.contains(tag), "expected {}", tag);
        }
    }

    #[test]
    fn test_comprehensive_enables_everything() {
        let set = select("Comprehensive review");
        assert_eq!(set.len(), AgentTag::ALL.len());
    }

    #[test]
    fn test_custody_adds_risks() {
        let set = select("custody_movement");
        assert!(set.contains(AgentTag::Risks));
        assert!(!set.contains(AgentTag::Sentiment));
    }

    #[test]
    fn test_short_triggers_fire_inside_words() {
        // "hr" inside "three", "fir" inside "first".
        assert!(select("three month view").contains(AgentTag::Sentiment));
        assert!(select("first pass").contains(AgentTag::Risks));
    }
}

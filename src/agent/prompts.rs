//! Prompt templates for the analysis agents and the report formatter.
//!
//! Placeholders are written as `{name}` and filled with [`fill`].

/// Replace each `{key}` in `template` with its value.
///
/// Only the template is scanned; inserted values are copied through as is,
/// so a document containing `{focus}` reaches the model unchanged. Braces
/// that do not name a known key are kept.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub const IDENTIFY: &str = r#"Identify the type of this document (for example: invoice, FIR, interrogation transcript, quarterly financial report, contract).
Answer with a short label of at most six words.

Document:
{context}"#;

pub const SUMMARY: &str = r#"Summarize the following document in one or two concise paragraphs.
Keep names, figures, dates and outcomes that matter.

Document:
{context}"#;

pub const KEYWORDS: &str = r#"Extract the most important keywords and key phrases from the document below.
Return them as a single comma-separated line, most important first, at most 15 items.

Document:
{context}"#;

pub const DECISIONS: &str = r#"List the decisions, action items and recommendations that follow from the document below.
Use short bullet points. If none are stated, infer the most sensible next steps.

Document:
{context}"#;

pub const TRENDS: &str = r#"Identify the trends and patterns in the document below (growth, decline, recurring events, shifts over time).
Return one trend per line as a bullet point, each a single sentence.

Document:
{context}"#;

pub const CHART_DATA: &str = r#"Extract numeric data about "{focus}" from the document below that would make a useful chart.
Respond with JSON only, in exactly this shape:
{"labels": ["label 1", "label 2"], "values": [10, 20]}
Use at most 8 labels. If there is no numeric data, respond with {"labels": [], "values": []}.

Document:
{context}"#;

pub const RISKS: &str = r#"You are a senior risk and compliance auditor. Identify the risks in the document below.

1. Financial risks (hidden costs, penalties, ambiguous amounts).
2. Legal and compliance risks (missing clauses, vague terms, regulatory violations, offences).
3. Operational or security risks (data leaks, unsafe practices, custody lapses).
4. An overall risk level: High, Medium or Low.

Format:
Overall Risk Level: <level>
- Financial: <key risk or "None detected">
- Legal: <key risk or "None detected">
- Operational: <key risk or "None detected">
Critical Warning: <most urgent warning, if any>

Document:
{context}"#;

pub const SENTIMENT: &str = r#"The document below has a sentiment score of {score} ({label}) on a scale from -1 to 1.
Briefly explain, in two or three sentences, why the text reads this way.

Document:
{context}"#;

pub const COGNITIVE: &str = r#"Analyze the cognitive and behavioral indicators in the document below: stress, deflection, consistency of statements, confidence, and signs of deception or coercion.
Write a short structured assessment with a one-line overall conclusion.

Document:
{context}"#;

pub const RELATED_TOPICS: &str = r#"Suggest follow-up topics an analyst should research next, based on the document below.
Return one topic per line, at most 5.

Document:
{context}"#;

pub const GENERIC_REPORT: &str = r#"You are a senior enterprise report architect. Write a clean, professional report in Markdown.

Rules:
1. Output only Markdown, using ## headings and **bold** labels.
2. No emojis and no commentary outside the report.

Report type: {report_type}
Document type: {identity}

Content input (do not copy verbatim):
- Summary: {summary}
- Keywords: {keywords}
- Trends: {trends}
- Decisions: {decisions}

Required structure:
## Title
## Executive Summary
## Key Findings
## Trends & Patterns
## Strategic Recommendations (label each High / Medium / Low Priority)
## Conclusion"#;

pub const CRIMINAL_PROFILE: &str = r#"You are a senior forensic investigator. Write a formal Master Criminal Profile in Markdown.
Use formal terminology, avoid speculation, and cite the record for every claim.

Risk assessment from analysts:
{risks}

Behavioral sentiment:
{sentiment}

Source records:
{context}

Required structure:
## Identity
## Criminal History
## Known Associates
## Risk Assessment
## Legal Status
## Recommended Actions (label each High / Medium Priority)"#;

pub const LEGAL_CASE: &str = r#"You are a senior investigating officer. Write an FIR / case analysis report in Markdown.
Focus on facts and evidence. Do not speculate.

Risk assessment from analysts:
{risks}

Behavioral sentiment:
{sentiment}

Case records:
{context}

Required structure:
## Case Overview
## Timeline of Events
## Charges and Applicable Sections
## Evidence Log
## Investigation Gaps
## Recommended Next Steps (label each High / Medium Priority)"#;

pub const INTERROGATION: &str = r#"You are an expert interrogator and behavioral analyst. Write an Interrogation Intelligence report in Markdown.

Risk assessment from analysts:
{risks}

Sentiment and tone:
{sentiment}

Interview records:
{context}

Required structure:
## Subject Information
## Statement Summary
## Behavioral & Sentiment Analysis
## Inconsistencies & Deception Markers
## Actionable Leads
## Interrogator's Conclusion (Truthful / Inconclusive / Deceptive)"#;

pub const CUSTODY_MOVEMENT: &str = r#"You are a custody and prison operations auditor. Write a Custody Movement report in Markdown.

Risk assessment from analysts:
{risks}

Behavioral sentiment:
{sentiment}

Custody records:
{context}

Required structure:
## Subject Overview
## Transfer History
## Procedural Compliance
## Anomalies
## Risk Assessment
## Recommendations"#;

pub const GANG_NETWORK: &str = r#"You are an organized-crime intelligence analyst. Write a Gang Network analysis in Markdown.

Risk assessment from analysts:
{risks}

Behavioral sentiment:
{sentiment}

Intelligence records:
{context}

Required structure:
## Network Overview
## Key Individuals
## Relationships and Hierarchy
## Activities and Territory
## Confidence Assessment
## Recommended Actions"#;

pub const COURT_READY: &str = r#"You are a public prosecutor preparing a court-ready summary. Write it in Markdown, in neutral formal language.

Risk assessment from analysts:
{risks}

Behavioral sentiment:
{sentiment}

Case records:
{context}

Required structure:
## Case Summary
## Facts Established
## Evidence Relied Upon
## Witness Statements
## Legal Observations
## Relief Sought"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_every_occurrence() {
        let out = fill("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        let out = fill(CHART_DATA, &[("context", "doc"), ("focus", "Revenue")]);
        assert!(out.contains("\"Revenue\""));
        assert!(out.contains(r#"{"labels": ["label 1", "label 2"], "values": [10, 20]}"#));
        assert!(!out.contains("{context}"));
    }

    #[test]
    fn test_fill_does_not_rescan_inserted_values() {
        let out = fill(
            "Focus: {focus}\n{context}",
            &[("context", "Template var {focus} in {risks}"), ("focus", "Metrics")],
        );
        assert_eq!(out, "Focus: Metrics\nTemplate var {focus} in {risks}");
    }

    #[test]
    fn test_fill_handles_unbalanced_braces() {
        assert_eq!(fill("a { b {x}", &[("x", "1")]), "a { b 1");
        assert_eq!(fill("tail {", &[("x", "1")]), "tail {");
    }
}

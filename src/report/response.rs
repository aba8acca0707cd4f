//! Printable forms of a [`ReportResponse`].

use crate::models::ReportResponse;
use anyhow::Result;

/// Pretty JSON, the default CLI output.
pub fn generate_json_response(response: &ReportResponse) -> Result<String> {
    serde_json::to_string_pretty(response).map_err(Into::into)
}

/// Markdown view: the narrative followed by the individual agent outputs.
pub fn generate_markdown_response(response: &ReportResponse) -> String {
    let mut output = String::new();

    if !response.success {
        output.push_str("# Report Failed\n\n");
        output.push_str(&format!("- **Stage:** {}\n", response.stage));
        if let Some(ref error) = response.error {
            output.push_str(&format!("- **Error:** {}\n", error));
        }
        return output;
    }

    output.push_str(response.report.trim());
    output.push_str("\n\n---\n\n## Analysis Details\n\n");

    output.push_str(&format!("- **Document Type:** {}\n", response.identity));
    if let Some(ref template) = response.template {
        output.push_str(&format!("- **Template:** {}\n", template));
    }
    output.push_str(&format!("- **Stage:** {}\n", response.stage));
    output.push_str(&format!(
        "- **Generated:** {}\n",
        response.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref link) = response.download_link {
        output.push_str(&format!("- **Document:** {}\n", link));
    }
    if let Some(ref chart) = response.chart_path {
        output.push_str(&format!("- **Chart:** {}\n", chart));
    }
    output.push('\n');

    push_text(&mut output, "Summary", &response.summary);
    push_list(&mut output, "Keywords", &response.keywords);
    push_list(&mut output, "Trends", &response.trends);
    push_text(&mut output, "Decisions", &response.decisions);
    push_text(&mut output, "Risks", &response.risks);
    push_text(&mut output, "Sentiment", &response.sentiment);
    push_text(&mut output, "Cognitive", &response.cognitive);
    if !response.related_topics.is_empty() {
        push_list(&mut output, "Related Topics", &response.related_topics);
    }

    output
}

fn push_text(output: &mut String, heading: &str, text: &str) {
    output.push_str(&format!("### {}\n\n{}\n\n", heading, text.trim()));
}

fn push_list(output: &mut String, heading: &str, items: &[String]) {
    output.push_str(&format!("### {}\n\n", heading));
    for item in items {
        output.push_str(&format!("- {}\n", item));
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PipelineStage;

    #[test]
    fn test_failed_response_markdown() {
        let response = ReportResponse::failed(PipelineStage::Rejected, "No text available for analysis.");
        let markdown = generate_markdown_response(&response);
        assert!(markdown.contains("# Report Failed"));
        assert!(markdown.contains("rejected"));
        assert!(markdown.contains("No text available for analysis."));
    }

    #[test]
    fn test_successful_response_markdown_and_json() {
        let mut response = ReportResponse::failed(PipelineStage::Responded, "");
        response.success = true;
        response.error = None;
        response.report = "## Executive Summary\nAll good.".to_string();
        response.identity = "Invoice".to_string();
        response.keywords = vec!["total".to_string(), "due".to_string()];
        response.risks = "Not requested.".to_string();
        response.template = Some("generic".to_string());

        let markdown = generate_markdown_response(&response);
        assert!(markdown.starts_with("## Executive Summary\nAll good."));
        assert!(markdown.contains("- **Template:** generic"));
        assert!(markdown.contains("### Keywords\n\n- total\n- due\n"));
        assert!(markdown.contains("### Risks\n\nNot requested."));
        assert!(!markdown.contains("Related Topics"));

        let json = generate_json_response(&response).unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(json.contains("\"stage\": \"responded\""));
        assert!(!json.contains("\"error\""));
    }
}

//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// ReportSmith - agent-orchestrated document analysis reports
///
/// Runs summarizer, keyword, trend, risk and sentiment agents over a
/// document in parallel using a local Ollama model, then merges their
/// output into a templated report.
///
/// Examples:
///   reportsmith --user-id u1 --report-type "financial summary" --text-file q3.txt
///   reportsmith --user-id u1 --report-type fir_case_analysis --keyword fraud
///   reportsmith --user-id u1 --report-type "risk audit" --text-file a.txt --dry-run
///   reportsmith --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// User whose stored records back the request
    #[arg(short, long, value_name = "ID", required_unless_present = "init_config")]
    pub user_id: Option<String>,

    /// Free-text report type label (e.g. "financial summary", "fir_case_analysis")
    ///
    /// Drives both agent selection and report template selection.
    #[arg(short, long, value_name = "LABEL", default_value = "")]
    pub report_type: String,

    /// Keyword used to pull matching stored records into the context
    #[arg(short, long, value_name = "WORD")]
    pub keyword: Option<String>,

    /// Document text to analyze
    #[arg(long, value_name = "TEXT", conflicts_with = "text_file")]
    pub text: Option<String>,

    /// File holding the document text to analyze
    #[arg(long, value_name = "FILE")]
    pub text_file: Option<PathBuf>,

    /// Directory of stored OCR records (JSON, one record per file)
    #[arg(short, long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Directory rendered reports and charts are written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write the response to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Response format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Ollama model to use for every agent
    #[arg(short, long, env = "REPORTSMITH_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// HTTP timeout for a single model call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Give up on an agent after this many seconds and record a failure
    #[arg(long, value_name = "SECS")]
    pub agent_timeout: Option<u64>,

    /// Also generate related topics for the document
    #[arg(long)]
    pub related_topics: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reportsmith.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Assemble the context and show the plan without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .reportsmith.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON response (default)
    #[default]
    Json,
    /// Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the user id, empty if not set (should be validated first).
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.user_id().trim().is_empty() {
            return Err("User id must not be empty".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }
        if self.agent_timeout == Some(0) {
            return Err("Agent timeout must be at least 1 second".to_string());
        }

        if let Some(ref path) = self.text_file {
            if !path.is_file() {
                return Err(format!("Text file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            user_id: Some("u1".to_string()),
            report_type: "financial summary".to_string(),
            keyword: None,
            text: Some("Revenue grew".to_string()),
            text_file: None,
            store: None,
            output_dir: None,
            output: None,
            format: OutputFormat::Json,
            model: None,
            ollama_url: None,
            temperature: None,
            timeout: None,
            agent_timeout: None,
            related_topics: false,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_blank_user() {
        let mut args = make_args();
        args.user_id = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_text_file() {
        let mut args = make_args();
        args.text = None;
        args.text_file = Some(PathBuf::from("/definitely/not/here.txt"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "reportsmith",
            "--user-id",
            "u2",
            "--report-type",
            "fir_case_analysis",
            "--keyword",
            "fraud",
        ])
        .unwrap();
        assert_eq!(args.user_id(), "u2");
        assert_eq!(args.keyword.as_deref(), Some("fraud"));
        assert_eq!(args.format, OutputFormat::Json);
    }
}

//! Context assembly.
//!
//! Builds the single bounded string every agent of a request reads, from the
//! request text or the user's stored records.

use crate::agent::analysts::truncate_chars;
use crate::config::ContextConfig;
use crate::error::{PipelineError, Result};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::debug;

/// Assembles contexts from direct text and stored records.
pub struct ContextAssembler {
    store: Arc<dyn RecordStore>,
    limits: ContextConfig,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn RecordStore>, limits: ContextConfig) -> Self {
        Self { store, limits }
    }

    /// Build the context for one request.
    ///
    /// Returns [`PipelineError::NoContent`] when neither the request nor the
    /// store yields usable text. Store failures propagate.
    pub fn assemble(
        &self,
        user_id: &str,
        raw_text: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<Arc<str>> {
        let current = match raw_text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => text.to_string(),
            None => {
                let record = self
                    .store
                    .latest_for_user(user_id)?
                    .ok_or(PipelineError::NoContent)?;
                debug!("Using stored record {} for {}", record.file_name, user_id);
                if record.extracted_text.trim().is_empty() {
                    return Err(PipelineError::NoContent);
                }
                record.extracted_text
            }
        };

        let history = match keyword {
            Some(keyword) => self.history(user_id, keyword)?,
            None => String::new(),
        };

        let combined = format!("{}\n{}", current, history);
        let cleaned = clean_text(&combined);
        let context = truncate_chars(&cleaned, self.limits.max_context_chars);

        if context.trim().chars().count() < self.limits.min_content_chars {
            return Err(PipelineError::NoContent);
        }

        debug!(
            chars = context.chars().count(),
            has_history = !history.is_empty(),
            "Context assembled"
        );
        Ok(Arc::from(context))
    }

    /// Matching stored records, newest first, each cut to the per-record limit.
    fn history(&self, user_id: &str, keyword: &str) -> Result<String> {
        let records = self.store.matching_for_user(
            user_id,
            keyword,
            self.limits.max_history_records,
        )?;
        debug!("{} history records match {:?}", records.len(), keyword);

        Ok(records
            .iter()
            .map(|r| truncate_chars(&r.extracted_text, self.limits.max_record_chars))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Normalize OCR-ish text.
///
/// Control characters other than newline and tab are dropped, runs of spaces
/// and tabs become one space, every line is trimmed and three or more
/// consecutive newlines are collapsed to two.
pub fn clean_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let mut cleaned = String::with_capacity(line.len());
        let mut in_blank = false;
        for c in line.chars() {
            if c == ' ' || c == '\t' {
                if !in_blank {
                    cleaned.push(' ');
                }
                in_blank = true;
            } else if !c.is_control() {
                cleaned.push(c);
                in_blank = false;
            }
        }
        lines.push(cleaned.trim().to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            newlines += 1;
        }
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(if newlines >= 2 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        newlines = 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredRecord;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn record(user: &str, text: &str, minutes: i64) -> StoredRecord {
        StoredRecord {
            user_id: user.to_string(),
            extracted_text: text.to_string(),
            file_name: format!("scan-{}.png", minutes),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn assembler(records: Vec<StoredRecord>) -> ContextAssembler {
        ContextAssembler::new(
            Arc::new(MemoryStore::new(records)),
            ContextConfig::default(),
        )
    }

    #[test]
    fn test_raw_text_wins_over_store() {
        let assembler = assembler(vec![record("u1", "stored text", 1)]);
        let context = assembler
            .assemble("u1", Some("  direct text  "), None)
            .unwrap();
        assert_eq!(&*context, "direct text");
    }

    #[test]
    fn test_falls_back_to_latest_record() {
        let assembler = assembler(vec![
            record("u1", "older record", 1),
            record("u1", "newest record", 2),
        ]);
        let context = assembler.assemble("u1", Some("   "), None).unwrap();
        assert_eq!(&*context, "newest record");
    }

    #[test]
    fn test_no_content() {
        let empty = assembler(Vec::new());
        assert!(matches!(
            empty.assemble("u1", None, None),
            Err(PipelineError::NoContent)
        ));

        let blank_record = assembler(vec![record("u1", "  \n ", 1)]);
        assert!(matches!(
            blank_record.assemble("u1", None, None),
            Err(PipelineError::NoContent)
        ));

        let short = assembler(Vec::new());
        assert!(matches!(
            short.assemble("u2", Some("ab"), None),
            Err(PipelineError::NoContent)
        ));
    }

    #[test]
    fn test_context_is_capped() {
        let assembler = assembler(Vec::new());
        let long_text = "word ".repeat(4000);
        assert_eq!(long_text.chars().count(), 20000);

        let context = assembler.assemble("u1", Some(&long_text), None).unwrap();
        assert_eq!(context.chars().count(), 12000);
    }

    #[test]
    fn test_keyword_history_limits() {
        let long_fraud = format!("fraud {}", "x".repeat(3000));
        let records: Vec<StoredRecord> = (0..6)
            .map(|i| record("u1", &long_fraud, i))
            .chain(std::iter::once(record("u1", "unrelated", 10)))
            .collect();
        let assembler = assembler(records);

        let history = assembler.history("u1", "fraud").unwrap();
        let parts: Vec<&str> = history.split('\n').collect();
        assert_eq!(parts.len(), 5);
        assert!(parts.iter().all(|p| p.chars().count() == 2000));

        let context = assembler
            .assemble("u1", Some("Current complaint"), Some("fraud"))
            .unwrap();
        assert!(context.starts_with("Current complaint\nfraud"));
        assert_eq!(context.chars().count(), 18 + 5 * 2000 + 4);
    }

    #[test]
    fn test_keyword_history_newest_first() {
        let assembler = assembler(vec![
            record("u1", "fraud one", 1),
            record("u1", "fraud two", 2),
        ]);
        let context = assembler
            .assemble("u1", Some("Current"), Some("FRAUD"))
            .unwrap();
        assert_eq!(&*context, "Current\nfraud two\nfraud one");
    }

    #[test]
    fn test_clean_text() {
        let raw = "  Line\u{0007} one \t\t with   gaps \r\n\n\n\n\tLine two  ";
        assert_eq!(clean_text(raw), "Line one with gaps\n\nLine two");
    }
}

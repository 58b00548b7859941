use crate::types::Abstract;
use chrono::{DateTime, Utc};

/// Merges ordered per-article abstracts into one digest document.
/// Deterministic and pure: input order is preserved exactly.
pub struct DigestMerger;

impl DigestMerger {
    /// Concatenate abstracts in input order. Each entry gets a heading when
    /// the abstract text lacks one, plus a source-attribution line so the
    /// digest stays traceable back to its articles.
    pub fn merge(abstracts: &[Abstract]) -> String {
        let entries: Vec<String> = abstracts
            .iter()
            .map(|abs| {
                let text = abs.text.trim();
                let source_line = format!("*{}* - <{}>", abs.feed_name, abs.url);
                if text.starts_with('#') {
                    format!("{}\n\n{}", text, source_line)
                } else {
                    format!("## {}\n\n{}\n\n{}", abs.title, text, source_line)
                }
            })
            .collect();
        entries.join("\n\n")
    }

    /// Wrap the run summary and merged digest into the deliverable document.
    pub fn compose_deliverable(summary: &str, digest: &str, date: DateTime<Utc>) -> String {
        format!(
            "# AI News Update - {}\n\n## Weekly Summary\n\n{}\n\n---\n\n## News Abstracts\n\n{}",
            date.format("%Y/%m/%d"),
            summary.trim(),
            digest.trim()
        )
    }
}

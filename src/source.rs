use crate::types::{ArticleRef, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Produces the ordered batch of articles for one run. The engine treats
/// the result as a pre-materialized, read-only list.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn source_name(&self) -> String;

    async fn load(&self) -> Result<Vec<ArticleRef>>;
}

/// Reads the worklist the extraction stage writes: a line-delimited file of
/// article-file paths, each article file holding URL, title, feed line and
/// body separated by blank lines.
pub struct WorklistSource {
    list_path: PathBuf,
}

impl WorklistSource {
    pub fn new(list_path: impl Into<PathBuf>) -> Self {
        Self {
            list_path: list_path.into(),
        }
    }
}

#[async_trait]
impl ArticleSource for WorklistSource {
    fn source_name(&self) -> String {
        format!("worklist:{}", self.list_path.display())
    }

    async fn load(&self) -> Result<Vec<ArticleRef>> {
        let listing = tokio::fs::read_to_string(&self.list_path).await?;
        let mut articles = Vec::new();

        for line in listing.lines() {
            let path = line.trim();
            if path.is_empty() {
                continue;
            }
            let path = Path::new(path);
            let text = match tokio::fs::read_to_string(path).await {
                Ok(text) => text,
                Err(e) => {
                    // A missing article file loses that article, not the run.
                    warn!("Skipping unreadable article file {}: {}", path.display(), e);
                    continue;
                }
            };
            let id = article_id_for(path);
            let fetched_at = file_mtime(path).unwrap_or_else(Utc::now);
            match parse_article(&id, &text, fetched_at) {
                Some(article) => articles.push(article),
                None => warn!("Skipping malformed article file {}", path.display()),
            }
        }

        info!(
            "Loaded {} article(s) from {}",
            articles.len(),
            self.list_path.display()
        );
        Ok(articles)
    }
}

fn article_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Parse one article file. Layout, in order, separated by blank lines:
/// link, title, `feed_name date`, body. Returns None when the header
/// sections are missing.
pub fn parse_article(id: &str, text: &str, fetched_at: DateTime<Utc>) -> Option<ArticleRef> {
    let mut sections = text.splitn(4, "\n\n");
    let url = sections.next()?.trim();
    let title = sections.next()?.trim();
    let feed_line = sections.next()?.trim();
    // Body may legitimately be empty; it is still sent for generation.
    let body = sections.next().unwrap_or("").trim();

    if url.is_empty() || title.is_empty() {
        return None;
    }

    // The feed line is "feed_name date"; the date token is display-only.
    let feed_name = match feed_line.rsplit_once(' ') {
        Some((name, _date)) => name.trim(),
        None => feed_line,
    };

    Some(ArticleRef {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        body: body.to_string(),
        feed_name: feed_name.to_string(),
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_article() {
        let text = "https://example.com/a\n\nBig News\n\nExample Feed 2026-08-20\n\nThe body.\n\nSecond paragraph.";
        let article = parse_article("article_1", text, Utc::now()).unwrap();
        assert_eq!(article.id, "article_1");
        assert_eq!(article.url, "https://example.com/a");
        assert_eq!(article.title, "Big News");
        assert_eq!(article.feed_name, "Example Feed");
        assert_eq!(article.body, "The body.\n\nSecond paragraph.");
    }

    #[test]
    fn empty_body_is_allowed() {
        let text = "https://example.com/a\n\nBig News\n\nExample Feed 2026-08-20\n\n";
        let article = parse_article("a", text, Utc::now()).unwrap();
        assert_eq!(article.body, "");
    }

    #[test]
    fn missing_header_sections_are_rejected() {
        assert!(parse_article("a", "just one line", Utc::now()).is_none());
        assert!(parse_article("a", "https://example.com\n\n\n\nfeed", Utc::now()).is_none());
    }
}

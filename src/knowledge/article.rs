//! 기사 준비 - 수집된 뉴스 기사를 저장용 프래그먼트로 변환
//!
//! 감성 태깅 → 전문 조립 → 청킹 순서로 처리합니다.
//! 배치 처리는 순차적이며 기사 순서와 청크 순서를 그대로 유지합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::{Fragment, FragmentMetadata};
use crate::sentiment::SentimentClassifier;

use super::chunker::{Chunker, SentenceChunker};

const UNTITLED: &str = "Untitled";
const UNKNOWN: &str = "Unknown";

// ============================================================================
// Types
// ============================================================================

/// 기사 출처 (NewsAPI `source` 객체)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

/// 수집된 뉴스 기사 (NewsAPI 형식)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "publishedAt", alias = "published_at")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
}

// ============================================================================
// ArticlePreparer
// ============================================================================

/// 기사 → 프래그먼트 변환기
#[derive(Debug, Clone)]
pub struct ArticlePreparer {
    classifier: SentimentClassifier,
    chunker: SentenceChunker,
}

impl ArticlePreparer {
    pub fn new(classifier: SentimentClassifier, chunker: SentenceChunker) -> Self {
        Self {
            classifier,
            chunker,
        }
    }

    /// 단일 기사 준비
    ///
    /// `fallback_id`는 URL이 없을 때 경로 생성에 쓰입니다.
    pub fn prepare(
        &self,
        article: &NewsArticle,
        fallback_id: usize,
        now: DateTime<Utc>,
    ) -> Vec<Fragment> {
        let title = non_empty(&article.title).unwrap_or(UNTITLED);
        let description = non_empty(&article.description).unwrap_or("");
        let content = non_empty(&article.content).unwrap_or(description);

        let path = non_empty(&article.url)
            .map(str::to_string)
            .unwrap_or_else(|| format!("article_{}_{}", now.timestamp(), fallback_id));
        let published_at = non_empty(&article.published_at)
            .map(str::to_string)
            .unwrap_or_else(|| now.to_rfc3339());
        let source = article
            .source
            .as_ref()
            .and_then(|s| non_empty(&s.name))
            .unwrap_or(UNKNOWN);
        let author = non_empty(&article.author).unwrap_or(UNKNOWN);

        let sentiment = self
            .classifier
            .classify(&format!("{} {}", title, description))
            .to_tag()
            .to_string();

        let full_text = format!(
            "Title: {}\n\nDescription: {}\n\nContent: {}",
            title, description, content
        );

        let indexed_at = now.to_rfc3339();
        let fragments: Vec<Fragment> = self
            .chunker
            .chunk(&full_text)
            .into_iter()
            .map(|text| Fragment {
                metadata: FragmentMetadata {
                    path: Some(path.clone()),
                    title: Some(title.to_string()),
                    source: Some(source.to_string()),
                    author: Some(author.to_string()),
                    published_at: Some(published_at.clone()),
                    sentiment: Some(sentiment.clone()),
                    indexed_at: Some(indexed_at.clone()),
                    text: Some(text.clone()),
                },
                text,
            })
            .collect();

        tracing::debug!(
            "Prepared {:?}: {} chunks, sentiment={}",
            truncate(title, 50),
            fragments.len(),
            sentiment
        );

        fragments
    }

    /// 기사 배치 준비 (순차, 순서 유지)
    pub fn prepare_batch(&self, articles: &[NewsArticle], now: DateTime<Utc>) -> Vec<Fragment> {
        let fragments: Vec<Fragment> = articles
            .iter()
            .enumerate()
            .flat_map(|(i, article)| self.prepare(article, i + 1, now))
            .collect();

        tracing::info!(
            "Prepared {} articles into {} fragments",
            articles.len(),
            fragments.len()
        );

        fragments
    }
}

impl Default for ArticlePreparer {
    fn default() -> Self {
        Self::new(SentimentClassifier::default(), SentenceChunker::with_defaults())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ChunkConfig;
    use crate::sentiment::SentimentLabel;

    fn article(title: &str, description: &str, content: &str) -> NewsArticle {
        NewsArticle {
            url: Some(format!("https://news.example.com/{}", title.len())),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            content: Some(content.to_string()),
            author: Some("Reporter".to_string()),
            published_at: Some("2025-03-01T12:00:00Z".to_string()),
            source: Some(ArticleSource {
                name: Some("Wire".to_string()),
            }),
        }
    }

    #[test]
    fn test_prepare_single_chunk() {
        let preparer = ArticlePreparer::default();
        let now = Utc::now();
        let fragments = preparer.prepare(
            &article("Chip stocks surge", "Strong earnings boost markets", "Details."),
            1,
            now,
        );

        assert_eq!(fragments.len(), 1);
        let f = &fragments[0];
        assert_eq!(
            f.text,
            "Title: Chip stocks surge\n\nDescription: Strong earnings boost markets\n\nContent: Details."
        );
        assert_eq!(f.title(), "Chip stocks surge");
        assert_eq!(f.metadata.source.as_deref(), Some("Wire"));
        assert_eq!(f.metadata.text.as_deref(), Some(f.text.as_str()));
        assert_eq!(f.sentiment().label, SentimentLabel::Positive);
        assert_eq!(f.metadata.sentiment.as_deref(), Some("positive_0.95"));
    }

    #[test]
    fn test_prepare_defaults() {
        let preparer = ArticlePreparer::default();
        let now = Utc::now();
        let fragments = preparer.prepare(
            &NewsArticle {
                description: Some("Only a description".to_string()),
                ..Default::default()
            },
            7,
            now,
        );

        assert_eq!(fragments.len(), 1);
        let meta = &fragments[0].metadata;
        assert_eq!(meta.title.as_deref(), Some(UNTITLED));
        assert_eq!(meta.author.as_deref(), Some(UNKNOWN));
        assert_eq!(meta.source.as_deref(), Some(UNKNOWN));
        assert_eq!(meta.path, Some(format!("article_{}_7", now.timestamp())));
        assert_eq!(meta.published_at, Some(now.to_rfc3339()));
        // content가 없으면 description 사용
        assert!(fragments[0].text.ends_with("Content: Only a description"));
    }

    #[test]
    fn test_prepare_batch_preserves_order() {
        let chunker = SentenceChunker::new(ChunkConfig::new(60, 10)).unwrap();
        let preparer = ArticlePreparer::new(SentimentClassifier::default(), chunker);

        let long = "Markets moved sharply today. ".repeat(8);
        let articles = vec![
            article("First", "one", &long),
            article("Second", "two", "short"),
        ];

        let fragments = preparer.prepare_batch(&articles, Utc::now());
        assert!(fragments.len() > 2);

        let titles: Vec<&str> = fragments.iter().map(|f| f.title()).collect();
        let first_second = titles.iter().position(|t| *t == "Second").unwrap();
        assert!(titles[..first_second].iter().all(|t| *t == "First"));
        assert!(titles[first_second..].iter().all(|t| *t == "Second"));
        assert!(fragments[0].text.starts_with("Title: First"));
    }

    #[test]
    fn test_deserialize_newsapi_shape() {
        let json = r#"{
            "source": {"id": null, "name": "TechWire"},
            "author": null,
            "title": "AI lab unveils model",
            "description": "A new model",
            "url": "https://example.com/ai",
            "publishedAt": "2025-03-01T12:00:00Z",
            "content": null
        }"#;
        let article: NewsArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.published_at.as_deref(), Some("2025-03-01T12:00:00Z"));
        assert_eq!(article.source.unwrap().name.as_deref(), Some("TechWire"));
        assert!(article.author.is_none());
    }
}

//! Fragment - 검색 엔드포인트가 돌려주는 텍스트 조각
//!
//! 와이어 형식:
//! ```json
//! {"text": "...", "metadata": {"title": "...", "published_at": "...", "sentiment": "positive_0.82"}}
//! ```
//! 모든 필드는 없거나 `null`일 수 있습니다.

use serde::{Deserialize, Deserializer, Serialize};

use crate::sentiment::{SentimentResult, SentimentTag};

/// 프래그먼트 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    /// 원문 경로 (기사 URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// `label_confidence` 형식 감성 태그
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
    /// 청크 원문 사본
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// 검색된 텍스트 조각
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: FragmentMetadata,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: FragmentMetadata::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.metadata.published_at = Some(published_at.into());
        self
    }

    pub fn with_sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.metadata.sentiment = Some(sentiment.into());
        self
    }

    /// 제목 (없으면 빈 문자열)
    pub fn title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or("")
    }

    /// 발행 시각 원문 (없으면 빈 문자열)
    pub fn published_at(&self) -> &str {
        self.metadata.published_at.as_deref().unwrap_or("")
    }

    /// `제목 + " " + 본문` (키워드 추출용)
    pub fn title_and_text(&self) -> String {
        format!("{} {}", self.title(), self.text)
    }

    /// `본문 + " " + 제목` (근거 코퍼스용)
    pub fn text_and_title(&self) -> String {
        format!("{} {}", self.text, self.title())
    }

    /// 저장된 감성 태그 디코딩 (없거나 깨졌으면 neutral)
    pub fn sentiment(&self) -> SentimentResult {
        let raw = self
            .metadata
            .sentiment
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        SentimentTag::decode_opt(raw)
    }
}

/// `null`을 기본값으로 취급
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

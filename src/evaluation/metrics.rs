//! 평가 메트릭 - 관련성, 최신성, 근거성, 보강성, 감성 정합성
//!
//! 모든 메트릭은 순수 함수이며 [0, 1] 범위 값을 반환합니다.
//! 프래그먼트 순서에 의존하지 않고 집계 통계만 사용합니다.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentLabel;
use crate::text::{keyword_set, words};

use super::fragment::Fragment;
use super::timestamps::{hours_between, parse_published_multi};

// ============================================================================
// Constants
// ============================================================================

/// 발행 시각을 알 수 없는 프래그먼트의 최신성 점수
pub const UNKNOWN_RECENCY_SCORE: f64 = 0.3;

/// 최신성 계단 함수: (최대 경과 시간, 점수)
const RECENCY_STEPS: [(f64, f64); 4] = [(24.0, 1.0), (48.0, 0.8), (72.0, 0.6), (168.0, 0.4)];
const STALE_RECENCY_SCORE: f64 = 0.2;

/// 근거 구절 n-gram 범위
const MIN_PHRASE_WORDS: usize = 3;
const MAX_PHRASE_WORDS: usize = 6;
/// 근거 구절 최소 길이 (초과해야 함)
const MIN_PHRASE_CHARS: usize = 12;

/// 적정 보강 비율 구간
const ENRICHMENT_LOW: f64 = 0.15;
const ENRICHMENT_HIGH: f64 = 0.5;

/// 답변 입장 판정 배수
const STANCE_MARGIN: f64 = 1.5;

// ============================================================================
// Types
// ============================================================================

/// 메트릭 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    SourceRelevance,
    Recency,
    FactualGrounding,
    ContextualEnrichment,
    SentimentAlignment,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        Self::SourceRelevance,
        Self::Recency,
        Self::FactualGrounding,
        Self::ContextualEnrichment,
        Self::SentimentAlignment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceRelevance => "source_relevance",
            Self::Recency => "recency",
            Self::FactualGrounding => "factual_grounding",
            Self::ContextualEnrichment => "contextual_enrichment",
            Self::SentimentAlignment => "sentiment_alignment",
        }
    }

    /// 출력용 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::SourceRelevance => "Source Relevance",
            Self::Recency => "Recency",
            Self::FactualGrounding => "Factual Grounding",
            Self::ContextualEnrichment => "Contextual Enrichment",
            Self::SentimentAlignment => "Sentiment Alignment",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 단일 메트릭 점수 (항상 [0, 1])
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub kind: MetricKind,
    pub value: f64,
}

impl MetricScore {
    /// 생성 (범위 밖 값은 clamp, NaN은 0)
    pub fn new(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value: clamp_unit(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// 다섯 메트릭 점수 묶음
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    pub source_relevance: f64,
    pub recency: f64,
    pub factual_grounding: f64,
    pub contextual_enrichment: f64,
    pub sentiment_alignment: f64,
}

impl MetricScores {
    /// 모든 메트릭이 같은 값인 점수 묶음
    pub fn uniform(value: f64) -> Self {
        let value = clamp_unit(value);
        Self {
            source_relevance: value,
            recency: value,
            factual_grounding: value,
            contextual_enrichment: value,
            sentiment_alignment: value,
        }
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::SourceRelevance => self.source_relevance,
            MetricKind::Recency => self.recency,
            MetricKind::FactualGrounding => self.factual_grounding,
            MetricKind::ContextualEnrichment => self.contextual_enrichment,
            MetricKind::SentimentAlignment => self.sentiment_alignment,
        }
    }

    /// `MetricKind::ALL` 순서의 점수 목록
    pub fn to_vec(&self) -> Vec<MetricScore> {
        MetricKind::ALL
            .iter()
            .map(|&kind| MetricScore::new(kind, self.get(kind)))
            .collect()
    }
}

/// 답변 입장 판정용 지표 단어
///
/// 프래그먼트 태깅용 `SentimentClassifier`와는 별개의, 더 단순한 휴리스틱입니다.
/// 단어가 답변 문자열에 부분 문자열로 나타나는지만 셉니다.
#[derive(Debug, Clone)]
pub struct StanceIndicators {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl StanceIndicators {
    pub fn new<P, N>(positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            positive: positive.into_iter().map(|w| w.into().to_lowercase()).collect(),
            negative: negative.into_iter().map(|w| w.into().to_lowercase()).collect(),
        }
    }

    /// 뉴스 도메인 기본 지표 (각 7개)
    pub fn news() -> Self {
        Self::new(
            ["good", "great", "positive", "success", "growth", "improved", "gain"],
            ["bad", "poor", "negative", "fail", "decline", "loss", "drop"],
        )
    }

    /// 답변 입장 판정
    pub fn stance(&self, answer: &str) -> SentimentLabel {
        let lower = answer.to_lowercase();
        let pos = self.positive.iter().filter(|w| lower.contains(w.as_str())).count() as f64;
        let neg = self.negative.iter().filter(|w| lower.contains(w.as_str())).count() as f64;

        if pos > neg * STANCE_MARGIN {
            SentimentLabel::Positive
        } else if neg > pos * STANCE_MARGIN {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl Default for StanceIndicators {
    fn default() -> Self {
        Self::news()
    }
}

// ============================================================================
// MetricSuite
// ============================================================================

/// 다섯 가지 독립 메트릭
#[derive(Debug, Clone, Default)]
pub struct MetricSuite {
    indicators: StanceIndicators,
}

impl MetricSuite {
    pub fn new(indicators: StanceIndicators) -> Self {
        Self { indicators }
    }

    /// 전체 메트릭 계산
    pub fn score_all(
        &self,
        query: &str,
        answer: &str,
        fragments: &[Fragment],
        now: DateTime<Utc>,
    ) -> MetricScores {
        let scores = MetricScores {
            source_relevance: self.source_relevance(query, fragments),
            recency: self.recency(fragments, now),
            factual_grounding: self.factual_grounding(answer, fragments),
            contextual_enrichment: self.contextual_enrichment(answer, fragments),
            sentiment_alignment: self.sentiment_alignment(answer, fragments),
        };

        for score in scores.to_vec() {
            tracing::debug!("{}: {:.3}", score.name(), score.value);
        }

        scores
    }

    /// 출처 관련성
    ///
    /// 질의 키워드(4자 이상) 중 각 프래그먼트(제목 + 본문)에 나타나는 비율 × 2,
    /// 1.0으로 제한한 값의 평균입니다.
    pub fn source_relevance(&self, query: &str, fragments: &[Fragment]) -> f64 {
        let keywords = keyword_set(query);
        if keywords.is_empty() {
            return 0.5;
        }
        if fragments.is_empty() {
            return 0.0;
        }

        let total: f64 = fragments
            .iter()
            .map(|fragment| {
                let fragment_words = keyword_set(&fragment.title_and_text());
                let overlap =
                    keywords.intersection(&fragment_words).count() as f64 / keywords.len() as f64;
                (overlap * 2.0).min(1.0)
            })
            .sum();

        clamp_unit(total / fragments.len() as f64)
    }

    /// 최신성
    ///
    /// 발행 시각을 파싱할 수 없으면 0.3, 그 외에는 경과 시간 계단 함수의 평균입니다.
    pub fn recency(&self, fragments: &[Fragment], now: DateTime<Utc>) -> f64 {
        if fragments.is_empty() {
            return 0.0;
        }

        let total: f64 = fragments
            .iter()
            .map(|fragment| match parse_published_multi(fragment.published_at()) {
                Ok(published) => recency_step(hours_between(published, now)),
                Err(e) => {
                    tracing::debug!("{}; using {}", e, UNKNOWN_RECENCY_SCORE);
                    UNKNOWN_RECENCY_SCORE
                }
            })
            .sum();

        clamp_unit(total / fragments.len() as f64)
    }

    /// 사실 근거성
    ///
    /// 답변의 3~6단어 구절(12자 초과) 중 프래그먼트 코퍼스에 그대로 나타나는 비율 × 1.5.
    pub fn factual_grounding(&self, answer: &str, fragments: &[Fragment]) -> f64 {
        if answer.is_empty() || fragments.is_empty() {
            return 0.0;
        }

        let answer_words = words(answer);
        if answer_words.len() < MIN_PHRASE_WORDS {
            return 0.5;
        }

        let phrases = extract_phrases(&answer_words);
        if phrases.is_empty() {
            return 0.5;
        }

        let corpus = fragments
            .iter()
            .map(Fragment::text_and_title)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if corpus.trim().is_empty() {
            return 0.0;
        }

        let grounded = phrases.iter().filter(|p| corpus.contains(p.as_str())).count();
        let ratio = grounded as f64 / phrases.len() as f64;

        clamp_unit(ratio * 1.5)
    }

    /// 맥락 보강성
    ///
    /// 답변 어휘(4자 이상) 중 출처에 없는 단어의 비율이 0.15~0.5이면 1.0.
    /// 그보다 낮으면 베끼기, 높으면 환각 위험으로 감점합니다.
    pub fn contextual_enrichment(&self, answer: &str, fragments: &[Fragment]) -> f64 {
        if fragments.is_empty() {
            return 0.0;
        }

        let answer_words = keyword_set(answer);
        if answer_words.is_empty() {
            return 0.0;
        }

        let source_words: HashSet<String> = fragments
            .iter()
            .flat_map(|fragment| keyword_set(&fragment.text_and_title()))
            .collect();
        if source_words.is_empty() {
            return 0.5;
        }

        let novel = answer_words.difference(&source_words).count();
        let ratio = novel as f64 / answer_words.len() as f64;

        clamp_unit(enrichment_score(ratio))
    }

    /// 감성 정합성
    ///
    /// 프래그먼트 감성 태그의 다수 레이블과 답변 입장을 비교합니다.
    pub fn sentiment_alignment(&self, answer: &str, fragments: &[Fragment]) -> f64 {
        let Some((majority, majority_ratio)) = majority_sentiment(fragments) else {
            return 0.5;
        };

        let stance = self.indicators.stance(answer);

        let score = if stance == majority {
            majority_ratio + 0.2
        } else if stance == SentimentLabel::Neutral || majority == SentimentLabel::Neutral {
            0.7
        } else {
            0.4
        };

        clamp_unit(score)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 경과 시간 → 최신성 점수
fn recency_step(hours_old: f64) -> f64 {
    RECENCY_STEPS
        .iter()
        .find(|(max_hours, _)| hours_old <= *max_hours)
        .map_or(STALE_RECENCY_SCORE, |(_, score)| *score)
}

/// 보강 비율 → 점수 (구간별)
fn enrichment_score(ratio: f64) -> f64 {
    if (ENRICHMENT_LOW..=ENRICHMENT_HIGH).contains(&ratio) {
        1.0
    } else if ratio < ENRICHMENT_LOW {
        (ratio / ENRICHMENT_LOW).max(0.3)
    } else {
        (1.0 - (ratio - ENRICHMENT_HIGH)).max(0.5)
    }
}

/// 연속 n-gram 구절 (n = 3..=min(6, 단어 수), 12자 초과만)
fn extract_phrases(words: &[String]) -> HashSet<String> {
    let max_n = MAX_PHRASE_WORDS.min(words.len());
    let mut phrases = HashSet::new();

    for n in MIN_PHRASE_WORDS..=max_n {
        for window in words.windows(n) {
            let phrase = window.join(" ");
            if phrase.chars().count() > MIN_PHRASE_CHARS {
                phrases.insert(phrase);
            }
        }
    }

    phrases
}

/// 다수 감성 레이블과 그 비율
///
/// 동률이면 먼저 등장한 레이블이 이깁니다.
pub(crate) fn majority_sentiment(fragments: &[Fragment]) -> Option<(SentimentLabel, f64)> {
    if fragments.is_empty() {
        return None;
    }

    let mut counts: Vec<(SentimentLabel, usize)> = Vec::new();
    for fragment in fragments {
        let label = fragment.sentiment().label;
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best = counts[0];
    for &(label, count) in &counts[1..] {
        if count > best.1 {
            best = (label, count);
        }
    }

    Some((best.0, best.1 as f64 / fragments.len() as f64))
}

/// [0, 1] 범위로 제한 (NaN은 0)
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

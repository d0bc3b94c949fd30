//! Evaluation 모듈 - RAG 응답 신뢰도 평가
//!
//! - Fragment: 검색 결과 와이어 형식
//! - Metrics: 다섯 가지 독립 메트릭
//! - Aggregator: 가중 합산 + 해석 + 진단
//!
//! 모든 계산은 동기 순수 함수이며 외부 상태를 공유하지 않습니다.

mod aggregator;
mod fragment;
mod metrics;
mod timestamps;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-exports
pub use aggregator::{
    ConfidenceAggregator, Diagnostics, Interpretation, MetricWeights, SourceBreakdown,
};
pub use fragment::{Fragment, FragmentMetadata};
pub use metrics::{
    MetricKind, MetricScore, MetricScores, MetricSuite, StanceIndicators, UNKNOWN_RECENCY_SCORE,
};
pub use timestamps::{hours_between, parse_published_iso, parse_published_multi};

/// 평가 방식 표기
pub const EVALUATION_METHOD: &str = "hybrid (separate retrieve + answer calls)";

// ============================================================================
// EvaluationResult
// ============================================================================

/// 평가 결과 (생성 후 불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    /// 답변 길이 (문자 수)
    pub answer_length: usize,
    pub sources_count: usize,
    pub method: String,
    #[serde(flatten)]
    pub scores: MetricScores,
    pub overall_confidence: f64,
    pub interpretation: Interpretation,
    #[serde(rename = "detailed_analysis")]
    pub diagnostics: Diagnostics,
}

impl EvaluationResult {
    /// `MetricKind::ALL` 순서의 점수 목록
    pub fn metric_scores(&self) -> Vec<MetricScore> {
        self.scores.to_vec()
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// 평가기: MetricSuite + ConfidenceAggregator
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    metrics: MetricSuite,
    aggregator: ConfidenceAggregator,
}

impl Evaluator {
    pub fn new(metrics: MetricSuite, aggregator: ConfidenceAggregator) -> Self {
        Self {
            metrics,
            aggregator,
        }
    }

    /// 현재 시각 기준 평가
    pub fn evaluate(&self, query: &str, answer: &str, fragments: &[Fragment]) -> EvaluationResult {
        self.evaluate_at(query, answer, fragments, Utc::now())
    }

    /// 지정 시각 기준 평가
    pub fn evaluate_at(
        &self,
        query: &str,
        answer: &str,
        fragments: &[Fragment],
        now: DateTime<Utc>,
    ) -> EvaluationResult {
        let scores = self.metrics.score_all(query, answer, fragments, now);
        let overall_confidence = self.aggregator.overall(&scores);
        let interpretation = Interpretation::from_confidence(overall_confidence);
        let diagnostics = self.aggregator.diagnose(&scores, fragments, now);

        tracing::info!(
            "Evaluated query {:?}: confidence={:.3} ({})",
            query,
            overall_confidence,
            interpretation.band()
        );

        EvaluationResult {
            query: query.to_string(),
            timestamp: now,
            answer_length: answer.chars().count(),
            sources_count: fragments.len(),
            method: EVALUATION_METHOD.to_string(),
            scores,
            overall_confidence,
            interpretation,
            diagnostics,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

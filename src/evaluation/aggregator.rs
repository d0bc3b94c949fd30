//! 신뢰도 집계 - 가중 합산 + 해석 구간 + 진단
//!
//! 다섯 메트릭 점수를 하나의 신뢰도로 합치고,
//! 강점/약점/권장 사항과 출처 분석을 생성합니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::{round3, SentimentLabel};

use super::fragment::Fragment;
use super::metrics::{clamp_unit, MetricKind, MetricScores};
use super::timestamps::{hours_between, parse_published_iso};

// ============================================================================
// Constants
// ============================================================================

const STRENGTH_THRESHOLD: f64 = 0.7;
const WEAKNESS_THRESHOLD: f64 = 0.5;
const RECOMMENDATION_THRESHOLD: f64 = 0.6;
const DERIVATIVE_THRESHOLD: f64 = 0.3;
const NOVELTY_THRESHOLD: f64 = 0.7;

const NO_STRENGTHS: &str = "No significant strengths";
const NO_WEAKNESSES: &str = "No significant weaknesses";
const NO_RECOMMENDATIONS: &str = "System performing well";

// ============================================================================
// Weights
// ============================================================================

/// 메트릭 가중치 (합계 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeights {
    pub source_relevance: f64,
    pub recency: f64,
    pub factual_grounding: f64,
    pub contextual_enrichment: f64,
    pub sentiment_alignment: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            source_relevance: 0.25,
            recency: 0.20,
            factual_grounding: 0.30,
            contextual_enrichment: 0.15,
            sentiment_alignment: 0.10,
        }
    }
}

impl MetricWeights {
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::SourceRelevance => self.source_relevance,
            MetricKind::Recency => self.recency,
            MetricKind::FactualGrounding => self.factual_grounding,
            MetricKind::ContextualEnrichment => self.contextual_enrichment,
            MetricKind::SentimentAlignment => self.sentiment_alignment,
        }
    }

    pub fn total(&self) -> f64 {
        MetricKind::ALL.iter().map(|&k| self.get(k)).sum()
    }
}

// ============================================================================
// Interpretation
// ============================================================================

/// 신뢰도 해석 구간 (하한 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Interpretation {
    Poor,
    Fair,
    Moderate,
    Good,
    Excellent,
}

impl Interpretation {
    /// 신뢰도 → 구간
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.85 {
            Self::Excellent
        } else if confidence >= 0.70 {
            Self::Good
        } else if confidence >= 0.55 {
            Self::Moderate
        } else if confidence >= 0.40 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn band(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Moderate => "MODERATE",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "High confidence",
            Self::Good => "Reliable response",
            Self::Moderate => "Acceptable",
            Self::Fair => "Significant concerns",
            Self::Poor => "Low confidence",
        }
    }

    fn from_display(s: &str) -> Option<Self> {
        let band = s.split(" - ").next().unwrap_or(s).trim();
        [
            Self::Excellent,
            Self::Good,
            Self::Moderate,
            Self::Fair,
            Self::Poor,
        ]
        .into_iter()
        .find(|i| i.band().eq_ignore_ascii_case(band))
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.band(), self.description())
    }
}

impl Serialize for Interpretation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interpretation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_display(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown interpretation: {}", raw)))
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// 출처 분석
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub total_sources: usize,
    /// ISO 파싱 가능한 프래그먼트의 평균 나이 (시간, 소수점 1자리)
    pub avg_recency_hours: Option<f64>,
    pub sentiment_distribution: BTreeMap<SentimentLabel, usize>,
}

/// 진단 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub source_breakdown: SourceBreakdown,
}

// ============================================================================
// ConfidenceAggregator
// ============================================================================

/// 신뢰도 집계기
#[derive(Debug, Clone, Default)]
pub struct ConfidenceAggregator {
    weights: MetricWeights,
}

impl ConfidenceAggregator {
    pub fn new(weights: MetricWeights) -> Self {
        let total = weights.total();
        if (total - 1.0).abs() > 1e-6 {
            tracing::warn!("Metric weights sum to {:.3}, not 1.0", total);
        }
        Self { weights }
    }

    pub fn weights(&self) -> &MetricWeights {
        &self.weights
    }

    /// 가중 합산 신뢰도 (소수점 3자리)
    pub fn overall(&self, scores: &MetricScores) -> f64 {
        let overall: f64 = MetricKind::ALL
            .iter()
            .map(|&kind| self.weights.get(kind) * scores.get(kind))
            .sum();
        round3(clamp_unit(overall))
    }

    /// 진단 생성
    pub fn diagnose(
        &self,
        scores: &MetricScores,
        fragments: &[Fragment],
        now: DateTime<Utc>,
    ) -> Diagnostics {
        Diagnostics {
            strengths: strengths(scores),
            weaknesses: weaknesses(scores),
            recommendations: recommendations(scores),
            source_breakdown: source_breakdown(fragments, now),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn strengths(scores: &MetricScores) -> Vec<String> {
    let checks = [
        (scores.source_relevance, "Strong source relevance"),
        (scores.recency, "Recent information"),
        (scores.factual_grounding, "Well-grounded in sources"),
        (scores.contextual_enrichment, "Good contextual enrichment"),
    ];

    or_default(
        checks
            .iter()
            .filter(|(score, _)| *score >= STRENGTH_THRESHOLD)
            .map(|(_, msg)| msg.to_string())
            .collect(),
        NO_STRENGTHS,
    )
}

fn weaknesses(scores: &MetricScores) -> Vec<String> {
    let mut found: Vec<String> = [
        (scores.source_relevance, "Low source relevance"),
        (scores.recency, "Old information"),
        (scores.factual_grounding, "Poor factual grounding"),
    ]
    .iter()
    .filter(|(score, _)| *score < WEAKNESS_THRESHOLD)
    .map(|(_, msg)| msg.to_string())
    .collect();

    // 두 보강성 약점은 동시에 성립할 수 없음
    if scores.contextual_enrichment < DERIVATIVE_THRESHOLD {
        found.push("Too much copying".to_string());
    } else if scores.contextual_enrichment > NOVELTY_THRESHOLD {
        found.push("Too much novelty (hallucination risk)".to_string());
    }

    or_default(found, NO_WEAKNESSES)
}

fn recommendations(scores: &MetricScores) -> Vec<String> {
    let checks = [
        (
            scores.source_relevance,
            "Improve embedding model or query reformulation",
        ),
        (scores.recency, "Reduce polling interval"),
        (
            scores.factual_grounding,
            "Adjust LLM prompt to stay closer to sources",
        ),
    ];

    or_default(
        checks
            .iter()
            .filter(|(score, _)| *score < RECOMMENDATION_THRESHOLD)
            .map(|(_, msg)| msg.to_string())
            .collect(),
        NO_RECOMMENDATIONS,
    )
}

fn or_default(items: Vec<String>, default: &str) -> Vec<String> {
    if items.is_empty() {
        vec![default.to_string()]
    } else {
        items
    }
}

/// 출처 분석 (평균 나이는 ISO 전용 파싱, 실패한 프래그먼트는 제외)
fn source_breakdown(fragments: &[Fragment], now: DateTime<Utc>) -> SourceBreakdown {
    let ages: Vec<f64> = fragments
        .iter()
        .filter_map(|f| parse_published_iso(f.published_at()).ok())
        .map(|published| hours_between(published, now))
        .collect();

    let avg_recency_hours = if ages.is_empty() {
        None
    } else {
        let mean = ages.iter().sum::<f64>() / ages.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    let mut sentiment_distribution = BTreeMap::new();
    for fragment in fragments {
        *sentiment_distribution
            .entry(fragment.sentiment().label)
            .or_insert(0) += 1;
    }

    SourceBreakdown {
        total_sources: fragments.len(),
        avg_recency_hours,
        sentiment_distribution,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scores(
        relevance: f64,
        recency: f64,
        grounding: f64,
        enrichment: f64,
        sentiment: f64,
    ) -> MetricScores {
        MetricScores {
            source_relevance: relevance,
            recency,
            factual_grounding: grounding,
            contextual_enrichment: enrichment,
            sentiment_alignment: sentiment,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((MetricWeights::default().total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_overall_extremes() {
        let agg = ConfidenceAggregator::default();
        assert_eq!(agg.overall(&MetricScores::uniform(1.0)), 1.0);
        assert_eq!(agg.overall(&MetricScores::uniform(0.0)), 0.0);
    }

    #[test]
    fn test_overall_weighted() {
        let agg = ConfidenceAggregator::default();
        // 0.25*0.8 + 0.2*1.0 + 0.3*0.5 + 0.15*0.3 + 0.1*0.9 = 0.685
        assert_eq!(agg.overall(&scores(0.8, 1.0, 0.5, 0.3, 0.9)), 0.685);
    }

    #[test]
    fn test_overall_rounded_to_three_decimals() {
        let agg = ConfidenceAggregator::default();
        let overall = agg.overall(&MetricScores::uniform(1.0 / 3.0));
        assert_eq!(overall, 0.333);
    }

    #[test]
    fn test_interpretation_bands() {
        assert_eq!(Interpretation::from_confidence(1.0), Interpretation::Excellent);
        assert_eq!(Interpretation::from_confidence(0.85), Interpretation::Excellent);
        assert_eq!(Interpretation::from_confidence(0.849), Interpretation::Good);
        assert_eq!(Interpretation::from_confidence(0.70), Interpretation::Good);
        assert_eq!(Interpretation::from_confidence(0.55), Interpretation::Moderate);
        assert_eq!(Interpretation::from_confidence(0.549), Interpretation::Fair);
        assert_eq!(Interpretation::from_confidence(0.40), Interpretation::Fair);
        assert_eq!(Interpretation::from_confidence(0.399), Interpretation::Poor);
        assert_eq!(Interpretation::from_confidence(0.0), Interpretation::Poor);
    }

    #[test]
    fn test_interpretation_monotonic() {
        let mut prev = Interpretation::Poor;
        for i in 0..=1000 {
            let current = Interpretation::from_confidence(i as f64 / 1000.0);
            assert!(current >= prev);
            prev = current;
        }
    }

    #[test]
    fn test_interpretation_display_and_serde() {
        assert_eq!(
            Interpretation::Moderate.to_string(),
            "MODERATE - Acceptable"
        );
        let json = serde_json::to_string(&Interpretation::Poor).unwrap();
        assert_eq!(json, "\"POOR - Low confidence\"");
        let back: Interpretation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Interpretation::Poor);
    }

    #[test]
    fn test_all_strong_scores() {
        let agg = ConfidenceAggregator::default();
        let diag = agg.diagnose(&scores(0.9, 0.9, 0.9, 0.7, 0.9), &[], Utc::now());
        assert_eq!(diag.strengths.len(), 4);
        assert_eq!(diag.weaknesses, vec![NO_WEAKNESSES]);
        assert_eq!(diag.recommendations, vec![NO_RECOMMENDATIONS]);
    }

    #[test]
    fn test_all_weak_scores() {
        let agg = ConfidenceAggregator::default();
        let diag = agg.diagnose(&scores(0.1, 0.2, 0.3, 0.2, 0.1), &[], Utc::now());
        assert_eq!(diag.strengths, vec![NO_STRENGTHS]);
        assert_eq!(
            diag.weaknesses,
            vec![
                "Low source relevance",
                "Old information",
                "Poor factual grounding",
                "Too much copying"
            ]
        );
        assert_eq!(diag.recommendations.len(), 3);
    }

    #[test]
    fn test_novelty_weakness() {
        let agg = ConfidenceAggregator::default();
        let diag = agg.diagnose(&scores(0.9, 0.9, 0.9, 0.8, 0.9), &[], Utc::now());
        assert_eq!(diag.weaknesses, vec!["Too much novelty (hallucination risk)"]);
    }

    #[test]
    fn test_enrichment_weaknesses_exclusive() {
        for i in 0..=100 {
            let enrichment = i as f64 / 100.0;
            let w = weaknesses(&scores(0.9, 0.9, 0.9, enrichment, 0.9));
            let copying = w.iter().any(|s| s == "Too much copying");
            let novelty = w.iter().any(|s| s.starts_with("Too much novelty"));
            assert!(!(copying && novelty));
        }
    }

    #[test]
    fn test_recommendation_threshold() {
        let recs = recommendations(&scores(0.59, 0.6, 0.9, 0.5, 0.5));
        assert_eq!(recs, vec!["Improve embedding model or query reformulation"]);
    }

    #[test]
    fn test_source_breakdown() {
        let now = Utc::now();
        let fragments = vec![
            Fragment::new("a")
                .with_published_at((now - Duration::hours(2)).to_rfc3339())
                .with_sentiment("positive_0.80"),
            Fragment::new("b")
                .with_published_at((now - Duration::hours(4)).to_rfc3339())
                .with_sentiment("positive_0.70"),
            Fragment::new("c")
                .with_published_at("unknown")
                .with_sentiment("negative_0.90"),
            Fragment::new("d"),
        ];

        let breakdown = source_breakdown(&fragments, now);
        assert_eq!(breakdown.total_sources, 4);
        assert_eq!(breakdown.avg_recency_hours, Some(3.0));
        assert_eq!(breakdown.sentiment_distribution[&SentimentLabel::Positive], 2);
        assert_eq!(breakdown.sentiment_distribution[&SentimentLabel::Negative], 1);
        assert_eq!(breakdown.sentiment_distribution[&SentimentLabel::Neutral], 1);
    }

    #[test]
    fn test_source_breakdown_no_parseable_dates() {
        let fragments = vec![Fragment::new("a").with_published_at("soon")];
        let breakdown = source_breakdown(&fragments, Utc::now());
        assert_eq!(breakdown.avg_recency_hours, None);
    }
}

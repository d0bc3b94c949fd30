//! 감성 분류 모듈 - 렉시콘 + 부정/강조어 윈도우
//!
//! 짧은 텍스트(뉴스 제목 + 설명)의 감성을 판정합니다.
//! 수집 단계에서 프래그먼트 태깅에 쓰이고, 평가 단계에서 답변 분류에도 쓰입니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let classifier = SentimentClassifier::default();
//! let result = classifier.classify("Stocks surge after strong earnings");
//! assert_eq!(result.label, SentimentLabel::Positive);
//! ```

mod lexicon;
mod tag;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::text::words;

pub use lexicon::Lexicon;
pub use tag::SentimentTag;

// ============================================================================
// Constants
// ============================================================================

/// 부정어를 찾는 선행 토큰 수
pub const NEGATION_WINDOW: usize = 3;

/// 강조어를 찾는 선행 토큰 수
pub const INTENSIFIER_WINDOW: usize = 2;

/// 강조된 단어의 가중치
pub const INTENSIFIED_WEIGHT: f64 = 1.5;

/// 최대 신뢰도
pub const MAX_CONFIDENCE: f64 = 0.95;

const POSITIVE_THRESHOLD: f64 = 0.6;
const NEGATIVE_THRESHOLD: f64 = 0.4;

// ============================================================================
// Types
// ============================================================================

/// 감성 레이블
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// 대소문자 무시 레이블 파싱
    pub fn parse_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| EvalError::ParseFailure {
            field: "sentiment_label",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 감성 분류 결과
///
/// `confidence`는 항상 [0.5, 0.95] 범위이며 소수점 3자리로 반올림됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl SentimentResult {
    /// 판단 근거가 없을 때의 결과 (neutral, 0.5)
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.5,
        }
    }

    /// 저장용 `label_confidence` 태그로 변환
    pub fn to_tag(&self) -> SentimentTag {
        SentimentTag::from(*self)
    }
}

impl Default for SentimentResult {
    fn default() -> Self {
        Self::neutral()
    }
}

// ============================================================================
// SentimentClassifier
// ============================================================================

/// 렉시콘 기반 감성 분류기
///
/// 각 토큰에 대해:
/// - 앞 3토큰 안에 부정어가 있으면 극성을 뒤집고
/// - 앞 2토큰 안에 강조어가 있으면 가중치 1.5를 적용합니다.
#[derive(Debug, Clone, Default)]
pub struct SentimentClassifier {
    lexicon: Lexicon,
}

impl SentimentClassifier {
    /// 렉시콘을 지정하여 생성
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// 텍스트 감성 분류
    ///
    /// 어떤 입력에도 실패하지 않습니다. 빈 문자열은 (neutral, 0.5).
    pub fn classify(&self, text: &str) -> SentimentResult {
        let tokens = words(text);
        if tokens.is_empty() {
            return SentimentResult::neutral();
        }

        let mut positive = 0.0_f64;
        let mut negative = 0.0_f64;

        for (i, token) in tokens.iter().enumerate() {
            let is_positive = self.lexicon.is_positive(token);
            let is_negative = self.lexicon.is_negative(token);
            if !is_positive && !is_negative {
                continue;
            }

            let negated = tokens[i.saturating_sub(NEGATION_WINDOW)..i]
                .iter()
                .any(|t| self.lexicon.is_negation(t));
            let intensified = tokens[i.saturating_sub(INTENSIFIER_WINDOW)..i]
                .iter()
                .any(|t| self.lexicon.is_intensifier(t));

            let weight = if intensified { INTENSIFIED_WEIGHT } else { 1.0 };

            if is_positive {
                if negated {
                    negative += weight;
                } else {
                    positive += weight;
                }
            } else if negated {
                positive += weight;
            } else {
                negative += weight;
            }
        }

        let total = positive + negative;
        if total == 0.0 {
            return SentimentResult::neutral();
        }

        let ratio = positive / total;
        let (label, confidence) = if ratio > POSITIVE_THRESHOLD {
            (SentimentLabel::Positive, ratio.min(MAX_CONFIDENCE))
        } else if ratio < NEGATIVE_THRESHOLD {
            (SentimentLabel::Negative, (1.0 - ratio).min(MAX_CONFIDENCE))
        } else {
            (SentimentLabel::Neutral, 0.5 + (0.5 - ratio).abs())
        };

        tracing::trace!(
            "sentiment: pos={:.1} neg={:.1} ratio={:.3} -> {}",
            positive,
            negative,
            ratio,
            label
        );

        SentimentResult {
            label,
            confidence: round3(confidence),
        }
    }
}

/// 소수점 3자리 반올림
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// Tests
// ============================================================================

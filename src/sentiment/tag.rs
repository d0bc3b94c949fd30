//! `label_confidence` 감성 태그
//!
//! 저장소 메타데이터에는 감성이 `positive_0.82` 같은 단일 문자열로 저장됩니다.
//! 내부에서는 구조화된 `SentimentResult`만 다루고, 이 타입으로 경계에서만 변환합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{SentimentLabel, SentimentResult};
use crate::error::EvalError;

/// 태그가 없을 때의 기본값
pub const DEFAULT_TAG: &str = "neutral_0.50";

/// `label_confidence` 직렬화 태그
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentTag(pub SentimentResult);

impl SentimentTag {
    /// 태그 문자열 디코딩 (관대한 버전)
    ///
    /// 레이블을 알 수 없으면 (neutral, 0.5), 신뢰도만 깨졌으면 레이블은 유지하고 0.5.
    pub fn decode(raw: &str) -> SentimentResult {
        let raw = raw.trim();
        if raw.is_empty() {
            return SentimentResult::neutral();
        }

        match raw.parse::<SentimentTag>() {
            Ok(tag) => tag.0,
            Err(e) => {
                tracing::debug!("{}; falling back", e);
                let label = raw
                    .split_once('_')
                    .map_or(raw, |(label, _)| label);
                SentimentLabel::parse_label(label)
                    .map(|label| SentimentResult {
                        label,
                        confidence: 0.5,
                    })
                    .unwrap_or_default()
            }
        }
    }

    /// 선택적 메타데이터 필드 디코딩 (없으면 기본 태그)
    pub fn decode_opt(raw: Option<&str>) -> SentimentResult {
        Self::decode(raw.unwrap_or(DEFAULT_TAG))
    }

    pub fn result(&self) -> SentimentResult {
        self.0
    }
}

impl From<SentimentResult> for SentimentTag {
    fn from(result: SentimentResult) -> Self {
        Self(result)
    }
}

impl fmt::Display for SentimentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:.2}", self.0.label, self.0.confidence)
    }
}

impl FromStr for SentimentTag {
    type Err = EvalError;

    /// 엄격한 파싱: 첫 번째 `_`에서 분리, 레이블과 신뢰도 모두 유효해야 함
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || EvalError::ParseFailure {
            field: "sentiment",
            value: s.to_string(),
        };

        let (label, confidence) = s.trim().split_once('_').ok_or_else(fail)?;
        let label = SentimentLabel::parse_label(label).ok_or_else(fail)?;
        let confidence: f64 = confidence.trim().parse().map_err(|_| fail())?;
        if !confidence.is_finite() {
            return Err(fail());
        }

        Ok(Self(SentimentResult { label, confidence }))
    }
}

impl Serialize for SentimentTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SentimentTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_two_decimals() {
        let tag = SentimentTag(SentimentResult {
            label: SentimentLabel::Positive,
            confidence: 0.817,
        });
        assert_eq!(tag.to_string(), "positive_0.82");
        assert_eq!(SentimentResult::neutral().to_tag().to_string(), DEFAULT_TAG);
    }

    #[test]
    fn test_strict_parse() {
        let tag: SentimentTag = "negative_0.75".parse().unwrap();
        assert_eq!(tag.result().label, SentimentLabel::Negative);
        assert_eq!(tag.result().confidence, 0.75);

        assert!("negative".parse::<SentimentTag>().is_err());
        assert!("mixed_0.50".parse::<SentimentTag>().is_err());
        assert!("positive_high".parse::<SentimentTag>().is_err());
    }

    #[test]
    fn test_lenient_decode() {
        assert_eq!(SentimentTag::decode(""), SentimentResult::neutral());
        assert_eq!(SentimentTag::decode("garbage"), SentimentResult::neutral());

        let partial = SentimentTag::decode("positive_oops");
        assert_eq!(partial.label, SentimentLabel::Positive);
        assert_eq!(partial.confidence, 0.5);

        let bare = SentimentTag::decode("negative");
        assert_eq!(bare.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_decode_opt_default() {
        assert_eq!(SentimentTag::decode_opt(None), SentimentResult::neutral());
        assert_eq!(
            SentimentTag::decode_opt(Some("positive_0.80")).label,
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_serde_as_string() {
        let tag: SentimentTag = serde_json::from_str("\"positive_0.80\"").unwrap();
        assert_eq!(serde_json::to_string(&tag).unwrap(), "\"positive_0.80\"");
    }
}

//! 감성 렉시콘
//!
//! 분류기에 주입되는 불변 단어 집합입니다.
//! 도메인별 렉시콘을 여러 개 만들어 독립적으로 사용할 수 있습니다.

use std::collections::HashSet;


/// 뉴스 도메인 긍정어
const NEWS_POSITIVE: &[&str] = &[
    "good", "great", "excellent", "positive", "success", "win", "gain",
    "profit", "growth", "increase", "rise", "surge", "boost", "benefit",
    "improve", "advance", "progress", "achieve", "breakthrough", "innovation",
    "opportunity", "optimistic", "strong", "robust", "recover", "bullish",
    "soar", "climb", "expand", "victory", "outstanding", "remarkable",
];

/// 뉴스 도메인 부정어
const NEWS_NEGATIVE: &[&str] = &[
    "bad", "poor", "negative", "fail", "loss", "decline", "drop", "fall",
    "decrease", "plunge", "crash", "crisis", "concern", "worry", "risk",
    "threat", "danger", "problem", "issue", "challenge", "struggle", "weak",
    "bearish", "cut", "slash", "reduce", "downgrade", "collapse", "plummet",
    "warning", "fear", "terrible", "worst", "disappointing", "critical",
];

/// 부정 수식어 (축약형 포함)
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nobody", "nothing", "n't", "nor",
];

/// 강조 수식어
const INTENSIFIERS: &[&str] = &[
    "very", "extremely", "highly", "absolutely", "completely", "incredibly",
];

/// 감성 렉시콘
///
/// 모든 단어는 소문자로 저장됩니다.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
    negations: HashSet<String>,
    intensifiers: HashSet<String>,
}

impl Lexicon {
    /// 단어 목록으로 생성
    pub fn new<P, N, G, I>(positive: P, negative: N, negations: G, intensifiers: I) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            positive: to_set(positive),
            negative: to_set(negative),
            negations: to_set(negations),
            intensifiers: to_set(intensifiers),
        }
    }

    /// 뉴스 도메인 기본 렉시콘
    pub fn news() -> Self {
        Self::new(
            NEWS_POSITIVE.iter().copied(),
            NEWS_NEGATIVE.iter().copied(),
            NEGATIONS.iter().copied(),
            INTENSIFIERS.iter().copied(),
        )
    }

    pub fn is_positive(&self, token: &str) -> bool {
        self.positive.contains(token)
    }

    pub fn is_negative(&self, token: &str) -> bool {
        self.negative.contains(token)
    }

    pub fn is_negation(&self, token: &str) -> bool {
        self.negations.contains(token)
    }

    pub fn is_intensifier(&self, token: &str) -> bool {
        self.intensifiers.contains(token)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::news()
    }
}

fn to_set<T>(words: T) -> HashSet<String>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

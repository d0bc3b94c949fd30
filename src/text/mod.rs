//! 텍스트 토큰화 유틸리티
//!
//! 감성 분류기와 평가 메트릭이 공유하는 단어 단위 토큰화입니다.
//! 단어는 유니코드 `\w` 연속 구간이며 항상 소문자로 정규화됩니다.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// 키워드로 인정하는 최소 단어 길이 (문자 수)
pub const KEYWORD_MIN_CHARS: usize = 4;

fn word_regex() -> &'static Regex {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    WORD_RE.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

/// 소문자 단어 토큰 목록
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 최소 길이 이상의 고유 키워드 집합
pub fn keyword_set(text: &str) -> HashSet<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() >= KEYWORD_MIN_CHARS)
        .collect()
}

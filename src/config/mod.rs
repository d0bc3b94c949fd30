//! 설정 모듈 - 환경변수 기반 애플리케이션 설정
//!
//! 모든 값은 기본값을 가지며, 잘못된 숫자 값은 경고 후 기본값을 사용합니다.
//! CLI 플래그가 이 설정을 덮어씁니다.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::AnswerRetryPolicy;
use crate::knowledge::ChunkConfig;

/// 기본 RAG 서버 주소
pub const DEFAULT_BASE_URL: &str = "http://0.0.0.0:8000";

/// 기본 검색 결과 수
pub const DEFAULT_TOP_K: usize = 5;

/// 검색 요청 타임아웃 (초)
pub const DEFAULT_RETRIEVE_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.newsrag-eval/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".newsrag-eval")
}

// ============================================================================
// AppConfig
// ============================================================================

/// 애플리케이션 설정
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// RAG 서버 주소 (`RAG_BASE_URL`)
    pub base_url: String,
    /// 검색 결과 수 (`TOP_K`)
    pub top_k: usize,
    /// 청킹 설정 (`CHUNK_SIZE`, `CHUNK_OVERLAP`)
    pub chunk: ChunkConfig,
    /// 답변 재시도 정책 (`ANSWER_MAX_RETRIES`, `ANSWER_TIMEOUT_SECS`)
    pub answer_policy: AnswerRetryPolicy,
    /// 검색 타임아웃 (`RETRIEVE_TIMEOUT_SECS`)
    pub retrieve_timeout: Duration,
    /// 평가 결과 저장 디렉토리 (`EVAL_OUTPUT_DIR`)
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            top_k: DEFAULT_TOP_K,
            chunk: ChunkConfig::default(),
            answer_policy: AnswerRetryPolicy::default(),
            retrieve_timeout: Duration::from_secs(DEFAULT_RETRIEVE_TIMEOUT_SECS),
            output_dir: get_data_dir().join("evaluations"),
        }
    }
}

impl AppConfig {
    /// 프로세스 환경변수에서 로드
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수에서 로드 (테스트용 주입 지점)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let chunk = ChunkConfig::new(
            parse_or(get("CHUNK_SIZE"), "CHUNK_SIZE", defaults.chunk.chunk_size),
            parse_or(get("CHUNK_OVERLAP"), "CHUNK_OVERLAP", defaults.chunk.overlap),
        );

        let answer_policy = AnswerRetryPolicy {
            max_attempts: parse_or(
                get("ANSWER_MAX_RETRIES"),
                "ANSWER_MAX_RETRIES",
                defaults.answer_policy.max_attempts,
            ),
            base_timeout: Duration::from_secs(parse_or(
                get("ANSWER_TIMEOUT_SECS"),
                "ANSWER_TIMEOUT_SECS",
                defaults.answer_policy.base_timeout.as_secs(),
            )),
            ..defaults.answer_policy
        };

        Self {
            base_url: get("RAG_BASE_URL").unwrap_or(defaults.base_url),
            top_k: parse_or(get("TOP_K"), "TOP_K", defaults.top_k),
            chunk,
            answer_policy,
            retrieve_timeout: Duration::from_secs(parse_or(
                get("RETRIEVE_TIMEOUT_SECS"),
                "RETRIEVE_TIMEOUT_SECS",
                DEFAULT_RETRIEVE_TIMEOUT_SECS,
            )),
            output_dir: get("EVAL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }
}

/// 숫자 파싱 (실패 시 경고 후 기본값)
fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={:?}, using default {:?}", key, value, default);
            default
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.chunk, ChunkConfig::new(1000, 200));
        assert_eq!(config.answer_policy.max_attempts, 2);
        assert_eq!(config.answer_policy.base_timeout, Duration::from_secs(180));
        assert_eq!(config.retrieve_timeout, Duration::from_secs(60));
        assert!(config.output_dir.ends_with("evaluations"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RAG_BASE_URL", "http://rag.local:9000"),
            ("TOP_K", "8"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("ANSWER_MAX_RETRIES", "4"),
            ("ANSWER_TIMEOUT_SECS", "30"),
            ("EVAL_OUTPUT_DIR", "/tmp/evals"),
        ]);
        assert_eq!(config.base_url, "http://rag.local:9000");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.chunk, ChunkConfig::new(500, 50));
        assert_eq!(config.answer_policy.max_attempts, 4);
        assert_eq!(config.answer_policy.base_timeout, Duration::from_secs(30));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/evals"));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("TOP_K", "lots"), ("CHUNK_SIZE", "-5"), ("RAG_BASE_URL", "  ")]);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.chunk.chunk_size, 1000);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_data_dir_name() {
        assert!(get_data_dir().ends_with(".newsrag-eval"));
    }
}

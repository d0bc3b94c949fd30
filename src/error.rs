//! 에러 타입
//!
//! 평가 파이프라인 전반에서 사용하는 에러 분류입니다.
//! CLI 계층은 `anyhow`로 감싸서 컨텍스트를 덧붙입니다.

use thiserror::Error;

/// 평가 엔진 에러
#[derive(Debug, Error)]
pub enum EvalError {
    /// 잘못된 청커 설정 (호출자 버그)
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),

    /// 검색 엔드포인트 호출 실패 (재시도 없음)
    #[error("Retrieval failed: {0}")]
    RetrievalFailure(String),

    /// 답변 엔드포인트 호출 실패 (모든 재시도 소진)
    #[error("Answer generation failed after {attempts} attempt(s): {reason}")]
    AnswerFailure { attempts: u32, reason: String },

    /// 프래그먼트 단일 필드 파싱 실패
    ///
    /// 메트릭 계산 중에는 기본값으로 복구되며 외부로 전파되지 않습니다.
    #[error("Failed to parse {field}: {value:?}")]
    ParseFailure { field: &'static str, value: String },

    /// 비정상 HTTP 상태 코드
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// 서버 사전 점검 실패
    #[error("{0}")]
    Preflight(String),

    #[error("Invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// 평가 엔진 Result 별칭
pub type Result<T> = std::result::Result<T, EvalError>;

//! Client 모듈 - 원격 RAG 서버 호출
//!
//! 엔드포인트:
//! - `GET  /`                       상태 확인
//! - `POST /v1/pw_list_documents`   인덱싱된 문서 목록 (`{}`)
//! - `POST /v1/retrieve`            검색 (`{"query", "k"}`)
//! - `POST /v1/pw_ai_answer`        답변 생성 (`{"prompt"}`)
//!
//! 검색은 고정 타임아웃 한 번, 답변은 [`AnswerRetryPolicy`]에 따라 재시도합니다.

mod retry;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{EvalError, Result};
use crate::evaluation::Fragment;

pub use retry::{
    AnswerRetryPolicy, DEFAULT_BASE_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_TIMEOUT_INCREMENT_SECS,
};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const LIST_DOCUMENTS_TIMEOUT: Duration = Duration::from_secs(10);

const ANSWER_PATH: &str = "v1/pw_ai_answer";
const RETRIEVE_PATH: &str = "v1/retrieve";
const LIST_DOCUMENTS_PATH: &str = "v1/pw_list_documents";

// ============================================================================
// RagBackend Trait
// ============================================================================

/// RAG 서버 인터페이스
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// 서버 응답 여부 (상태 코드는 따지지 않음)
    async fn health(&self) -> Result<()>;

    /// 인덱싱된 문서 수
    ///
    /// 목록을 얻을 수 없거나 응답이 배열이 아니면 `None`.
    async fn document_count(&self) -> Result<Option<usize>>;

    /// 질의와 관련된 프래그먼트 상위 `k`개
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>>;

    /// 생성된 답변 (재시도 포함)
    async fn answer(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Preflight
// ============================================================================

/// 사전 점검 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightStatus {
    /// 문서가 인덱싱되어 있음
    Ready { documents: usize },
    /// 서버는 응답하지만 문서 수를 확인할 수 없음
    Responding,
}

impl std::fmt::Display for PreflightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { documents } => write!(f, "System ready ({} documents)", documents),
            Self::Responding => write!(f, "Server responding"),
        }
    }
}

/// 서버 상태와 문서 수 점검
///
/// 문서가 0개이거나 서버가 응답하지 않으면 `EvalError::Preflight`.
pub async fn preflight<B: RagBackend + ?Sized>(backend: &B) -> Result<PreflightStatus> {
    let checked = async {
        backend.health().await?;
        backend.document_count().await
    }
    .await;

    match checked {
        Ok(Some(0)) => Err(EvalError::Preflight("No documents indexed".to_string())),
        Ok(Some(documents)) => Ok(PreflightStatus::Ready { documents }),
        Ok(None) => Ok(PreflightStatus::Responding),
        Err(e) => Err(EvalError::Preflight(format!("Server not responding: {}", e))),
    }
}

// ============================================================================
// RemoteRagClient
// ============================================================================

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    k: usize,
}

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    prompt: &'a str,
}

/// HTTP RAG 클라이언트
#[derive(Debug, Clone)]
pub struct RemoteRagClient {
    client: reqwest::Client,
    base_url: Url,
    retrieve_timeout: Duration,
    answer_policy: AnswerRetryPolicy,
}

impl RemoteRagClient {
    /// 기본 정책으로 생성 (검색 60초, 답변 180초 + 60초씩 2회)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_settings(
            base_url,
            Duration::from_secs(crate::config::DEFAULT_RETRIEVE_TIMEOUT_SECS),
            AnswerRetryPolicy::default(),
        )
    }

    pub fn with_settings(
        base_url: &str,
        retrieve_timeout: Duration,
        answer_policy: AnswerRetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            retrieve_timeout,
            answer_policy,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn answer_policy(&self) -> &AnswerRetryPolicy {
        &self.answer_policy
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// 답변 1회 시도
    async fn answer_once(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint(ANSWER_PATH)?)
            .json(&AnswerRequest { prompt })
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvalError::HttpStatus(status.as_u16()));
        }

        let body: Value = response.json().await?;
        Ok(parse_answer_body(&body))
    }
}

#[async_trait]
impl RagBackend for RemoteRagClient {
    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.base_url.clone())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        tracing::debug!("Health check: HTTP {}", response.status());
        Ok(())
    }

    async fn document_count(&self) -> Result<Option<usize>> {
        let response = self
            .client
            .post(self.endpoint(LIST_DOCUMENTS_PATH)?)
            .json(&serde_json::json!({}))
            .timeout(LIST_DOCUMENTS_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("List documents: HTTP {}", response.status());
            return Ok(None);
        }

        let body: Value = response.json().await?;
        Ok(body.as_array().map(Vec::len))
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>> {
        tracing::info!("Retrieving top {} sources for {:?}", k, query);

        let response = self
            .client
            .post(self.endpoint(RETRIEVE_PATH)?)
            .json(&RetrieveRequest { query, k })
            .timeout(self.retrieve_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvalError::RetrievalFailure(format!("HTTP {}", status)));
        }

        let body: Value = response.json().await?;
        let fragments = parse_retrieve_body(body);
        tracing::info!("Retrieved {} sources", fragments.len());
        Ok(fragments)
    }

    async fn answer(&self, prompt: &str) -> Result<String> {
        let answer = self
            .answer_policy
            .run(move |_, timeout| self.answer_once(prompt, timeout))
            .await?;
        tracing::info!("Got answer ({} chars)", answer.chars().count());
        Ok(answer)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 기본 URL 정규화 (경로 결합을 위해 끝에 `/` 보장)
fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }
}

/// 검색 응답 본문 → 프래그먼트 목록
///
/// 배열이면 그대로, 객체면 `chunks` 필드, 그 외에는 빈 목록.
/// 프래그먼트로 읽을 수 없는 원소는 건너뜁니다.
pub fn parse_retrieve_body(body: Value) -> Vec<Fragment> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("chunks") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Fragment>(item) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                tracing::warn!("Skipping malformed fragment: {}", e);
                None
            }
        })
        .collect()
}

/// 답변 응답 본문 → 답변 문자열
///
/// `response`가 비어 있지 않으면 그것을, 아니면 `answer`, 둘 다 없으면 빈 문자열.
pub fn parse_answer_body(body: &Value) -> String {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    field("response")
        .or_else(|| field("answer"))
        .unwrap_or("")
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

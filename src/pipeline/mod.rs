//! Pipeline 모듈 - 원격 호출과 평가를 잇는 단일 평가 흐름
//!
//! 사전 점검 → 검색 → 답변 → 메트릭 평가 → 저장 순서로 진행합니다.
//! 원격 단계가 실패하면 부분 점수 없이 신뢰도 0.0의 실패 결과를 반환합니다.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{preflight, RagBackend};
use crate::config::DEFAULT_TOP_K;
use crate::error::Result;
use crate::evaluation::{EvaluationResult, Evaluator, Fragment};

/// 저장 파일에 포함하는 최대 소스 수
pub const SAVED_SOURCES_LIMIT: usize = 5;

/// 검색 실패 메시지
pub const RETRIEVAL_FAILED: &str = "Failed to retrieve sources";

/// 답변 실패 메시지
pub const ANSWER_FAILED: &str = "Failed to get RAG answer";

// ============================================================================
// Types
// ============================================================================

/// 실패한 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Preflight,
    Retrieval,
    Answer,
}

/// 평가 실패 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    pub error: String,
    pub confidence: f64,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_retrieved: Option<usize>,
    pub timestamp: DateTime<Utc>,
    pub stage: FailureStage,
}

impl EvaluationFailure {
    fn new(stage: FailureStage, query: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            confidence: 0.0,
            query: query.to_string(),
            sources_retrieved: None,
            timestamp: Utc::now(),
            stage,
        }
    }
}

/// 저장되는 평가 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub scores: EvaluationResult,
    pub answer: String,
    /// 상위 소스 (최대 5개)
    pub sources: Vec<Fragment>,
}

impl EvaluationRecord {
    pub fn new(scores: EvaluationResult, answer: String, sources: &[Fragment]) -> Self {
        Self {
            scores,
            answer,
            sources: sources.iter().take(SAVED_SOURCES_LIMIT).cloned().collect(),
        }
    }
}

/// 평가 결과
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    Completed {
        record: EvaluationRecord,
        saved_to: Option<PathBuf>,
    },
    Failed(EvaluationFailure),
}

impl EvaluationOutcome {
    /// 종합 신뢰도 (실패 시 0.0)
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Completed { record, .. } => record.scores.overall_confidence,
            Self::Failed(failure) => failure.confidence,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

// ============================================================================
// EvaluationPipeline
// ============================================================================

/// 평가 파이프라인
pub struct EvaluationPipeline<B> {
    backend: B,
    evaluator: Evaluator,
    top_k: usize,
    output_dir: Option<PathBuf>,
}

impl<B: RagBackend> EvaluationPipeline<B> {
    /// 기본 평가기, top_k=5, 저장 안 함
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            evaluator: Evaluator::default(),
            top_k: DEFAULT_TOP_K,
            output_dir: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// 결과 저장 디렉토리 (`None`이면 저장 안 함)
    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 단일 질의 평가
    pub async fn run(&self, query: &str) -> EvaluationOutcome {
        // 0. 사전 점검
        match preflight(&self.backend).await {
            Ok(status) => tracing::info!("Preflight: {}", status),
            Err(e) => {
                tracing::warn!("Preflight failed: {}", e);
                return EvaluationOutcome::Failed(EvaluationFailure::new(
                    FailureStage::Preflight,
                    query,
                    e.to_string(),
                ));
            }
        }

        // 1. 검색
        let fragments = match self.backend.retrieve(query, self.top_k).await {
            Ok(fragments) if !fragments.is_empty() => fragments,
            Ok(_) => {
                tracing::warn!("Retrieval returned no sources");
                return EvaluationOutcome::Failed(EvaluationFailure::new(
                    FailureStage::Retrieval,
                    query,
                    RETRIEVAL_FAILED,
                ));
            }
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                return EvaluationOutcome::Failed(EvaluationFailure::new(
                    FailureStage::Retrieval,
                    query,
                    RETRIEVAL_FAILED,
                ));
            }
        };

        // 2. 답변
        let answer = match self.backend.answer(query).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            outcome => {
                match outcome {
                    Ok(_) => tracing::warn!("Answer endpoint returned an empty answer"),
                    Err(e) => tracing::warn!("Answer failed: {}", e),
                }
                let mut failure =
                    EvaluationFailure::new(FailureStage::Answer, query, ANSWER_FAILED);
                failure.sources_retrieved = Some(fragments.len());
                return EvaluationOutcome::Failed(failure);
            }
        };

        // 3. 평가
        let result = self.evaluator.evaluate(query, &answer, &fragments);
        let record = EvaluationRecord::new(result, answer, &fragments);

        // 4. 저장 (실패해도 평가는 유효)
        let saved_to = match &self.output_dir {
            Some(dir) => match save_evaluation(dir, &record) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to save evaluation: {}", e);
                    None
                }
            },
            None => None,
        };

        EvaluationOutcome::Completed { record, saved_to }
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// `confidence_eval_YYYYMMDD_HHMMSS.json` 파일명
pub fn evaluation_file_name(at: DateTime<Local>) -> String {
    format!("confidence_eval_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// 평가 기록을 JSON으로 저장 (디렉토리 자동 생성)
pub fn save_evaluation(dir: &Path, record: &EvaluationRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(evaluation_file_name(Local::now()));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;

    tracing::info!("Saved evaluation to {}", path.display());
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct MockBackend {
        down: bool,
        documents: Option<usize>,
        fragments: Vec<Fragment>,
        retrieve_error: bool,
        answer: Option<String>,
        answer_calls: AtomicU32,
    }

    impl MockBackend {
        fn healthy(fragments: Vec<Fragment>, answer: &str) -> Self {
            Self {
                documents: Some(3),
                fragments,
                answer: Some(answer.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl RagBackend for MockBackend {
        async fn health(&self) -> Result<()> {
            if self.down {
                Err(EvalError::HttpStatus(502))
            } else {
                Ok(())
            }
        }

        async fn document_count(&self) -> Result<Option<usize>> {
            Ok(self.documents)
        }

        async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<Fragment>> {
            if self.retrieve_error {
                return Err(EvalError::RetrievalFailure("HTTP 500".to_string()));
            }
            Ok(self.fragments.iter().take(k).cloned().collect())
        }

        async fn answer(&self, _prompt: &str) -> Result<String> {
            self.answer_calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().ok_or(EvalError::AnswerFailure {
                attempts: 2,
                reason: "timeout after 240s".to_string(),
            })
        }
    }

    fn fragments(n: usize) -> Vec<Fragment> {
        let published = Utc::now().to_rfc3339();
        (0..n)
            .map(|i| {
                Fragment::new(format!("Chip exports increased sharply in quarter {}", i))
                    .with_title("Chip exports")
                    .with_published_at(published.clone())
                    .with_sentiment("positive_0.80")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_completed_run_saves_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::healthy(
            fragments(7),
            "Chip exports increased sharply, according to regional trade officials",
        );
        let pipeline = EvaluationPipeline::new(backend)
            .with_top_k(7)
            .with_output_dir(Some(dir.path().to_path_buf()));

        let outcome = pipeline.run("chip exports").await;
        let EvaluationOutcome::Completed { record, saved_to } = outcome else {
            panic!("expected a completed evaluation");
        };

        assert_eq!(record.scores.sources_count, 7);
        assert_eq!(record.sources.len(), SAVED_SOURCES_LIMIT);
        assert!(record.scores.overall_confidence > 0.0);

        let path = saved_to.expect("record should be saved");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("confidence_eval_"));
        assert!(name.ends_with(".json"));

        let saved: EvaluationRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.answer, record.answer);
        assert_eq!(saved.sources.len(), SAVED_SOURCES_LIMIT);
    }

    #[tokio::test]
    async fn test_preflight_failures() {
        let no_docs = MockBackend {
            documents: Some(0),
            ..MockBackend::healthy(fragments(1), "answer")
        };
        let outcome = EvaluationPipeline::new(no_docs).run("q").await;
        match outcome {
            EvaluationOutcome::Failed(f) => {
                assert_eq!(f.stage, FailureStage::Preflight);
                assert_eq!(f.error, "No documents indexed");
                assert_eq!(f.confidence, 0.0);
            }
            _ => panic!("expected failure"),
        }

        let down = MockBackend {
            down: true,
            ..MockBackend::healthy(fragments(1), "answer")
        };
        let outcome = EvaluationPipeline::new(down).run("q").await;
        match outcome {
            EvaluationOutcome::Failed(f) => assert!(f.error.starts_with("Server not responding")),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_empty_retrieval_short_circuits() {
        let pipeline = EvaluationPipeline::new(MockBackend::healthy(Vec::new(), "answer"));
        let outcome = pipeline.run("q").await;

        match &outcome {
            EvaluationOutcome::Failed(f) => {
                assert_eq!(f.stage, FailureStage::Retrieval);
                assert_eq!(f.error, RETRIEVAL_FAILED);
                assert_eq!(f.sources_retrieved, None);
            }
            _ => panic!("expected failure"),
        }
        assert_eq!(outcome.confidence(), 0.0);
        // 검색 실패 시 답변 호출 없음
        assert_eq!(pipeline.backend().answer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieval_error_short_circuits() {
        let backend = MockBackend {
            retrieve_error: true,
            ..MockBackend::healthy(fragments(2), "answer")
        };
        let outcome = EvaluationPipeline::new(backend).run("q").await;
        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed(EvaluationFailure { stage: FailureStage::Retrieval, .. })
        ));
    }

    #[tokio::test]
    async fn test_answer_failures_report_sources() {
        let backend = MockBackend {
            answer: None,
            ..MockBackend::healthy(fragments(3), "")
        };
        let outcome = EvaluationPipeline::new(backend).run("q").await;
        match outcome {
            EvaluationOutcome::Failed(f) => {
                assert_eq!(f.stage, FailureStage::Answer);
                assert_eq!(f.error, ANSWER_FAILED);
                assert_eq!(f.sources_retrieved, Some(3));
            }
            _ => panic!("expected failure"),
        }

        let empty = MockBackend::healthy(fragments(2), "   ");
        let outcome = EvaluationPipeline::new(empty).run("q").await;
        assert!(!outcome.is_completed());
    }

    #[tokio::test]
    async fn test_no_output_dir_skips_save() {
        let backend = MockBackend::healthy(fragments(1), "Chip exports increased sharply");
        let outcome = EvaluationPipeline::new(backend).run("chip exports").await;
        match outcome {
            EvaluationOutcome::Completed { saved_to, .. } => assert!(saved_to.is_none()),
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn test_failure_serialization() {
        let mut failure = EvaluationFailure::new(FailureStage::Answer, "q", ANSWER_FAILED);
        failure.sources_retrieved = Some(4);
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["error"], ANSWER_FAILED);
        assert_eq!(value["confidence"], 0.0);
        assert_eq!(value["sources_retrieved"], 4);
        assert_eq!(value["stage"], "answer");

        let preflight = EvaluationFailure::new(FailureStage::Preflight, "q", "down");
        let value = serde_json::to_value(&preflight).unwrap();
        assert!(value.get("sources_retrieved").is_none());
    }

    #[test]
    fn test_evaluation_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(evaluation_file_name(at), "confidence_eval_20250301_090507.json");
    }
}

//! newsrag-eval - 뉴스 RAG 응답 신뢰도 평가기
//!
//! 원격 RAG 서버에서 답변과 검색 소스를 받아 다섯 가지 메트릭
//! (소스 관련성, 최신성, 사실 근거, 맥락 보강, 감성 일치)으로
//! 종합 신뢰도를 계산합니다.
//!
//! 수집 단계에서 쓰는 감성 분류기와 문장 경계 청커도 함께 제공합니다.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod knowledge;
pub mod pipeline;
pub mod sentiment;
pub mod text;

// Re-exports
pub use client::{AnswerRetryPolicy, PreflightStatus, RagBackend, RemoteRagClient};
pub use config::{get_data_dir, AppConfig};
pub use error::{EvalError, Result};
pub use evaluation::{
    ConfidenceAggregator, Diagnostics, EvaluationResult, Evaluator, Fragment, FragmentMetadata,
    Interpretation, MetricKind, MetricScore, MetricScores, MetricSuite, MetricWeights,
};
pub use knowledge::{
    chunk_text, ArticlePreparer, Chunk, ChunkConfig, Chunker, NewsArticle, SentenceChunker,
};
pub use pipeline::{EvaluationFailure, EvaluationOutcome, EvaluationPipeline, EvaluationRecord};
pub use sentiment::{Lexicon, SentimentClassifier, SentimentLabel, SentimentResult, SentimentTag};

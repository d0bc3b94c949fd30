//! Knowledge 모듈 - 수집 단계 문서 준비
//!
//! - Chunker: 문장 경계 인식 텍스트 분할
//! - Article: 뉴스 기사 → 감성 태깅된 프래그먼트
//!
//! 벡터 인덱싱과 저장은 외부 RAG 서버가 담당합니다.

mod article;
mod chunker;

// Re-exports
pub use article::{ArticlePreparer, ArticleSource, NewsArticle};
pub use chunker::{
    chunk_text, default_chunker, sentence_chunker, Chunk, ChunkConfig, Chunker, SentenceChunker,
};

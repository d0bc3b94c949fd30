//! Text Chunking Module
//!
//! 문장 경계 인식 텍스트 분할을 제공합니다.
//! 고정 크기 윈도우를 쓰되, 윈도우 뒤쪽 절반에 문장 종결 문자가 있으면
//! 그 뒤에서 자릅니다. 연속된 청크는 `overlap` 문자만큼 겹칩니다.
//!
//! 모든 크기와 오프셋은 바이트가 아닌 문자(char) 단위입니다.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// 문장 종결 문자
const SENTENCE_TERMINALS: [char; 4] = ['.', '!', '?', '\n'];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 청크 최대 크기 (문자 수)
    pub chunk_size: usize,
    /// 오버랩 크기 (문자 수)
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// 짧은 뉴스 요약용 설정
    pub fn for_headlines() -> Self {
        Self {
            chunk_size: 300,
            overlap: 50,
        }
    }

    /// 빠른 인덱싱용 설정 (오버랩 없음)
    pub fn for_fast() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 0,
        }
    }

    /// 설정 검증: `chunk_size > 0`, `overlap < chunk_size`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(EvalError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(EvalError::InvalidConfig(format!(
                "overlap ({}) must be less than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// 원문 내 위치를 포함한 청크
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 앞뒤 공백이 제거된 청크 텍스트
    pub text: String,
    /// 원문 기준 시작 문자 오프셋 (포함)
    pub start: usize,
    /// 원문 기준 끝 문자 오프셋 (미포함)
    pub end: usize,
}

impl Chunk {
    /// 문자 수
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SentenceChunker
// ============================================================================

/// 문장 경계 스냅 청커
///
/// - 청크는 항상 비어있지 않음
/// - 청크 순서는 원문 순서와 같음
/// - 문장 종결 문자는 앞 청크에 남음
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    config: ChunkConfig,
}

impl SentenceChunker {
    /// 설정으로 생성 (검증 실패 시 `InvalidConfig`)
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 위치 정보를 포함하여 분할
    pub fn chunk_spans(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let size = self.config.chunk_size;
        let overlap = self.config.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let end = self.find_end(&chars, start);
            if let Some(chunk) = trimmed_span(&chars, start, end) {
                chunks.push(chunk);
            }

            if end >= len {
                break;
            }

            // 스냅으로 end가 당겨졌을 때도 커서는 반드시 전진
            start = end.saturating_sub(overlap).max(start + 1);
        }

        tracing::debug!(
            "Chunked {} chars into {} chunks (size={}, overlap={})",
            len,
            chunks.len(),
            size,
            overlap
        );

        chunks
    }

    /// 청크 끝 위치 결정
    ///
    /// 윈도우가 원문 끝을 넘지 않으면 `end-1`부터 `start + size/2` 직전까지
    /// 거꾸로 훑어 첫 문장 종결 문자 바로 뒤에서 자릅니다.
    fn find_end(&self, chars: &[char], start: usize) -> usize {
        let size = self.config.chunk_size;
        let end = start + size;
        if end >= chars.len() {
            return chars.len();
        }

        let floor = start + size / 2;
        (floor + 1..end)
            .rev()
            .find(|&i| SENTENCE_TERMINALS.contains(&chars[i]))
            .map_or(end, |i| i + 1)
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        self.chunk_spans(text).into_iter().map(|c| c.text).collect()
    }

    fn name(&self) -> &'static str {
        "SentenceChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `chars[start..end]`의 앞뒤 공백을 제거한 청크 (비어있으면 None)
fn trimmed_span(chars: &[char], start: usize, end: usize) -> Option<Chunk> {
    let window = &chars[start..end];
    let lead = window.iter().take_while(|c| c.is_whitespace()).count();
    if lead == window.len() {
        return None;
    }
    let trail = window.iter().rev().take_while(|c| c.is_whitespace()).count();

    let span_start = start + lead;
    let span_end = end - trail;

    Some(Chunk {
        text: chars[span_start..span_end].iter().collect(),
        start: span_start,
        end: span_end,
    })
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 텍스트 분할 (함수형 인터페이스)
///
/// `chunk_size == 0` 또는 `overlap >= chunk_size`이면 `InvalidConfig`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let chunker = SentenceChunker::new(ChunkConfig::new(chunk_size, overlap))?;
    Ok(chunker.chunk(text))
}

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(SentenceChunker::with_defaults())
}

/// 문장 청커 생성 (설정 지정)
pub fn sentence_chunker(config: ChunkConfig) -> Result<Box<dyn Chunker>> {
    Ok(Box::new(SentenceChunker::new(config)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunker_empty() {
        let chunks = chunk_text("", 100, 10).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        let chunks = chunk_text("   \n\n   ", 4, 1).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            chunk_text("abc", 0, 0),
            Err(EvalError::InvalidConfig(_))
        ));
        assert!(matches!(
            chunk_text("abc", 10, 10),
            Err(EvalError::InvalidConfig(_))
        ));
        assert!(matches!(
            SentenceChunker::new(ChunkConfig::new(5, 7)),
            Err(EvalError::InvalidConfig(_))
        ));
        assert!(chunk_text("abc", 10, 9).is_ok());
    }

    #[test]
    fn test_single_chunk_when_text_fits() {
        let text = "  Researchers announced a major AI breakthrough today.  ";
        let chunks = chunk_text(text, text.chars().count() + 10, 0).unwrap();
        assert_eq!(chunks, vec![text.trim().to_string()]);
    }

    #[test]
    fn test_hard_cut_without_punctuation() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, 10, 0).unwrap();
        assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_hard_cut_with_overlap() {
        let text = "abcdefghijklmnopqrst";
        let chunks = chunk_text(text, 10, 3).unwrap();
        assert_eq!(chunks, vec!["abcdefghij", "hijklmnopq", "opqrst"]);
    }

    #[test]
    fn test_snaps_to_sentence_end() {
        // 윈도우 [0, 22), 뒤쪽 절반(12..22)에 '.' 위치 16
        let text = "First part of it. Second sentence here.";
        let chunks = chunk_text(text, 22, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First part of it.");
        assert_eq!(chunks[1], "Second sentence here.");
    }

    #[test]
    fn test_ignores_terminal_in_front_half() {
        // '.'가 인덱스 2 (앞쪽 절반) -> 하드 컷
        let text = "Hi. abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, 10, 0).unwrap();
        assert_eq!(chunks[0], "Hi. abcdef");
    }

    #[test]
    fn test_newline_is_terminal() {
        let text = "line one ok\nline two is longer";
        let chunks = chunk_text(text, 14, 0).unwrap();
        assert_eq!(chunks[0], "line one ok");
        assert_eq!(chunks[1], "line two is lo");
    }

    #[test]
    fn test_spans_reconstruct_original() {
        let text = "Alpha beta gamma. Delta epsilon zeta! Eta theta iota? Kappa lambda mu.";
        let chunker = SentenceChunker::new(ChunkConfig::new(24, 0)).unwrap();
        let chars: Vec<char> = text.chars().collect();

        for chunk in chunker.chunk_spans(text) {
            let slice: String = chars[chunk.start..chunk.end].iter().collect();
            assert_eq!(slice, chunk.text);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_spans_ordered_with_overlap() {
        let text = "The quick brown fox jumps over the lazy dog and keeps running far away";
        let chunker = SentenceChunker::new(ChunkConfig::new(20, 5)).unwrap();
        let spans = chunker.chunk_spans(text);

        assert!(spans.len() > 2);
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
            assert!(pair[1].start <= pair[0].end);
        }
        assert_eq!(spans.last().map(|c| c.end), Some(text.chars().count()));
    }

    #[test]
    fn test_large_overlap_still_progresses() {
        // 스냅 후 end - overlap <= start 가 되는 경우에도 종료해야 함
        let text = "aaaaaa. bbbbbb. cccccc. dddddd. eeeeee.";
        let chunks = chunk_text(text, 10, 9).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.len() <= text.chars().count());
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert!(chunks.last().is_some_and(|c| c.ends_with("eeeeee.")));

        let chunker = SentenceChunker::new(ChunkConfig::new(10, 9)).unwrap();
        let spans = chunker.chunk_spans(text);
        assert_eq!(spans.last().map(|c| c.end), Some(text.chars().count()));
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "안녕하세요. 반갑습니다. 오늘 뉴스를 전해드립니다.";
        let chunks = chunk_text(text, 10, 2).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_config_presets() {
        let default = ChunkConfig::default();
        assert_eq!(default.chunk_size, 1000);
        assert_eq!(default.overlap, 200);

        let headlines = ChunkConfig::for_headlines();
        assert!(headlines.validate().is_ok());
        assert_eq!(headlines.overlap, 50);

        let fast = ChunkConfig::for_fast();
        assert_eq!(fast.overlap, 0);
    }

    #[test]
    fn test_factories() {
        let chunker = default_chunker();
        assert_eq!(chunker.name(), "SentenceChunker");
        assert!(sentence_chunker(ChunkConfig::new(3, 3)).is_err());
    }
}

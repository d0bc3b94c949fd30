//! CLI 모듈
//!
//! newsrag-eval CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::client::{preflight, RemoteRagClient};
use crate::config::{get_data_dir, AppConfig};
use crate::evaluation::{EvaluationResult, MetricKind};
use crate::knowledge::{ArticlePreparer, ChunkConfig, NewsArticle, SentenceChunker};
use crate::pipeline::{EvaluationOutcome, EvaluationPipeline};
use crate::sentiment::SentimentClassifier;

/// 질의가 없을 때 사용하는 기본 질의
pub const DEFAULT_QUERY: &str = "What are the latest developments in AI technology?";

/// 종료 코드 기준: 이 이상이면 0
const CONFIDENT_THRESHOLD: f64 = 0.7;
/// 종료 코드 기준: 이 이상이면 1, 미만이면 2
const ACCEPTABLE_THRESHOLD: f64 = 0.5;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "newsrag-eval")]
#[command(version, about = "뉴스 RAG 응답 신뢰도 평가기", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// RAG 서버에 질의하고 답변 신뢰도 평가
    Evaluate {
        /// 평가할 질의 (생략 시 기본 질의)
        query: Vec<String>,

        /// 검색할 소스 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// 답변 최대 시도 횟수
        #[arg(long)]
        max_retries: Option<u32>,

        /// RAG 서버 주소
        #[arg(long)]
        base_url: Option<String>,

        /// 결과 저장 디렉토리
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 결과 파일 저장 안 함
        #[arg(long)]
        no_save: bool,

        /// 결과를 JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 텍스트 감성 분류
    Classify {
        /// 분류할 텍스트
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// 텍스트를 청크로 분할
    Chunk {
        /// 입력 파일
        #[arg(long)]
        file: Option<PathBuf>,

        /// 직접 입력할 텍스트
        #[arg(short, long)]
        text: Option<String>,

        /// 청크 크기 (문자 수)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// 오버랩 크기 (문자 수)
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// 뉴스 기사(JSON 배열)를 감성 태깅된 프래그먼트(JSON Lines)로 변환
    Prepare {
        /// 기사 JSON 파일
        #[arg(short, long)]
        input: PathBuf,

        /// 출력 파일 (생략 시 표준 출력)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 설정 및 서버 상태 확인
    Status {
        /// RAG 서버 주소
        #[arg(long)]
        base_url: Option<String>,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Evaluate {
            query,
            top_k,
            max_retries,
            base_url,
            output_dir,
            no_save,
            json,
        } => {
            let query = if query.is_empty() {
                DEFAULT_QUERY.to_string()
            } else {
                query.join(" ")
            };
            let mut config = config;
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            if let Some(max_retries) = max_retries {
                config.answer_policy = config.answer_policy.with_max_attempts(max_retries);
            }
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            cmd_evaluate(&query, config, !no_save, json).await
        }
        Commands::Classify { text } => cmd_classify(&text.join(" ")).map(|_| ExitCode::SUCCESS),
        Commands::Chunk {
            file,
            text,
            chunk_size,
            overlap,
        } => {
            let chunk = ChunkConfig::new(
                chunk_size.unwrap_or(config.chunk.chunk_size),
                overlap.unwrap_or(config.chunk.overlap),
            );
            cmd_chunk(file, text, chunk).map(|_| ExitCode::SUCCESS)
        }
        Commands::Prepare { input, output } => {
            cmd_prepare(input, output, config.chunk).map(|_| ExitCode::SUCCESS)
        }
        Commands::Status { base_url } => {
            let mut config = config;
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            cmd_status(&config).await.map(|_| ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 평가 명령어 (evaluate)
///
/// 사전 점검 → 검색 → 답변 → 평가 → 저장 후 신뢰도에 따른 종료 코드를 반환합니다.
async fn cmd_evaluate(
    query: &str,
    config: AppConfig,
    save: bool,
    json: bool,
) -> Result<ExitCode> {
    let client = RemoteRagClient::with_settings(
        &config.base_url,
        config.retrieve_timeout,
        config.answer_policy,
    )
    .context("RAG 클라이언트 생성 실패")?;

    println!("[*] 질의: \"{}\"", query);
    println!(
        "[*] 서버: {} (top_k={}, 답변 시도 {}회)",
        client.base_url(),
        config.top_k,
        config.answer_policy.max_attempts
    );

    let pipeline = EvaluationPipeline::new(client)
        .with_top_k(config.top_k)
        .with_output_dir(save.then(|| config.output_dir.clone()));

    let outcome = pipeline.run(query).await;

    match &outcome {
        EvaluationOutcome::Completed { record, saved_to } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record.scores).context("결과 직렬화 실패")?
                );
            } else {
                print_results(&record.scores);
            }
            if let Some(path) = saved_to {
                println!("[OK] 저장됨: {}", path.display());
            }
        }
        EvaluationOutcome::Failed(failure) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(failure).context("결과 직렬화 실패")?
                );
            } else {
                println!("[!] 평가 실패: {}", failure.error);
                if let Some(n) = failure.sources_retrieved {
                    println!("    검색된 소스: {} 건", n);
                }
            }
        }
    }

    Ok(ExitCode::from(exit_code_for(outcome.confidence())))
}

/// 분류 명령어 (classify)
fn cmd_classify(text: &str) -> Result<()> {
    let result = SentimentClassifier::default().classify(text);

    println!("[OK] 감성: {}", result.label);
    println!("     신뢰도: {:.2}", result.confidence);
    println!("     태그: {}", result.to_tag());

    Ok(())
}

/// 청킹 명령어 (chunk)
fn cmd_chunk(file: Option<PathBuf>, text: Option<String>, config: ChunkConfig) -> Result<()> {
    let content = match (file, text) {
        (Some(path), None) => std::fs::read_to_string(&path)
            .with_context(|| format!("파일 읽기 실패: {}", path.display()))?,
        (None, Some(text)) => text,
        _ => bail!("--file 또는 --text 중 하나만 지정해야 합니다"),
    };

    let chunker = SentenceChunker::new(config).context("청킹 설정 오류")?;
    let chunks = chunker.chunk_spans(&content);

    if chunks.is_empty() {
        println!("[!] 청크가 없습니다 (빈 입력)");
        return Ok(());
    }

    println!(
        "[OK] {} 청크 (size={}, overlap={}):\n",
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "{}. [{}..{}] {} chars",
            i + 1,
            chunk.start,
            chunk.end,
            chunk.char_len()
        );
        println!("   {}", truncate_text(&chunk.text, 120));
        println!();
    }

    Ok(())
}

/// 준비 명령어 (prepare)
///
/// 기사 배열을 읽어 한 줄에 프래그먼트 하나씩 JSON Lines로 출력합니다.
fn cmd_prepare(input: PathBuf, output: Option<PathBuf>, config: ChunkConfig) -> Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("파일 읽기 실패: {}", input.display()))?;
    let articles: Vec<NewsArticle> =
        serde_json::from_str(&raw).context("기사 JSON 파싱 실패 (배열 형식이어야 합니다)")?;

    let chunker = SentenceChunker::new(config).context("청킹 설정 오류")?;
    let preparer = ArticlePreparer::new(SentimentClassifier::default(), chunker);
    let fragments = preparer.prepare_batch(&articles, Utc::now());

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("파일 생성 실패: {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    for fragment in &fragments {
        let line = serde_json::to_string(fragment).context("프래그먼트 직렬화 실패")?;
        writeln!(writer, "{}", line).context("출력 실패")?;
    }
    writer.flush().context("출력 실패")?;

    if let Some(path) = output {
        println!(
            "[OK] {} 기사 → {} 프래그먼트: {}",
            articles.len(),
            fragments.len(),
            path.display()
        );
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("newsrag-eval v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", get_data_dir().display());
    println!("[*] 결과 저장 디렉토리: {}", config.output_dir.display());
    println!(
        "[*] 청킹: size={}, overlap={}",
        config.chunk.chunk_size, config.chunk.overlap
    );
    let schedule: Vec<String> = config
        .answer_policy
        .schedule()
        .iter()
        .map(|d| format!("{}s", d.as_secs()))
        .collect();
    println!("[*] 답변 타임아웃 일정: {}", schedule.join(" → "));

    let client = RemoteRagClient::with_settings(
        &config.base_url,
        config.retrieve_timeout,
        config.answer_policy,
    )
    .context("RAG 클라이언트 생성 실패")?;

    match preflight(&client).await {
        Ok(status) => println!("[OK] 서버 {}: {}", client.base_url(), status),
        Err(e) => println!("[!] 서버 {}: {}", client.base_url(), e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 신뢰도 → 종료 코드 (0: 신뢰, 1: 보통, 2: 낮음)
pub fn exit_code_for(confidence: f64) -> u8 {
    if confidence >= CONFIDENT_THRESHOLD {
        0
    } else if confidence >= ACCEPTABLE_THRESHOLD {
        1
    } else {
        2
    }
}

/// 평가 결과 보고서 출력
fn print_results(result: &EvaluationResult) {
    let rule = "=".repeat(80);
    println!("\n{}", rule);
    println!(" CONFIDENCE EVALUATION RESULTS");
    println!("{}", rule);

    println!("\n Overall Confidence: {}", percent(result.overall_confidence));
    println!(" Interpretation: {}\n", result.interpretation);

    println!("Detailed Scores:");
    for kind in MetricKind::ALL {
        println!(
            "  - {:<22} {}",
            format!("{}:", kind.label()),
            percent(result.scores.get(kind))
        );
    }

    let analysis = &result.diagnostics;
    print_list("Strengths", &analysis.strengths);
    print_list("Weaknesses", &analysis.weaknesses);
    print_list("Recommendations", &analysis.recommendations);

    let breakdown = &analysis.source_breakdown;
    println!("\n Source Analysis:");
    println!("  - Total Sources: {}", breakdown.total_sources);
    if let Some(hours) = breakdown.avg_recency_hours {
        println!("  - Average Age: {:.1} hours", hours);
    }
    if !breakdown.sentiment_distribution.is_empty() {
        let dist: Vec<String> = breakdown
            .sentiment_distribution
            .iter()
            .map(|(label, count)| format!("{}: {}", label, count))
            .collect();
        println!("  - Sentiment: {}", dist.join(", "));
    }

    println!("\n{}\n", rule);
}

fn print_list(title: &str, items: &[String]) {
    println!("\n {}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

/// 0.8123 → "81.23%"
fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

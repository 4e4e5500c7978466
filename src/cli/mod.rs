//! CLI 모듈
//!
//! rag-core CLI 명령어 정의 및 구현.
//! 저장소는 메모리에만 존재하므로 매 실행마다 인덱싱 후 질의합니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::collector::{CollectedFile, FileCollector};
use crate::config::RagConfig;
use crate::knowledge::{ChunkStrategy, Chunker, ExtractiveAnswerer, RetrievalPipeline, RetrievalResponse};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "rag-core")]
#[command(version, about = "인메모리 하이브리드 RAG 엔진", long_about = None)]
pub struct Cli {
    /// JSON 설정 파일
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일을 청크로 나눠 출력
    Chunk {
        /// 대상 파일
        file: PathBuf,

        /// 청킹 전략 (sentence, size, paragraph)
        #[arg(short, long)]
        strategy: Option<ChunkStrategy>,

        /// 청크 크기 (문자 수)
        #[arg(long)]
        size: Option<usize>,

        /// 오버랩 크기 (문자 수)
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// 파일/폴더를 인덱싱한 뒤 질문
    Query {
        /// 질문
        question: String,

        /// 인덱싱할 파일 (여러 번 지정 가능)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// 인덱싱할 폴더 (재귀)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 결과 개수
        #[arg(short, long)]
        limit: Option<usize>,

        /// 하이브리드 검색 시맨틱 가중치 (지정 시 하이브리드)
        #[arg(short, long)]
        weight: Option<f32>,

        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 실제 적용되는 설정 출력
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chunk {
            file,
            strategy,
            size,
            overlap,
        } => cmd_chunk(&config, &file, strategy, size, overlap),
        Commands::Query {
            question,
            file,
            dir,
            limit,
            weight,
            json,
        } => cmd_query(config, &question, &file, dir.as_deref(), limit, weight, json),
        Commands::Status => cmd_status(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    match path {
        Some(path) => RagConfig::from_file(path).context("설정 파일 읽기 실패"),
        None => Ok(RagConfig::default()),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 청킹 명령어 (chunk)
fn cmd_chunk(
    config: &RagConfig,
    file: &Path,
    strategy: Option<ChunkStrategy>,
    size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let config = chunk_overrides(config, size, overlap);
    let strategy = strategy.unwrap_or(config.strategy);

    let chunker = Chunker::new(config.chunk_config()).context("청커 생성 실패")?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("파일 읽기 실패: {:?}", file))?;

    let chunks = chunker.chunk(&text, strategy);

    println!(
        "[*] 청킹 결과 ({}, 크기 {}, 오버랩 {}):",
        strategy,
        config.chunk_size,
        config.overlap()
    );
    println!("{}", "=".repeat(50));
    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "청크 {} ({}자): {}",
            i + 1,
            chunk.chars().count(),
            truncate_text(chunk, 80)
        );
    }
    println!("{}", "=".repeat(50));
    println!("[OK] 총 {}개 청크 생성", chunks.len());

    Ok(())
}

/// chunk 명령어 인자로 청크 크기/오버랩 덮어쓰기
///
/// `--size`만 주어졌고 기존 오버랩이 새 크기 이상이면 `size / 5`로 다시 정합니다.
fn chunk_overrides(config: &RagConfig, size: Option<usize>, overlap: Option<usize>) -> RagConfig {
    let mut config = config.clone();
    if let Some(size) = size {
        config.chunk_size = size;
        let stale = config.overlap_size.map_or(true, |kept| kept >= size);
        if overlap.is_none() && stale {
            config.overlap_size = Some(size / 5);
        }
    }
    if let Some(overlap) = overlap {
        config.overlap_size = Some(overlap);
    }
    config
}

/// 질의 명령어 (query)
fn cmd_query(
    mut config: RagConfig,
    question: &str,
    files: &[PathBuf],
    dir: Option<&Path>,
    limit: Option<usize>,
    weight: Option<f32>,
    json: bool,
) -> Result<()> {
    if let Some(limit) = limit {
        config.top_k = limit;
    }

    let documents = collect_documents(files, dir)?;
    if documents.is_empty() {
        bail!("인덱싱할 문서가 없습니다. --file 또는 --dir를 지정하세요");
    }

    let mut pipeline = RetrievalPipeline::from_config(&config, Box::new(ExtractiveAnswerer::default()))
        .context("파이프라인 생성 실패")?;

    let total = pipeline
        .index_documents(documents.iter().map(|d| (d.source_id.as_str(), d.content.as_str())))
        .context("인덱싱 실패")?;
    tracing::info!("Indexed {} files into {} chunks", documents.len(), total);

    let response = match weight {
        Some(w) => pipeline.query_hybrid(question, w),
        None => pipeline.query(question),
    }
    .context("검색 실패")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("JSON 직렬화 실패")?
        );
    } else {
        print_response(&response, weight.is_some());
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("rag-core v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("[*] 청크 크기: {} (오버랩 {})", config.chunk_size, config.overlap());
    println!("[*] 청킹 전략: {}", config.strategy);
    println!("[*] 임베딩 차원: {}", config.embedding_dim);
    println!("[*] Top-K: {}", config.top_k);
    println!("[*] 시맨틱 가중치: {:.2}", config.semantic_weight);

    match config.validate() {
        Ok(()) => println!("[OK] 설정 유효"),
        Err(e) => println!("[!] 설정 오류: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// --file, --dir 순으로 수집 (같은 파일은 한 번만)
///
/// 출처 ID가 겹치면 나중 파일은 정규화된 전체 경로를 ID로 씁니다.
fn collect_documents(files: &[PathBuf], dir: Option<&Path>) -> Result<Vec<CollectedFile>> {
    let collector = FileCollector::with_defaults();

    let mut collected = Vec::new();
    for file in files {
        collected.push(collector.collect_file(file)?);
    }
    if let Some(dir) = dir {
        collected.extend(collector.collect_directory(dir)?);
    }

    Ok(dedupe_documents(collected))
}

fn dedupe_documents(collected: Vec<CollectedFile>) -> Vec<CollectedFile> {
    let mut seen_paths = HashSet::new();
    let mut seen_ids = HashSet::new();
    let mut documents = Vec::with_capacity(collected.len());

    for mut file in collected {
        let canonical = std::fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
        if !seen_paths.insert(canonical.clone()) {
            tracing::debug!("Skipping already collected file: {:?}", file.path);
            continue;
        }
        if !seen_ids.insert(file.source_id.clone()) {
            file.source_id = canonical.to_string_lossy().replace('\\', "/");
            seen_ids.insert(file.source_id.clone());
        }
        documents.push(file);
    }

    documents
}

fn print_response(response: &RetrievalResponse, hybrid: bool) {
    println!("\n질문: {}", response.question);
    println!("{}", "─".repeat(40));
    println!("답변: {}", response.answer);

    if response.results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return;
    }

    let label = if hybrid { "결합 점수" } else { "유사도" };
    println!("\n참고 문서:");
    for (i, result) in response.results.iter().enumerate() {
        println!(
            "  [{}] {}: {:.3} ({}) {}",
            i + 1,
            label,
            result.score,
            result.id,
            truncate_text(&result.text, 60)
        );
    }

    if !response.sources.is_empty() {
        println!("출처: {}", response.sources.join(", "));
    }
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

//! RAG 파이프라인 - 인덱싱(청킹 → 임베딩 → 저장)과 질의(검색 → 컨텍스트 구성)
//!
//! 답변 생성은 외부 `Answerer`에 위임하고, 그 결과를 그대로 응답에 담습니다.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::RagConfig;
use crate::embedding::HashEmbedding;
use crate::error::{RagError, Result};

use super::chunker::{ChunkConfig, ChunkStrategy, Chunker};
use super::hybrid::HybridScorer;
use super::vector::{SearchResult, VectorStore};

/// 메타데이터 키: 원본 문서 ID
pub const SOURCE_KEY: &str = "source";
/// 메타데이터 키: 청크 순번
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// 컨텍스트 청크 구분자 (빈 줄)
const CONTEXT_SEPARATOR: &str = "\n\n";

// ============================================================================
// Answerer
// ============================================================================

/// 답변 생성기 (외부 협력자)
///
/// 구성된 컨텍스트와 원래 질문을 받아 답변 텍스트를 돌려줍니다.
pub trait Answerer: Send + Sync {
    fn answer(&self, context: &str, question: &str) -> String;
}

impl<F> Answerer for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn answer(&self, context: &str, question: &str) -> String {
        self(context, question)
    }
}

/// 추출형 답변기 (LLM 호출 시뮬레이션)
///
/// 컨텍스트의 첫 문단(빈 줄 기준)을 잘라 그대로 돌려줍니다.
/// 컨텍스트에는 청크 경계가 따로 표시되지 않으므로, 여러 문단으로 된
/// 최상위 청크는 그 첫 문단만 사용됩니다.
#[derive(Debug, Clone)]
pub struct ExtractiveAnswerer {
    pub max_chars: usize,
}

impl Default for ExtractiveAnswerer {
    fn default() -> Self {
        Self { max_chars: 150 }
    }
}

impl Answerer for ExtractiveAnswerer {
    fn answer(&self, context: &str, question: &str) -> String {
        let top = context.split(CONTEXT_SEPARATOR).next().unwrap_or("").trim();
        if top.is_empty() {
            return "I don't have enough information.".to_string();
        }

        let excerpt = truncate_chars(top, self.max_chars);
        let lowered = question.to_lowercase();
        if lowered.starts_with("what") || question.contains("무엇") || question.contains("뭐") {
            format!("According to the documents: {}", excerpt)
        } else if lowered.starts_with("how") || question.contains("어떻게") {
            format!("Here is how: {}", excerpt)
        } else {
            format!("Related information: {}", excerpt)
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// RAG 프롬프트 생성
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant. Answer the question based on the provided context.\n\
         If the answer cannot be found in the context, say \"I don't have enough information.\"\n\
         \n\
         ### Context:\n\
         {}\n\
         \n\
         ### Question:\n\
         {}\n\
         \n\
         ### Answer:\n",
        context, question
    )
}

// ============================================================================
// Response
// ============================================================================

/// 응답에 담기는 검색 결과 (벡터 검색이면 유사도, 하이브리드면 결합 스코어)
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source: Option<String>,
    pub score: f32,
}

impl From<&SearchResult<'_>> for RetrievedChunk {
    fn from(result: &SearchResult<'_>) -> Self {
        Self {
            id: result.document.id.clone(),
            text: result.document.text.clone(),
            source: result.document.metadata.get(SOURCE_KEY).cloned(),
            score: result.similarity,
        }
    }
}

/// RAG 응답
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResponse {
    pub question: String,
    pub answer: String,
    /// 순위대로 이어 붙인 청크 텍스트 (빈 줄 구분)
    pub context: String,
    pub prompt: String,
    /// 중복 없는 출처 (처음 등장 순서)
    pub sources: Vec<String>,
    pub results: Vec<RetrievedChunk>,
}

// ============================================================================
// RetrievalPipeline
// ============================================================================

/// RAG 파이프라인
pub struct RetrievalPipeline {
    chunker: Chunker,
    strategy: ChunkStrategy,
    store: VectorStore,
    top_k: usize,
    answerer: Box<dyn Answerer>,
}

impl RetrievalPipeline {
    /// 새 파이프라인 생성 (문단 청킹, 오버랩 = 청크 크기 / 5)
    ///
    /// # Errors
    /// 청크 크기, 차원, top_k 중 하나라도 0이면 `InvalidArgument`
    pub fn new(
        chunk_size: usize,
        embedding_dim: usize,
        top_k: usize,
        answerer: Box<dyn Answerer>,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::invalid("top_k must be positive"));
        }

        let chunker = Chunker::new(ChunkConfig::with_target(chunk_size))?;
        let embedder = HashEmbedding::new(embedding_dim)?;

        Ok(Self {
            chunker,
            strategy: ChunkStrategy::Paragraph,
            store: VectorStore::new(Box::new(embedder)),
            top_k,
            answerer,
        })
    }

    /// 설정으로 생성
    pub fn from_config(config: &RagConfig, answerer: Box<dyn Answerer>) -> Result<Self> {
        config.validate()?;

        let chunker = Chunker::new(config.chunk_config())?;
        let embedder = HashEmbedding::new(config.embedding_dim)?;

        Ok(Self {
            chunker,
            strategy: config.strategy,
            store: VectorStore::new(Box::new(embedder)),
            top_k: config.top_k,
            answerer,
        })
    }

    /// 문서 인덱싱
    ///
    /// 청크 ID는 `<source>_<순번>`입니다. 이미 인덱싱된 출처면
    /// 아무것도 저장하지 않고 `DuplicateId`로 실패합니다.
    ///
    /// # Returns
    /// 저장된 청크 수
    pub fn index_document(&mut self, text: &str, source: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text, self.strategy);
        if chunks.is_empty() {
            tracing::warn!("No chunks generated for document: {}", source);
            return Ok(0);
        }

        let ids: Vec<String> = (0..chunks.len()).map(|i| format!("{}_{}", source, i)).collect();
        if let Some(existing) = ids.iter().find(|id| self.store.contains(id)) {
            return Err(RagError::DuplicateId(existing.clone()));
        }

        for (i, (id, chunk)) in ids.into_iter().zip(chunks.iter()).enumerate() {
            let mut metadata = HashMap::new();
            metadata.insert(SOURCE_KEY.to_string(), source.to_string());
            metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());

            self.store.add_document(id, chunk.as_str(), metadata)?;
        }

        tracing::info!(
            "Indexed document: {} (strategy={}, chunks={})",
            source,
            self.strategy,
            chunks.len()
        );
        Ok(chunks.len())
    }

    /// 여러 문서 인덱싱 (반복자 순서대로)
    ///
    /// # Returns
    /// 저장된 전체 청크 수
    pub fn index_documents<I, K, V>(&mut self, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut total = 0;
        for (source, text) in documents {
            total += self.index_document(text.as_ref(), source.as_ref())?;
        }
        Ok(total)
    }

    /// RAG 쿼리 실행 (벡터 검색)
    pub fn query(&self, question: &str) -> Result<RetrievalResponse> {
        let results = self.store.search(question, self.top_k)?;
        let chunks: Vec<RetrievedChunk> = results.iter().map(RetrievedChunk::from).collect();

        tracing::debug!("Query retrieved {} chunks", chunks.len());
        Ok(self.respond(question, chunks))
    }

    /// RAG 쿼리 실행 (하이브리드 검색)
    pub fn query_hybrid(&self, question: &str, semantic_weight: f32) -> Result<RetrievalResponse> {
        let scorer = HybridScorer::new(&self.store, semantic_weight)?;
        let chunks: Vec<RetrievedChunk> = scorer
            .search(question, self.top_k)?
            .into_iter()
            .map(|r| {
                let source = self
                    .store
                    .get(&r.id)
                    .and_then(|doc| doc.metadata.get(SOURCE_KEY).cloned());
                RetrievedChunk {
                    id: r.id,
                    text: r.text,
                    source,
                    score: r.combined_score,
                }
            })
            .collect();

        tracing::debug!(
            "Hybrid query (w={:.2}) retrieved {} chunks",
            semantic_weight,
            chunks.len()
        );
        Ok(self.respond(question, chunks))
    }

    /// 컨텍스트 구성 + 답변 위임
    fn respond(&self, question: &str, results: Vec<RetrievedChunk>) -> RetrievalResponse {
        let context = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let mut sources: Vec<String> = Vec::new();
        for source in results.iter().filter_map(|r| r.source.as_ref()) {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }

        let prompt = build_prompt(&context, question);
        let answer = self.answerer.answer(&context, question);

        RetrievalResponse {
            question: question.to_string(),
            answer,
            context,
            prompt,
            sources,
            results,
        }
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// 내부 벡터 스토어 접근
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn echo_answerer() -> Box<dyn Answerer> {
        Box::new(|context: &str, question: &str| format!("{}|{}", question, context.len()))
    }

    #[test]
    fn test_invalid_construction() {
        assert!(RetrievalPipeline::new(0, 8, 3, echo_answerer()).is_err());
        assert!(RetrievalPipeline::new(100, 0, 3, echo_answerer()).is_err());
        assert!(RetrievalPipeline::new(100, 8, 0, echo_answerer()).is_err());
    }

    #[test]
    fn test_index_paragraph_ids() {
        let mut pipeline = RetrievalPipeline::new(3, 16, 3, echo_answerer()).unwrap();
        let count = pipeline.index_document("A\n\nB\n\nC", "doc1").unwrap();

        assert_eq!(count, 3);
        let ids: Vec<&str> = pipeline
            .store()
            .documents()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["doc1_0", "doc1_1", "doc1_2"]);

        let second = pipeline.store().get("doc1_1").unwrap();
        assert_eq!(second.text, "B");
        assert_eq!(second.metadata.get(SOURCE_KEY).unwrap(), "doc1");
        assert_eq!(second.metadata.get(CHUNK_INDEX_KEY).unwrap(), "1");
    }

    #[test]
    fn test_reindex_same_source_fails_atomically() {
        let mut pipeline = RetrievalPipeline::new(3, 16, 3, echo_answerer()).unwrap();
        pipeline.index_document("A\n\nB", "doc1").unwrap();

        let result = pipeline.index_document("X\n\nY\n\nZ", "doc1");
        assert!(matches!(result, Err(RagError::DuplicateId(ref id)) if id == "doc1_0"));
        assert_eq!(pipeline.document_count(), 2);
    }

    #[test]
    fn test_index_empty_document() {
        let mut pipeline = RetrievalPipeline::new(50, 16, 3, echo_answerer()).unwrap();
        assert_eq!(pipeline.index_document("   ", "empty").unwrap(), 0);
        assert_eq!(pipeline.document_count(), 0);
    }

    #[test]
    fn test_index_documents_in_order() {
        let mut pipeline = RetrievalPipeline::new(100, 16, 3, echo_answerer()).unwrap();
        let docs = vec![("zeta", "last letter"), ("alpha", "first letter")];
        let total = pipeline.index_documents(docs).unwrap();

        assert_eq!(total, 2);
        assert_eq!(pipeline.store().documents()[0].id, "zeta_0");
        assert_eq!(pipeline.store().documents()[1].id, "alpha_0");
    }

    #[test]
    fn test_query_assembles_context_and_sources() {
        let mut pipeline = RetrievalPipeline::new(30, 32, 3, echo_answerer()).unwrap();
        pipeline
            .index_documents([
                ("rust", "Rust has ownership.\n\nRust has borrowing rules."),
                ("java", "Java has a garbage collector."),
            ])
            .unwrap();

        let response = pipeline.query("Rust ownership").unwrap();
        assert_eq!(response.results.len(), 3);

        let expected_context = response
            .results
            .iter()
            .map(|r| r.text.clone())
            .collect::<Vec<_>>()
            .join("\n\n");
        assert_eq!(response.context, expected_context);

        // 출처 중복 제거
        let mut unique = response.sources.clone();
        unique.dedup();
        assert_eq!(unique.len(), response.sources.len());
        assert_eq!(response.sources.len(), 2);

        // 답변은 협력자의 결과 그대로
        assert_eq!(
            response.answer,
            format!("Rust ownership|{}", response.context.len())
        );
        assert!(response.prompt.contains(&response.context));
        assert!(response.prompt.contains("### Question:\nRust ownership"));
    }

    #[test]
    fn test_query_passes_context_to_answerer() {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let answerer = move |context: &str, question: &str| {
            captured
                .lock()
                .unwrap()
                .push((context.to_string(), question.to_string()));
            "fixed answer".to_string()
        };

        let mut pipeline = RetrievalPipeline::new(100, 16, 1, Box::new(answerer)).unwrap();
        pipeline.index_document("only chunk", "src").unwrap();

        let response = pipeline.query("what is it").unwrap();
        assert_eq!(response.answer, "fixed answer");
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("only chunk".to_string(), "what is it".to_string())]
        );
    }

    #[test]
    fn test_query_empty_store() {
        let pipeline = RetrievalPipeline::new(100, 16, 3, echo_answerer()).unwrap();
        let response = pipeline.query("anything").unwrap();
        assert!(response.results.is_empty());
        assert!(response.sources.is_empty());
        assert_eq!(response.context, "");
    }

    #[test]
    fn test_query_hybrid() {
        let mut pipeline = RetrievalPipeline::new(40, 32, 2, echo_answerer()).unwrap();
        pipeline
            .index_documents([
                ("a", "Kotlin runs on the JVM."),
                ("b", "Tokio is an async runtime for Rust."),
            ])
            .unwrap();

        let response = pipeline.query_hybrid("tokio runtime", 0.0).unwrap();
        assert_eq!(response.results[0].id, "b_0");
        assert_eq!(response.results[0].source.as_deref(), Some("b"));
        assert!((response.results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(response.sources[0], "b");

        assert!(pipeline.query_hybrid("tokio", 1.5).is_err());
    }

    #[test]
    fn test_extractive_answerer() {
        let answerer = ExtractiveAnswerer::default();
        assert_eq!(
            answerer.answer("", "what?"),
            "I don't have enough information."
        );
        assert_eq!(
            answerer.answer("Top chunk.\n\nSecond chunk.", "What is this?"),
            "According to the documents: Top chunk."
        );
        assert_eq!(
            answerer.answer("Step one.", "How do I start?"),
            "Here is how: Step one."
        );

        let short = ExtractiveAnswerer { max_chars: 4 };
        assert_eq!(short.answer("abcdefgh", "tell me"), "Related information: abcd...");
    }

    #[test]
    fn test_extractive_answer_uses_first_paragraph_of_top_chunk() {
        let mut pipeline =
            RetrievalPipeline::new(40, 16, 1, Box::new(ExtractiveAnswerer::default())).unwrap();
        pipeline
            .index_document(
                "Alpha one.\n\nAlpha two.\n\nBeta paragraph that is long enough to split off.",
                "notes",
            )
            .unwrap();
        assert_eq!(pipeline.document_count(), 2);

        let response = pipeline.query_hybrid("alpha", 0.0).unwrap();
        assert_eq!(response.results[0].text, "Alpha one.\n\nAlpha two.");
        assert_eq!(response.answer, "Related information: Alpha one.");
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("CTX", "Q?");
        assert!(prompt.starts_with("You are a helpful assistant."));
        assert!(prompt.contains("### Context:\nCTX\n\n### Question:\nQ?\n\n### Answer:\n"));
    }
}

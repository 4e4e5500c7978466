//! rag-core - 인메모리 하이브리드 RAG 검색 엔진
//!
//! 문서를 청크로 나누고, 해시 시드 임베딩으로 벡터화하여 저장한 뒤
//! 키워드 점수와 벡터 유사도를 결합해 질의에 대한 순위와 컨텍스트를 만듭니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;

// Re-exports
pub use config::RagConfig;
pub use embedding::{cosine_similarity, EmbeddingProvider, HashEmbedding, DEFAULT_DIMENSION};
pub use error::{RagError, Result};
pub use knowledge::{
    build_prompt, keyword_score, Answerer, ChunkConfig, ChunkStrategy, Chunker, Document,
    ExtractiveAnswerer, HybridResult, HybridScorer, RetrievalPipeline, RetrievalResponse,
    RetrievedChunk, SearchMethod, SearchResult, VectorStore,
};

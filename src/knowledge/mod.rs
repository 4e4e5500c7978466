//! Knowledge 모듈 - 인메모리 하이브리드 RAG 검색 코어
//!
//! - Chunker: 문장 / 고정 크기 / 문단 분할
//! - VectorStore: 선형 스캔 코사인 유사도 검색
//! - Hybrid: 키워드 TF + 벡터 유사도 가중 결합
//! - Pipeline: 인덱싱과 질의, 컨텍스트 구성

mod chunker;
mod hybrid;
mod pipeline;
mod vector;

// Re-exports
pub use chunker::{ChunkConfig, ChunkStrategy, Chunker};
pub use hybrid::{keyword_score, HybridResult, HybridScorer, SearchMethod};
pub(crate) use hybrid::validate_weight;
pub use pipeline::{
    build_prompt, Answerer, ExtractiveAnswerer, RetrievalPipeline, RetrievalResponse,
    RetrievedChunk, CHUNK_INDEX_KEY, SOURCE_KEY,
};
pub use vector::{Document, SearchResult, VectorStore};

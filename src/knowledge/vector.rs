//! Vector Store - 인메모리 벡터 저장소
//!
//! 문서(id, 텍스트, 벡터, 메타데이터)를 삽입 순서대로 보관하고
//! 전체 선형 스캔으로 Top-K 코사인 유사도 검색을 수행합니다.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::{RagError, Result};

// ============================================================================
// Types
// ============================================================================

/// 저장된 문서 (생성 후 불변)
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// 저장소 내 유일한 ID
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    /// 임베딩 벡터
    #[serde(skip)]
    pub vector: Vec<f32>,
    /// 메타데이터 (source, chunk_index 등)
    pub metadata: HashMap<String, String>,
}

/// 검색 결과
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<'a> {
    /// 저장소 문서 참조
    pub document: &'a Document,
    /// 유사도 스코어 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// VectorStore
// ============================================================================

/// 인메모리 벡터 저장소
///
/// 검색은 저장소를 변경하지 않으며, 같은 상태/쿼리에 대해 항상 같은 순서를 반환합니다.
pub struct VectorStore {
    embedder: Box<dyn EmbeddingProvider>,
    documents: Vec<Document>,
    ids: HashSet<String>,
}

impl VectorStore {
    /// 임베딩 프로바이더로 저장소 생성
    pub fn new(embedder: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            documents: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// 문서 추가
    ///
    /// # Errors
    /// 같은 ID가 이미 있으면 `DuplicateId` (저장소는 변경되지 않음)
    pub fn add_document(
        &mut self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let id = id.into();
        if self.ids.contains(&id) {
            return Err(RagError::DuplicateId(id));
        }

        let text = text.into();
        let vector = self.embedder.embed(&text)?;
        if vector.len() != self.embedder.dimension() {
            return Err(RagError::DimensionMismatch {
                left: vector.len(),
                right: self.embedder.dimension(),
            });
        }

        tracing::debug!("Stored document {} ({} chars)", id, text.chars().count());

        self.ids.insert(id.clone());
        self.documents.push(Document {
            id,
            text,
            vector,
            metadata,
        });
        Ok(())
    }

    /// 여러 문서 저장 (ID는 `doc_<순번>`, 메타데이터 없음)
    ///
    /// # Returns
    /// 생성된 문서 ID 목록
    pub fn add_documents<I, S>(&mut self, texts: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for text in texts {
            let id = format!("doc_{}", self.documents.len());
            self.add_document(id.clone(), text, HashMap::new())?;
            added.push(id);
        }
        Ok(added)
    }

    /// 유사한 문서 검색
    ///
    /// 빈 쿼리, 빈 저장소, `top_k == 0`이면 빈 결과를 반환합니다.
    /// 동점은 삽입 순서로 정렬됩니다.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult<'_>>> {
        if top_k == 0 || query.trim().is_empty() || self.documents.is_empty() {
            return Ok(vec![]);
        }

        let query_vector = self.embedder.embed(query)?;
        self.search_by_vector(&query_vector, top_k)
    }

    /// 쿼리 벡터로 검색
    pub fn search_by_vector(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult<'_>>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        let mut results = self
            .documents
            .iter()
            .map(|document| {
                cosine_similarity(query_vector, &document.vector)
                    .map(|similarity| SearchResult { document, similarity })
            })
            .collect::<Result<Vec<_>>>()?;

        // 안정 정렬: 동점이면 삽입 순서 유지
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            "Vector search scanned {} documents, returning {}",
            self.documents.len(),
            results.len()
        );
        Ok(results)
    }

    /// ID로 문서 조회
    pub fn get(&self, id: &str) -> Option<&Document> {
        if !self.ids.contains(id) {
            return None;
        }
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// 삽입 순서의 문서 목록
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// 저장소 초기화 (임베딩 캐시는 유지)
    pub fn clear(&mut self) {
        tracing::debug!("Clearing vector store ({} documents)", self.documents.len());
        self.documents.clear();
        self.ids.clear();
    }

    /// 내부 임베딩 프로바이더 접근
    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;

    /// 텍스트별로 고정 벡터를 돌려주는 테스트용 프로바이더
    struct FixedEmbedding {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl EmbeddingProvider for FixedEmbedding {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.vectors.get(text).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn fixed_store() -> VectorStore {
        // query = (1, 0); 각 문서의 코사인 유사도 = x 성분
        let mut vectors = HashMap::new();
        vectors.insert("query".to_string(), vec![1.0, 0.0]);
        for (text, sim) in [("low", 0.2f32), ("high", 0.9), ("mid", 0.5)] {
            vectors.insert(text.to_string(), vec![sim, (1.0 - sim * sim).sqrt()]);
        }
        let mut store = VectorStore::new(Box::new(FixedEmbedding { vectors }));
        store.add_documents(["low", "high", "mid"]).unwrap();
        store
    }

    fn hash_store() -> VectorStore {
        VectorStore::new(Box::new(HashEmbedding::new(32).unwrap()))
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let store = fixed_store();
        let results = store.search("query", 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.text, "high");
        assert_eq!(results[1].document.text, "mid");
        assert!((results[0].similarity - 0.9).abs() < 1e-5);
        assert!((results[1].similarity - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_search_top_k_bounds() {
        let store = fixed_store();
        assert_eq!(store.search("query", 0).unwrap().len(), 0);
        assert_eq!(store.search("query", 3).unwrap().len(), 3);
        assert_eq!(store.search("query", 10).unwrap().len(), 3);
    }

    #[test]
    fn test_search_empty_query_and_store() {
        let store = fixed_store();
        assert!(store.search("", 3).unwrap().is_empty());
        assert!(store.search("   ", 3).unwrap().is_empty());

        let empty = hash_store();
        assert!(empty.search("anything", 3).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut store = hash_store();
        store.add_document("b", "same text", HashMap::new()).unwrap();
        store.add_document("a", "same text", HashMap::new()).unwrap();
        store.add_document("c", "same text", HashMap::new()).unwrap();

        let ids: Vec<&str> = store
            .search("same text", 3)
            .unwrap()
            .iter()
            .map(|r| r.document.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_search_idempotent() {
        let mut store = hash_store();
        store
            .add_documents(["rust ownership", "java garbage collector", "python typing"])
            .unwrap();

        let first: Vec<String> = store
            .search("rust memory", 3)
            .unwrap()
            .iter()
            .map(|r| r.document.id.clone())
            .collect();
        let second: Vec<String> = store
            .search("rust memory", 3)
            .unwrap()
            .iter()
            .map(|r| r.document.id.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = hash_store();
        store.add_document("x", "first", HashMap::new()).unwrap();
        let result = store.add_document("x", "second", HashMap::new());

        assert!(matches!(result, Err(RagError::DuplicateId(ref id)) if id == "x"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").unwrap().text, "first");
    }

    #[test]
    fn test_add_documents_ids() {
        let mut store = hash_store();
        let ids = store.add_documents(["a", "b"]).unwrap();
        assert_eq!(ids, vec!["doc_0", "doc_1"]);

        let more = store.add_documents(vec!["c".to_string()]).unwrap();
        assert_eq!(more, vec!["doc_2"]);
    }

    #[test]
    fn test_clear() {
        let mut store = hash_store();
        store.add_documents(["a", "b"]).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("doc_0"));
        store.add_document("doc_0", "again", HashMap::new()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_search_by_vector_dimension_mismatch() {
        let store = fixed_store();
        let result = store.search_by_vector(&[1.0, 0.0, 0.0], 3);
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }
}

//! 하이브리드 검색 - 키워드 TF + 벡터 유사도 가중 결합
//!
//! 키워드 점수는 `ln(1 + 출현 횟수)`의 합(IDF, 길이 정규화 없음)이며,
//! 최대값으로 정규화한 뒤 시맨틱 점수와 가중 합산합니다.
//!
//! `combined = keyword_norm * (1 - w) + semantic * w`
//!
//! 두 점수는 목록 위치가 아니라 문서 ID 기준으로 결합합니다.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::{RagError, Result};

use super::vector::VectorStore;

// ============================================================================
// Types
// ============================================================================

/// 하이브리드 검색 결과
#[derive(Debug, Clone, Serialize)]
pub struct HybridResult {
    /// 문서 ID
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    /// 가중 결합 스코어
    pub combined_score: f32,
    /// 정규화된 키워드 스코어 (0.0 ~ 1.0)
    pub keyword_score: f32,
    /// 정규화 전 키워드 스코어
    pub raw_keyword_score: f32,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub semantic_score: f32,
    /// 점수에 기여한 근거
    pub method: SearchMethod,
}

/// 검색 근거
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// 키워드만 일치
    Keyword,
    /// 키워드 불일치, 유사도만 사용
    Semantic,
    /// 둘 다 기여
    Hybrid,
}

impl SearchMethod {
    /// 가중치를 곱한 뒤 양수로 남은 근거로 분류
    fn classify(keyword_part: f32, semantic_part: f32) -> Self {
        match (keyword_part > 0.0, semantic_part > 0.0) {
            (true, true) => SearchMethod::Hybrid,
            (true, false) => SearchMethod::Keyword,
            (false, _) => SearchMethod::Semantic,
        }
    }
}

// ============================================================================
// HybridScorer
// ============================================================================

/// 하이브리드 검색기
///
/// 저장소를 빌려 쓰며 변경하지 않습니다.
pub struct HybridScorer<'a> {
    store: &'a VectorStore,
    semantic_weight: f32,
}

impl<'a> HybridScorer<'a> {
    /// 새 하이브리드 검색기 생성
    ///
    /// # Errors
    /// `semantic_weight`가 [0, 1] 밖이면 `InvalidArgument`
    pub fn new(store: &'a VectorStore, semantic_weight: f32) -> Result<Self> {
        validate_weight(semantic_weight)?;
        Ok(Self {
            store,
            semantic_weight,
        })
    }

    pub fn semantic_weight(&self) -> f32 {
        self.semantic_weight
    }

    /// 키워드만으로 정렬한 결과 (점수 > 0 문서, 내림차순, 동점은 삽입 순서)
    ///
    /// # Returns
    /// (문서 인덱스, 원시 키워드 스코어) 목록
    pub fn keyword_search(&self, query: &str) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .store
            .documents()
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, keyword_score(query, &doc.text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
    }

    /// 하이브리드 검색
    ///
    /// 빈 쿼리, 빈 저장소, `top_k == 0`이면 빈 결과를 반환합니다.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<HybridResult>> {
        let documents = self.store.documents();
        if top_k == 0 || query.trim().is_empty() || documents.is_empty() {
            return Ok(vec![]);
        }

        // 1. 키워드 점수 (원시값 + 최대값)
        let raw: Vec<f32> = documents
            .iter()
            .map(|doc| keyword_score(query, &doc.text))
            .collect();
        let max_raw = raw.iter().copied().fold(0.0f32, f32::max);

        // 2. 시맨틱 점수 (전체 문서, ID 기준)
        let semantic: HashMap<&str, f32> = self
            .store
            .search(query, documents.len())?
            .into_iter()
            .map(|r| (r.document.id.as_str(), r.similarity))
            .collect();

        // 3. 결합
        let w = self.semantic_weight;
        let mut results: Vec<HybridResult> = documents
            .iter()
            .zip(raw)
            .map(|(doc, raw_score)| {
                let keyword = if max_raw > 0.0 { raw_score / max_raw } else { 0.0 };
                let semantic_score = semantic.get(doc.id.as_str()).copied().unwrap_or(0.0);

                let keyword_part = keyword * (1.0 - w);
                let semantic_part = semantic_score * w;

                HybridResult {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    combined_score: keyword_part + semantic_part,
                    keyword_score: keyword,
                    raw_keyword_score: raw_score,
                    semantic_score,
                    method: SearchMethod::classify(keyword_part, semantic_part),
                }
            })
            .collect();

        // 4. 안정 정렬 후 자르기
        results.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            "Hybrid search (w={:.2}) over {} documents, max keyword score {:.3}",
            w,
            documents.len(),
            max_raw
        );
        Ok(results)
    }
}

// ============================================================================
// Keyword Scoring
// ============================================================================

/// 키워드 스코어 (단순 TF)
///
/// 쿼리 용어마다 문서 내 출현 횟수 `c`에 대해 `ln(1 + c)`를 더합니다.
/// 소문자 기준 부분 문자열 매칭이며, 중복 용어는 각각 계산됩니다.
pub fn keyword_score(query: &str, document: &str) -> f32 {
    let doc = document.to_lowercase();
    let query = query.to_lowercase();

    query
        .split_whitespace()
        .map(|term| count_occurrences(&doc, term))
        .filter(|&count| count > 0)
        .map(|count| (1.0 + count as f32).ln())
        .fold(0.0, |acc, x| acc + x)
}

/// 겹치지 않는 출현 횟수
fn count_occurrences(text: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    text.matches(term).count()
}

/// 시맨틱 가중치 검증
pub(crate) fn validate_weight(weight: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(RagError::invalid(format!(
            "semantic weight must be within [0, 1], got {}",
            weight
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

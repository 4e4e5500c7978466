//! 임베딩 모듈 - 해시 시드 기반 결정적 텍스트 벡터화
//!
//! 학습된 임베딩 모델 대신, 단어마다 해시로 시드한 의사 난수 벡터를 만들고
//! 평균 + L2 정규화로 텍스트 벡터를 구성합니다.
//! 같은 텍스트는 실행이 달라도 항상 같은 벡터가 됩니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = HashEmbedding::new(64)?;
//! let embedding = embedder.embed("Hello, world!")?;
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 고정 차원 벡터로 변환하는 인터페이스입니다.
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;

    /// 캐시 비우기 (캐시가 없으면 아무 일도 하지 않음)
    fn clear_cache(&self) {}
}

// ============================================================================
// Hash Embedding
// ============================================================================

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 64;

/// 해시 시드 임베딩 구현체
///
/// 캐시는 인스턴스가 소유하며, 변환 전 원문 그대로를 키로 씁니다.
#[derive(Debug)]
pub struct HashEmbedding {
    dimension: usize,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl HashEmbedding {
    /// 차원을 지정하여 생성
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::invalid("embedding dimension must be positive"));
        }

        Ok(Self {
            dimension,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// 캐시된 텍스트 수
    pub fn cache_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Vec<f32>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 단어 벡터 (SHA-256 시드 의사 난수, 각 성분 [-1, 1))
    fn word_vector(&self, word: &str) -> Vec<f32> {
        let digest = Sha256::digest(word.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);

        let mut rng = StdRng::from_seed(seed);
        (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect()
    }

    /// 단어 벡터 평균 후 정규화
    fn compute(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut result = vec![0.0f32; self.dimension];
        let mut count = 0usize;

        for word in lowered.split_whitespace() {
            for (acc, value) in result.iter_mut().zip(self.word_vector(word)) {
                *acc += value;
            }
            count += 1;
        }

        if count > 0 {
            let n = count as f32;
            result.iter_mut().for_each(|x| *x /= n);
        }

        l2_normalize(&mut result);
        result
    }
}

impl EmbeddingProvider for HashEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache().get(text) {
            tracing::debug!("Embedding cache hit ({} chars)", text.len());
            return Ok(cached.clone());
        }

        let vector = self.compute(text);
        self.cache().insert(text.to_string(), vector.clone());

        tracing::debug!("Embedding cache miss ({} chars)", text.len());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-embedding"
    }

    fn clear_cache(&self) {
        let mut cache = self.cache();
        tracing::debug!("Clearing embedding cache ({} entries)", cache.len());
        cache.clear();
    }
}

// ============================================================================
// Vector Math
// ============================================================================

/// L2 노름
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// 제자리 L2 정규화 (노름이 0이면 영벡터 유지)
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 한쪽 노름이 0이면 0.0을 반환합니다.
///
/// # Errors
/// 두 벡터의 길이가 다르면 `DimensionMismatch`
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

// ============================================================================
// Tests
// ============================================================================

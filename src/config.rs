//! 설정 모듈
//!
//! JSON 설정 파일(선택)을 읽고 CLI 인자로 덮어씁니다.
//! 지정하지 않은 항목은 기본값을 사용합니다.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embedding::DEFAULT_DIMENSION;
use crate::error::{RagError, Result};
use crate::knowledge::{ChunkConfig, ChunkStrategy};

/// 검색 코어 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 오버랩 크기 (없으면 chunk_size / 5)
    pub overlap_size: Option<usize>,
    /// 임베딩 차원
    pub embedding_dim: usize,
    /// 검색 결과 수
    pub top_k: usize,
    /// 하이브리드 검색의 시맨틱 가중치 (0.0 ~ 1.0)
    pub semantic_weight: f32,
    /// 인덱싱 청킹 전략
    pub strategy: ChunkStrategy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 150,
            overlap_size: None,
            embedding_dim: DEFAULT_DIMENSION,
            top_k: 3,
            semantic_weight: 0.6,
            strategy: ChunkStrategy::Paragraph,
        }
    }
}

impl RagConfig {
    /// 키워드 위주 설정
    pub fn keyword_heavy() -> Self {
        Self {
            semantic_weight: 0.3,
            ..Self::default()
        }
    }

    /// 시맨틱 위주 설정
    pub fn semantic_heavy() -> Self {
        Self {
            semantic_weight: 0.8,
            ..Self::default()
        }
    }

    /// JSON 문자열에서 읽기
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RagError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// JSON 파일에서 읽기
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("failed to read {}: {}", path.display(), e)))?;

        tracing::debug!("Loaded config from {}", path.display());
        Self::from_json(&content)
    }

    /// 실제 오버랩 크기
    pub fn overlap(&self) -> usize {
        self.overlap_size.unwrap_or(self.chunk_size / 5)
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            target_characters: self.chunk_size,
            overlap_characters: self.overlap(),
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        self.chunk_config().validate()?;

        if self.embedding_dim == 0 {
            return Err(RagError::invalid("embedding_dim must be positive"));
        }
        if self.top_k == 0 {
            return Err(RagError::invalid("top_k must be positive"));
        }
        crate::knowledge::validate_weight(self.semantic_weight)
    }
}

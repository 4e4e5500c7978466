//! 에러 타입
//!
//! 검색 코어 전체에서 사용하는 에러 정의입니다.
//! 빈 쿼리, 빈 저장소, 영벡터 같은 퇴화 입력은 에러가 아니라
//! 빈 결과/중립값으로 처리합니다.

use thiserror::Error;

/// 검색 코어 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 잘못된 설정값 (생성 시점에 즉시 실패)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 길이가 다른 벡터 간 연산
    #[error("Dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// 이미 존재하는 문서 ID
    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    /// 설정 파일 읽기/파싱 실패
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

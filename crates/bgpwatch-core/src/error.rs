//! bgpwatch 핵심 에러 타입.
//!
//! 모든 포트는 `CoreError`를 반환하고, 어댑터 crate는 라이브러리 에러를
//! `map_err`로 변환해 문맥 메시지를 붙인다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "PoP", "Session")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 저장소 에러 (쿼리 실패, 잠금 실패)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 네트워크 에러 (연결 실패, 타임아웃, 웹훅 거부)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 익스포터 수집 실패 (해당 PoP 폴링 전체 중단)
    #[error("익스포터 수집 실패 (status={status:?}): {message}")]
    Fetch {
        /// HTTP 상태 코드 (연결 실패 시 None)
        status: Option<u16>,
        /// 실패 사유
        message: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 저장소 에러 생성 헬퍼
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        CoreError::Storage(format!("{context}: {err}"))
    }
}

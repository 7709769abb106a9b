//! 스크리닝 파이프라인의 에러 타입.
//!
//! - [`ProviderError`]: 외부 데이터 Provider 호출 실패
//! - [`ComputationError`]: 지표 계산 불가 (데이터 부족, 비정상 입력)
//! - [`ResolveFailure`]: 심볼 하나의 해석(resolve) 실패 사유

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 데이터 Provider 에러.
///
/// 응답 형식, rate limit, 인증 등 Provider 고유의 세부 사항은
/// 이 다섯 가지 종류로만 노출됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProviderError {
    /// 심볼 또는 요청한 데이터가 존재하지 않음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 요청 한도 초과
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 호출 시간 초과
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 응답 형식 오류 (필드 누락, 파싱 불가)
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Provider 일시적 사용 불가 (네트워크, 5xx 등)
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// [`ProviderError`]의 종류 (메시지 제외).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    NotFound,
    RateLimited,
    Timeout,
    MalformedResponse,
    Unavailable,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::RateLimited => "RateLimited",
            Self::Timeout => "Timeout",
            Self::MalformedResponse => "MalformedResponse",
            Self::Unavailable => "Unavailable",
        };
        f.write_str(name)
    }
}

impl ProviderError {
    /// 에러 종류 반환.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::NotFound(_) => ProviderErrorKind::NotFound,
            Self::RateLimited(_) => ProviderErrorKind::RateLimited,
            Self::Timeout(_) => ProviderErrorKind::Timeout,
            Self::MalformedResponse(_) => ProviderErrorKind::MalformedResponse,
            Self::Unavailable(_) => ProviderErrorKind::Unavailable,
        }
    }

    /// 재시도할 가치가 있는 에러인지 확인.
    ///
    /// 이 레이어는 재시도하지 않습니다. 호출자가 정책을 결정합니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout(_) | Self::Unavailable(_)
        )
    }
}

/// 지표 계산 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationError {
    /// 데이터 부족
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 비정상 입력 (중복 날짜, 역순 시계열 등)
    #[error("비정상 입력: {message}")]
    DegenerateInput { message: String },
}

impl ComputationError {
    /// `DegenerateInput` 생성 헬퍼.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput {
            message: message.into(),
        }
    }
}

/// 심볼 해석 실패 사유.
///
/// 가격 시계열을 얻지 못한 경우(hard failure)에만 발생합니다.
/// Overview, 뉴스 등 soft failure는 누락 값으로 흡수됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "source", content = "error", rename_all = "snake_case")]
pub enum ResolveFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl ResolveFailure {
    /// Provider 에러라면 그 종류를 반환.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider(e) => Some(e.kind()),
            Self::Computation(_) => None,
        }
    }

    /// 보고용 짧은 사유 문자열 (예: "Timeout", "InsufficientData").
    pub fn reason(&self) -> String {
        match self {
            Self::Provider(e) => e.kind().to_string(),
            Self::Computation(ComputationError::InsufficientData { .. }) => {
                "InsufficientData".to_string()
            }
            Self::Computation(ComputationError::DegenerateInput { .. }) => {
                "DegenerateInput".to_string()
            }
        }
    }
}

/// Provider 호출 결과 타입 별칭.
pub type ProviderResult<T> = Result<T, ProviderError>;

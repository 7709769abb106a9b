//! 에러 타입 정의.

use radar_core::ProviderError;
use radar_data::FixtureLoadError;
use thiserror::Error;

/// Collector 에러 타입.
///
/// 심볼 단위 실패는 여기에 포함되지 않습니다. 배치 결과의 실패 목록으로 보고됩니다.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider 생성 실패
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Fixture 로드 실패
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureLoadError),

    /// 입출력 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CollectorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

//! 설정 모듈.
//!
//! 기본값 → TOML 파일(선택) → 환경변수 순서로 덮어씁니다.
//!
//! 환경변수는 `RADAR` 접두사와 `__` 구분자를 사용합니다:
//!
//! ```text
//! RADAR__PROVIDER__KIND=yahoo
//! RADAR__PIPELINE__CONCURRENCY=8
//! RADAR__WATCHLIST=MP,UUUU,LAC
//! ```
//!
//! Alpha Vantage API 키는 `ALPHAVANTAGE_API_KEY`로도 지정할 수 있습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use radar_core::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;
use crate::Result;

/// 기본 감시 목록 (핵심 광물/소형주).
pub const DEFAULT_WATCHLIST: [&str; 15] = [
    "CRML", "AREC", "UAMY", "UUUU", "TMC", "NB", "TMQ", "IDR", "PPTA", "MP", "ERO", "LAC", "LICY",
    "SGML", "ABAT",
];

/// API 키 대체 환경변수.
const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

/// Collector 전체 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// 감시 목록
    pub watchlist: Vec<String>,
    /// 데이터 Provider 설정
    pub provider: ProviderConfig,
    /// 파이프라인 설정
    pub pipeline: PipelineConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 사용할 Provider 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Alpha Vantage (API 키 필요)
    #[default]
    AlphaVantage,
    /// Yahoo Finance
    Yahoo,
    /// Alpha Vantage 우선, 실패 시 Yahoo Finance
    Composite,
    /// JSON 파일 재생 (오프라인)
    Fixture,
}

/// Provider 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_base_url: Option<String>,
    /// `fixture` Provider용 JSON 파일 경로
    pub fixture_path: Option<PathBuf>,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            alpha_vantage_api_key: None,
            alpha_vantage_base_url: None,
            fixture_path: None,
            http_timeout_secs: 15,
        }
    }
}

/// 파이프라인 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 동시 해석 심볼 수
    pub concurrency: usize,
    /// Provider 호출당 타임아웃 (초)
    pub call_timeout_secs: u64,
    /// 레코드 캐시 TTL (초)
    pub cache_ttl_secs: u64,
    /// "오늘" 판정에 사용할 시장 시간대
    pub market_timezone: String,
    /// RSI 기간
    pub rsi_period: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout_secs: 15,
            cache_ttl_secs: 300,
            market_timezone: "America/New_York".to_string(),
            rsi_period: 14,
        }
    }
}

/// 데몬 모드 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// 배치 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨 필터
    pub level: String,
    /// 출력 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            provider: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            daemon: DaemonConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// 파일(선택)과 환경변수에서 설정 로드.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("RADAR")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("watchlist")
                .try_parsing(true),
        );

        let mut config = Self::build(builder)?;
        if config.provider.alpha_vantage_api_key.is_none() {
            config.provider.alpha_vantage_api_key =
                std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정 로드 (환경변수 미적용).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let builder = config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        let config = Self::build(builder)?;
        config.validate()?;
        Ok(config)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// 설정 검증.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(CollectorError::Config(
                "pipeline.concurrency는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.pipeline.cache_ttl_secs == 0 {
            return Err(CollectorError::Config(
                "pipeline.cache_ttl_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 {
            return Err(CollectorError::Config(
                "pipeline.call_timeout_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.pipeline.rsi_period == 0 {
            return Err(CollectorError::Config(
                "pipeline.rsi_period는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.daemon.interval_minutes == 0 {
            return Err(CollectorError::Config(
                "daemon.interval_minutes는 0보다 커야 합니다".to_string(),
            ));
        }

        self.market_timezone()?;
        self.log_format()?;

        match self.provider.kind {
            ProviderKind::AlphaVantage | ProviderKind::Composite => {
                self.api_key()?;
            }
            ProviderKind::Fixture if self.provider.fixture_path.is_none() => {
                return Err(CollectorError::Config(
                    "fixture Provider에는 provider.fixture_path가 필요합니다".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Alpha Vantage API 키.
    pub fn api_key(&self) -> Result<&str> {
        self.provider
            .alpha_vantage_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CollectorError::Config(format!(
                    "Alpha Vantage API 키가 없습니다 (provider.alpha_vantage_api_key 또는 {})",
                    API_KEY_ENV
                ))
            })
    }

    /// 시장 시간대.
    pub fn market_timezone(&self) -> Result<Tz> {
        self.pipeline.market_timezone.parse::<Tz>().map_err(|e| {
            CollectorError::Config(format!(
                "알 수 없는 시간대 {}: {}",
                self.pipeline.market_timezone, e
            ))
        })
    }

    fn log_format(&self) -> Result<LogFormat> {
        self.logging
            .format
            .parse::<LogFormat>()
            .map_err(CollectorError::Config)
    }

    /// 로깅 설정 변환.
    pub fn log_config(&self) -> Result<LogConfig> {
        Ok(LogConfig::new(self.logging.level.clone()).with_format(self.log_format()?))
    }
}

impl ProviderConfig {
    /// HTTP 요청 타임아웃을 Duration으로 반환
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl PipelineConfig {
    /// 호출당 타임아웃을 Duration으로 반환
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// 캐시 TTL을 chrono Duration으로 반환
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }
}

impl DaemonConfig {
    /// 배치 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

//! tracing 로깅 초기화.
//!
//! 출력 형식:
//! - **pretty**: 터미널에서 한 번 실행할 때
//! - **json**: 로그 수집기로 보낼 때
//! - **compact**: 데몬 모드 (한 줄 출력)
//!
//! `RUST_LOG`가 있으면 설정 파일의 레벨보다 우선합니다.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 레벨만 지정했을 때 그 레벨을 적용할 크레이트. 나머지(HTTP 클라이언트 등)는 `warn`.
const RADAR_TARGETS: [&str; 4] = ["radar_core", "radar_analytics", "radar_data", "radar_collector"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("알 수 없는 로그 형식: {} (pretty, json, compact)", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// 레벨 (`info`) 또는 EnvFilter 지시문 (`warn,radar_data=debug`)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// EnvFilter 지시문.
    ///
    /// 레벨만 주어지면 radar 크레이트에만 적용하고 의존 크레이트는 `warn`으로 둡니다.
    pub fn directives(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            return level.to_string();
        }

        let mut directives = String::from("warn");
        for target in RADAR_TARGETS {
            directives.push_str(&format!(",{}={}", target, level));
        }
        directives
    }
}

/// 전역 subscriber 설치.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directives())?,
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "로깅 초기화 완료");
    Ok(())
}

/// 심볼(과 Provider) 필드가 붙은 info span.
#[macro_export]
macro_rules! symbol_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $provider:expr) => {
        tracing::info_span!($name, symbol = %$symbol, provider = %$provider)
    };
}

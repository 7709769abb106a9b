//! 고정 데이터 재생 Provider.
//!
//! 네트워크 없이 스크리닝 파이프라인을 실행하기 위한 Provider입니다.
//! JSON 파일 또는 코드 빌더로 심볼별 데이터와 실패를 지정하며,
//! 호출 횟수를 기록하므로 캐시/병합 동작 검증에도 사용합니다.
//!
//! # JSON 형식
//!
//! ```json
//! {
//!   "name": "offline",
//!   "latency_ms": 0,
//!   "symbols": {
//!     "MP": {
//!       "bars": [
//!         {"date": "2026-03-02", "open": "10", "high": "10", "low": "10", "close": "10", "volume": 1500},
//!         {"date": "2026-03-03", "open": "11", "high": "11", "low": "11", "close": "11", "volume": 2000}
//!       ],
//!       "overview": {"week_52_high": "12.1"},
//!       "news_count": 3
//!     },
//!     "TMC": {"errors": {"series": {"kind": "timeout", "message": "scripted"}}}
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use radar_core::{DailyBar, Overview, ProviderError, ProviderResult, Quote, RawSeries};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MarketDataProvider;

/// Fixture 파일 로드 에러.
#[derive(Debug, Error)]
pub enum FixtureLoadError {
    #[error("Fixture 파일을 읽을 수 없습니다: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fixture JSON 파싱 실패: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 조각별 스크립트 실패.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureErrors {
    #[serde(default)]
    pub series: Option<ProviderError>,
    #[serde(default)]
    pub quote: Option<ProviderError>,
    #[serde(default)]
    pub overview: Option<ProviderError>,
    #[serde(default)]
    pub news: Option<ProviderError>,
    #[serde(default)]
    pub rsi: Option<ProviderError>,
}

/// 심볼 하나의 재생 데이터.
///
/// 값이 없는 조각은 `NotFound`(시계열, 시세, 개요) 또는
/// `Unavailable`(뉴스, RSI)로 응답합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSymbol {
    #[serde(default)]
    pub bars: Vec<DailyBar>,
    #[serde(default)]
    pub quote: Option<Quote>,
    #[serde(default)]
    pub overview: Option<Overview>,
    #[serde(default)]
    pub news_count: Option<u32>,
    #[serde(default)]
    pub rsi: Option<Decimal>,
    #[serde(default)]
    pub errors: FixtureErrors,
    /// 이 심볼에만 적용되는 응답 지연 (ms)
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl FixtureSymbol {
    /// 일봉으로 생성.
    pub fn from_bars(bars: Vec<DailyBar>) -> Self {
        Self {
            bars,
            ..Default::default()
        }
    }

    /// `start`부터 하루 간격의 종가 일봉으로 생성 (시가=고가=저가=종가).
    pub fn from_closes(start: NaiveDate, closes: &[Decimal], volume: i64) -> Self {
        Self::from_bars(bars_from_closes(start, closes, volume))
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn with_overview(mut self, overview: Overview) -> Self {
        self.overview = Some(overview);
        self
    }

    pub fn with_news_count(mut self, count: u32) -> Self {
        self.news_count = Some(count);
        self
    }

    pub fn with_rsi(mut self, rsi: Decimal) -> Self {
        self.rsi = Some(rsi);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(latency.as_millis() as u64);
        self
    }

    pub fn failing_series(mut self, error: ProviderError) -> Self {
        self.errors.series = Some(error);
        self
    }

    pub fn failing_quote(mut self, error: ProviderError) -> Self {
        self.errors.quote = Some(error);
        self
    }

    pub fn failing_overview(mut self, error: ProviderError) -> Self {
        self.errors.overview = Some(error);
        self
    }

    pub fn failing_news(mut self, error: ProviderError) -> Self {
        self.errors.news = Some(error);
        self
    }
}

/// `start`부터 하루 간격의 일봉 생성.
pub fn bars_from_closes(start: NaiveDate, closes: &[Decimal], volume: i64) -> Vec<DailyBar> {
    closes
        .iter()
        .zip(start.iter_days())
        .map(|(close, date)| DailyBar {
            date,
            open: *close,
            high: *close,
            low: *close,
            close: *close,
            volume,
        })
        .collect()
}

/// 조각별 호출 횟수.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub series: usize,
    pub quote: usize,
    pub overview: usize,
    pub news: usize,
    pub rsi: usize,
}

impl CallCounts {
    /// 전체 호출 수.
    pub fn total(&self) -> usize {
        self.series + self.quote + self.overview + self.news + self.rsi
    }
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    Series,
    Quote,
    Overview,
    News,
    Rsi,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    latency_ms: u64,
    #[serde(default)]
    symbols: HashMap<String, FixtureSymbol>,
}

fn default_name() -> String {
    "fixture".to_string()
}

/// 고정 데이터 재생 Provider.
///
/// 복제본은 호출 기록을 공유합니다.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    name: String,
    symbols: Arc<HashMap<String, FixtureSymbol>>,
    latency: Duration,
    calls: Arc<Mutex<HashMap<String, CallCounts>>>,
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureProvider {
    /// 빈 Provider 생성.
    pub fn new() -> Self {
        Self {
            name: default_name(),
            symbols: Arc::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// JSON 문자열에서 로드.
    pub fn from_json_str(json: &str) -> Result<Self, FixtureLoadError> {
        let file: FixtureFile = serde_json::from_str(json)?;
        let symbols = file
            .symbols
            .into_iter()
            .map(|(symbol, data)| (symbol.trim().to_uppercase(), data))
            .collect();

        Ok(Self {
            name: file.name,
            symbols: Arc::new(symbols),
            latency: Duration::from_millis(file.latency_ms),
            calls: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// JSON 파일에서 로드.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Provider 이름 변경.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 심볼 데이터 추가.
    pub fn with_symbol(mut self, symbol: impl Into<String>, data: FixtureSymbol) -> Self {
        Arc::make_mut(&mut self.symbols).insert(symbol.into().trim().to_uppercase(), data);
        self
    }

    /// 모든 호출에 적용되는 응답 지연.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 등록된 심볼 목록 (정렬됨).
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// 전체 호출 횟수.
    pub fn calls(&self) -> CallCounts {
        self.lock_calls()
            .values()
            .fold(CallCounts::default(), |acc, c| CallCounts {
                series: acc.series + c.series,
                quote: acc.quote + c.quote,
                overview: acc.overview + c.overview,
                news: acc.news + c.news,
                rsi: acc.rsi + c.rsi,
            })
    }

    /// 심볼별 호출 횟수.
    pub fn calls_for(&self, symbol: &str) -> CallCounts {
        self.lock_calls()
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or_default()
    }

    /// 호출 기록 초기화.
    pub fn reset_calls(&self) {
        self.lock_calls().clear();
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<String, CallCounts>> {
        // 카운터만 담고 있으므로 poison 상태여도 계속 사용
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 호출 기록, 지연 적용 후 심볼 데이터 반환.
    async fn enter(&self, symbol: &str, piece: Piece) -> Option<&FixtureSymbol> {
        let key = symbol.to_uppercase();
        {
            let mut calls = self.lock_calls();
            let counts = calls.entry(key.clone()).or_default();
            match piece {
                Piece::Series => counts.series += 1,
                Piece::Quote => counts.quote += 1,
                Piece::Overview => counts.overview += 1,
                Piece::News => counts.news += 1,
                Piece::Rsi => counts.rsi += 1,
            }
        }

        let data = self.symbols.get(&key);
        let latency = data
            .and_then(|d| d.latency_ms)
            .map(Duration::from_millis)
            .unwrap_or(self.latency);

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        data
    }
}

fn not_found(symbol: &str, what: &str) -> ProviderError {
    ProviderError::NotFound(format!("{}: {} 없음", symbol, what))
}

#[async_trait]
impl MarketDataProvider for FixtureProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_daily_series(&self, symbol: &str) -> ProviderResult<RawSeries> {
        let data = self
            .enter(symbol, Piece::Series)
            .await
            .ok_or_else(|| not_found(symbol, "심볼"))?;

        if let Some(error) = &data.errors.series {
            return Err(error.clone());
        }
        if data.bars.is_empty() {
            return Err(not_found(symbol, "일봉"));
        }

        RawSeries::new(symbol, data.bars.clone())
            .map_err(|e| ProviderError::MalformedResponse(format!("{}: {}", symbol, e)))
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let data = self
            .enter(symbol, Piece::Quote)
            .await
            .ok_or_else(|| not_found(symbol, "심볼"))?;

        if let Some(error) = &data.errors.quote {
            return Err(error.clone());
        }
        data.quote.clone().ok_or_else(|| not_found(symbol, "시세"))
    }

    async fn fetch_overview(&self, symbol: &str) -> ProviderResult<Overview> {
        let data = self
            .enter(symbol, Piece::Overview)
            .await
            .ok_or_else(|| not_found(symbol, "심볼"))?;

        if let Some(error) = &data.errors.overview {
            return Err(error.clone());
        }
        data.overview.clone().ok_or_else(|| not_found(symbol, "개요"))
    }

    async fn fetch_news_count(&self, symbol: &str) -> ProviderResult<u32> {
        let data = self
            .enter(symbol, Piece::News)
            .await
            .ok_or_else(|| not_found(symbol, "심볼"))?;

        if let Some(error) = &data.errors.news {
            return Err(error.clone());
        }
        data.news_count.ok_or_else(|| {
            ProviderError::Unavailable(format!("{}: 뉴스 데이터 없음", symbol))
        })
    }

    async fn fetch_rsi(&self, symbol: &str, _period: usize) -> ProviderResult<Decimal> {
        let data = self
            .enter(symbol, Piece::Rsi)
            .await
            .ok_or_else(|| not_found(symbol, "심볼"))?;

        if let Some(error) = &data.errors.rsi {
            return Err(error.clone());
        }
        data.rsi
            .ok_or_else(|| ProviderError::Unavailable(format!("{}: RSI 데이터 없음", symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::ProviderErrorKind;
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn test_replays_builder_data() {
        let provider = FixtureProvider::new().with_symbol(
            "mp",
            FixtureSymbol::from_closes(start(), &[dec!(10), dec!(11)], 2_000).with_news_count(4),
        );

        let series = provider.fetch_daily_series("MP").await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(provider.fetch_news_count("MP").await.unwrap(), 4);
        assert_eq!(
            provider.fetch_quote("MP").await.unwrap_err().kind(),
            ProviderErrorKind::NotFound
        );
        assert_eq!(
            provider.fetch_rsi("MP", 14).await.unwrap_err().kind(),
            ProviderErrorKind::Unavailable
        );

        let calls = provider.calls_for("MP");
        assert_eq!(calls.series, 1);
        assert_eq!(calls.total(), 4);
    }

    #[tokio::test]
    async fn test_scripted_errors_and_unknown_symbol() {
        let provider = FixtureProvider::new().with_symbol(
            "TMC",
            FixtureSymbol::default().failing_series(ProviderError::Timeout("scripted".into())),
        );

        assert_eq!(
            provider.fetch_daily_series("TMC").await.unwrap_err(),
            ProviderError::Timeout("scripted".into())
        );
        assert_eq!(
            provider.fetch_daily_series("ZZZZ").await.unwrap_err().kind(),
            ProviderErrorKind::NotFound
        );
        assert_eq!(provider.calls().series, 2);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "name": "offline",
            "symbols": {
                "mp": {
                    "bars": [
                        {"date": "2026-03-02", "open": "10", "high": "10", "low": "10", "close": "10", "volume": 1500},
                        {"date": "2026-03-03", "open": "11", "high": "11", "low": "11", "close": "11", "volume": 2000}
                    ],
                    "overview": {"week_52_high": "12.1"}
                },
                "TMC": {"errors": {"series": {"kind": "timeout", "message": "scripted"}}}
            }
        }"#;

        let provider = FixtureProvider::from_json_str(json).unwrap();
        assert_eq!(provider.name(), "offline");
        assert_eq!(provider.symbols(), vec!["MP", "TMC"]);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            FixtureProvider::from_json_str("{not json"),
            Err(FixtureLoadError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_applied() {
        let provider = FixtureProvider::new()
            .with_symbol(
                "MP",
                FixtureSymbol::from_closes(start(), &[dec!(1), dec!(2)], 10)
                    .with_latency(Duration::from_secs(30)),
            );

        let started = tokio::time::Instant::now();
        provider.fetch_daily_series("MP").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}

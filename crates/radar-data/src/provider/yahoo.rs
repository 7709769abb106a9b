//! Yahoo Finance Provider.
//!
//! API 키 없이 일봉과 최신 시세를 제공합니다. 펀더멘털 개요는 1년치 일봉에서
//! 파생 가능한 값(52주 고가, 10일/3개월 평균 거래량)만 채우고 나머지는 누락으로 둡니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::DateTime;
use radar_core::{DailyBar, Overview, ProviderError, ProviderResult, Quote, RawSeries};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use super::MarketDataProvider;

/// 3개월 평균 거래량 계산 기간 (거래일).
const THREE_MONTH_SESSIONS: usize = 63;
const TEN_DAY_SESSIONS: usize = 10;

/// Yahoo Finance Provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    /// 새 Provider 생성.
    pub fn new() -> ProviderResult<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| ProviderError::Unavailable(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }

    /// 지정 기간의 일봉 조회 (날짜 중복 시 마지막 값 유지).
    async fn fetch_bars(&self, symbol: &str, range: &str) -> ProviderResult<Vec<DailyBar>> {
        debug!(symbol, range, "Yahoo Finance 일봉 요청");

        let response = self
            .connector
            .get_quote_range(symbol, "1d", range)
            .await
            .map_err(|e| map_yahoo_error(symbol, &e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| map_yahoo_error(symbol, &e.to_string()))?;

        let mut by_date = BTreeMap::new();
        for q in &quotes {
            match quote_to_bar(q) {
                Some(bar) => {
                    by_date.insert(bar.date, bar);
                }
                None => warn!(symbol, timestamp = q.timestamp, "Yahoo Finance: 변환 불가 일봉 건너뜀"),
            }
        }

        if by_date.is_empty() {
            return Err(ProviderError::NotFound(format!("{}: 일봉 데이터 없음", symbol)));
        }

        Ok(by_date.into_values().collect())
    }
}

/// Yahoo 에러 메시지를 에러 종류로 분류.
fn map_yahoo_error(symbol: &str, message: &str) -> ProviderError {
    let lower = message.to_lowercase();
    let message = format!("{}: {}", symbol, message);

    if lower.contains("too many requests") || lower.contains("429") {
        ProviderError::RateLimited(message)
    } else if lower.contains("no result")
        || lower.contains("no quotes")
        || lower.contains("empty data")
        || lower.contains("not found")
    {
        ProviderError::NotFound(message)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ProviderError::Timeout(message)
    } else if lower.contains("deserializ") || lower.contains("parse") {
        ProviderError::MalformedResponse(message)
    } else {
        ProviderError::Unavailable(message)
    }
}

/// Yahoo Quote를 일봉으로 변환. 값이 비정상(NaN 등)이면 `None`.
fn quote_to_bar(q: &yahoo::Quote) -> Option<DailyBar> {
    let date = DateTime::from_timestamp(q.timestamp, 0)?.date_naive();

    Some(DailyBar {
        date,
        open: Decimal::from_f64_retain(q.open)?,
        high: Decimal::from_f64_retain(q.high)?,
        low: Decimal::from_f64_retain(q.low)?,
        close: Decimal::from_f64_retain(q.close)?,
        volume: i64::try_from(q.volume).ok()?,
    })
}

fn mean_volume(bars: &[DailyBar]) -> Option<i64> {
    if bars.is_empty() {
        return None;
    }
    let total: i128 = bars.iter().map(|b| b.volume as i128).sum();
    i64::try_from(total / bars.len() as i128).ok()
}

/// 1년치 일봉에서 개요 파생.
///
/// 평균 거래량은 최근 일봉을 제외한 직전 거래일 기준이며,
/// 기간을 채우지 못하면 누락입니다.
pub(crate) fn overview_from_bars(bars: &[DailyBar]) -> Overview {
    let week_52_high = bars.iter().map(|b| b.high).max();

    let prior = match bars.split_last() {
        Some((_, prior)) => prior,
        None => &[],
    };

    let window_average = |window: usize| {
        (prior.len() >= window)
            .then(|| mean_volume(&prior[prior.len() - window..]))
            .flatten()
    };

    Overview {
        week_52_high,
        avg_volume_10d: window_average(TEN_DAY_SESSIONS),
        avg_volume: window_average(THREE_MONTH_SESSIONS),
        ..Overview::missing()
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_daily_series(&self, symbol: &str) -> ProviderResult<RawSeries> {
        let bars = self.fetch_bars(symbol, "3mo").await?;
        RawSeries::new(symbol, bars)
            .map_err(|e| ProviderError::MalformedResponse(format!("{}: {}", symbol, e)))
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let bars = self.fetch_bars(symbol, "5d").await?;
        let (latest, prior) = bars
            .split_last()
            .ok_or_else(|| ProviderError::NotFound(format!("{}: 시세 없음", symbol)))?;

        Ok(Quote {
            price: latest.close,
            volume: Some(latest.volume),
            latest_trading_day: latest.date,
            previous_close: prior.last().map(|b| b.close),
        })
    }

    async fn fetch_overview(&self, symbol: &str) -> ProviderResult<Overview> {
        let bars = self.fetch_bars(symbol, "1y").await?;
        Ok(overview_from_bars(&bars))
    }
}

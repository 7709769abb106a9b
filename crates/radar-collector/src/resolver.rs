//! 심볼 해석기.
//!
//! 심볼 하나에 대해 Provider 호출과 지표 계산을 조율하여
//! [`ScreeningRecord`] 하나 또는 실패 사유를 만듭니다.
//!
//! # 실패 규칙
//!
//! | 조각 | 실패 시 |
//! |---|---|
//! | 일봉 시계열 | 심볼 실패 (hard) |
//! | 시세 | 마지막 두 종가로 등락률 계산 |
//! | 개요 | 모든 펀더멘털 누락 |
//! | 뉴스 | 0건 |
//! | Provider RSI | RSI 누락 |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use radar_analytics::{IndicatorEngine, IndicatorInput};
use radar_core::{
    Clock, ProviderError, ProviderResult, ResolveFailure, ScreeningRecord, SystemClock,
};
use radar_data::MarketDataProvider;
use tracing::{debug, warn};

/// 기본 Provider 호출 타임아웃.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// 심볼 해석기.
#[derive(Clone)]
pub struct SymbolResolver {
    provider: Arc<dyn MarketDataProvider>,
    engine: IndicatorEngine,
    clock: Arc<dyn Clock>,
    market_tz: Tz,
    call_timeout: Duration,
}

impl SymbolResolver {
    /// 기본 설정(뉴욕 시간대, 15초 타임아웃, RSI 14)의 해석기 생성.
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            engine: IndicatorEngine::new(),
            clock: Arc::new(SystemClock),
            market_tz: chrono_tz::America::New_York,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// 시계 지정.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 시장 시간대 지정.
    pub fn with_market_timezone(mut self, tz: Tz) -> Self {
        self.market_tz = tz;
        self
    }

    /// Provider 호출 타임아웃 지정.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// RSI 기간 지정.
    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.engine = self.engine.with_rsi_period(period);
        self
    }

    /// Provider 이름.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// 주입된 시계.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// 시장 시간대 기준 오늘 날짜.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.market_tz).date_naive()
    }

    /// 호출 하나의 대기 한도: 호출당 타임아웃 x upstream 수.
    ///
    /// failover Provider는 앞선 upstream이 타임아웃을 다 쓴 뒤에도 다음 upstream을 시도할 수 있습니다.
    pub fn call_budget(&self) -> Duration {
        let upstreams = u32::try_from(self.provider.upstream_count().max(1)).unwrap_or(u32::MAX);
        self.call_timeout.saturating_mul(upstreams)
    }

    /// 타임아웃을 적용한 Provider 호출.
    async fn timed<T>(
        &self,
        piece: &str,
        symbol: &str,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let budget = self.call_budget();
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{} {}: {:.1}초 내에 응답 없음",
                piece,
                symbol,
                budget.as_secs_f64()
            ))),
        }
    }

    /// soft 조각 결과 처리: 실패는 로그 후 `None`.
    fn soft<T>(symbol: &str, piece: &str, result: ProviderResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(symbol, piece, kind = %e.kind(), error = %e, "보조 데이터 조회 실패, 누락 처리");
                None
            }
        }
    }

    /// 심볼 하나 해석.
    pub async fn resolve(&self, symbol: &str) -> Result<ScreeningRecord, ResolveFailure> {
        let provider = self.provider.as_ref();

        let series = self
            .timed("series", symbol, provider.fetch_daily_series(symbol))
            .await
            .map_err(|e| {
                warn!(symbol, kind = %e.kind(), error = %e, "일봉 조회 실패");
                e
            })?;

        let (quote, overview, news) = tokio::join!(
            self.timed("quote", symbol, provider.fetch_quote(symbol)),
            self.timed("overview", symbol, provider.fetch_overview(symbol)),
            self.timed("news", symbol, provider.fetch_news_count(symbol)),
        );

        let quote = Self::soft(symbol, "quote", quote);
        let overview = Self::soft(symbol, "overview", overview).unwrap_or_default();
        let news_count = Self::soft(symbol, "news", news).unwrap_or(0);

        let today = self.today();
        let snapshot = self
            .engine
            .evaluate(&IndicatorInput {
                series: &series,
                quote: quote.as_ref(),
                overview: &overview,
                today,
            })
            .map_err(|e| {
                warn!(symbol, error = %e, "지표 계산 불가");
                e
            })?;

        // 로컬 RSI가 없을 때만 Provider 계산값 사용
        let rsi_14 = match snapshot.rsi {
            Some(rsi) => Some(rsi),
            None => {
                let period = self.engine.rsi_period();
                Self::soft(
                    symbol,
                    "rsi",
                    self.timed("rsi", symbol, provider.fetch_rsi(symbol, period))
                        .await,
                )
            }
        };

        let as_of = series.latest().map(|b| b.date).unwrap_or(today);
        let rel_volume = snapshot.rel_volume;

        if rel_volume.is_fallback() {
            debug!(symbol, "평균 거래량 없음, 당일 거래량으로 대체");
        }

        Ok(ScreeningRecord {
            symbol: series.symbol().to_string(),
            price: snapshot.price.price,
            change_pct: snapshot.price.change_pct,
            rel_volume: rel_volume.value,
            rel_volume_source: Some(rel_volume.source),
            volume: snapshot.volume,
            avg_volume: Some(rel_volume.average).filter(|a| *a > 0),
            market_cap_m: snapshot.market_cap_m,
            beta: overview.beta,
            pct_from_high: snapshot.pct_from_high,
            rsi_14,
            sector: overview.sector,
            float_m: snapshot.float_m,
            short_pct: overview.short_pct_float,
            news_count,
            price_source: snapshot.price.source,
            as_of,
            fetched_at: self.clock.now(),
        })
    }
}

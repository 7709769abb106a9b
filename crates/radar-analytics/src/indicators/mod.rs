//! 스크리닝 지표 모듈.
//!
//! 원시 시계열과 개요에서 스크리닝 지표를 계산하는 순수 함수들을 제공합니다.
//!
//! # 지원 지표
//!
//! - **등락률**: 전일 종가 대비 (%), 당일 실시간 시세 우선
//! - **상대 거래량**: 당일 거래량 / 평균 거래량 (출처 표시 포함)
//! - **RSI(14)**: 단순 이동평균 기반 상대강도지수
//! - **52주 최고가 대비**: 현재가 / 52주 최고가 (%)
//! - **시가총액/유통주식 정규화**: 백만 단위
//!
//! # 사용 예시
//!
//! ```ignore
//! use radar_analytics::indicators::{IndicatorEngine, IndicatorInput};
//!
//! let engine = IndicatorEngine::new();
//! let snapshot = engine.evaluate(&IndicatorInput {
//!     series: &series,
//!     quote: quote.as_ref(),
//!     overview: &overview,
//!     today,
//! })?;
//! ```

pub mod momentum;
pub mod normalize;
pub mod price;
pub mod volume;

use chrono::NaiveDate;
use radar_core::{ComputationError, Overview, PriceSource, Quote, RawSeries};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use momentum::{rsi, rsi_series, RSI_PERIOD};
pub use normalize::to_millions;
pub use price::{pct_change, pct_from_high, price_change, PriceChange};
pub use volume::{
    evaluate_relative_volume, relative_volume, resolve_average_volume, series_average_volume,
    AverageVolumeCandidates, RelativeVolume,
};

/// 기본 평균 거래량 계산 기간 (거래일).
pub const AVG_VOLUME_WINDOW: usize = 10;

/// 지표 계산 입력.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorInput<'a> {
    /// 일봉 시계열 (필수)
    pub series: &'a RawSeries,
    /// 실시간 시세 (선택)
    pub quote: Option<&'a Quote>,
    /// 펀더멘털 개요 (누락 필드 허용)
    pub overview: &'a Overview,
    /// 시장 기준 오늘 날짜
    pub today: NaiveDate,
}

/// 계산된 지표 묶음.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// 현재가와 등락률
    pub price: PriceChange,
    /// 당일 거래량
    pub volume: i64,
    /// 상대 거래량
    pub rel_volume: RelativeVolume,
    /// RSI. 종가가 부족하면 `None`.
    pub rsi: Option<Decimal>,
    /// 52주 최고가 대비 (%)
    pub pct_from_high: Option<Decimal>,
    /// 시가총액 (백만)
    pub market_cap_m: Option<Decimal>,
    /// 유통 주식 수 (백만)
    pub float_m: Option<Decimal>,
}

/// 통합 지표 엔진.
///
/// 상태가 없으며 같은 입력에 항상 같은 결과를 반환합니다.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorEngine {
    rsi_period: usize,
    avg_volume_window: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            rsi_period: RSI_PERIOD,
            avg_volume_window: AVG_VOLUME_WINDOW,
        }
    }
}

impl IndicatorEngine {
    /// 기본 설정(RSI 14, 평균 거래량 10일)의 엔진 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// RSI 기간 설정.
    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    /// 설정된 RSI 기간.
    pub fn rsi_period(&self) -> usize {
        self.rsi_period
    }

    /// 모든 지표 계산.
    ///
    /// 현재가/등락률 계산만 실패할 수 있습니다 (일봉 2개 미만).
    /// 나머지 지표는 입력이 부족하면 누락 값이 됩니다.
    pub fn evaluate(&self, input: &IndicatorInput<'_>) -> Result<IndicatorSnapshot, ComputationError> {
        let series = input.series;
        let price = price_change(series, input.quote, input.today)?;

        let bar_volume = series.latest().map(|b| b.volume).unwrap_or_default();
        let volume = match (price.source, input.quote.and_then(|q| q.volume)) {
            (PriceSource::LiveQuote, Some(live_volume)) => live_volume,
            _ => bar_volume,
        };

        let candidates = AverageVolumeCandidates {
            ten_day: input.overview.avg_volume_10d,
            ten_day_series: series_average_volume(series, self.avg_volume_window),
            general: input.overview.avg_volume,
        };
        let rel_volume = evaluate_relative_volume(&candidates, volume);

        let rsi = match rsi(&series.closes(), self.rsi_period) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(symbol = series.symbol(), error = %e, "RSI 계산 불가");
                None
            }
        };

        Ok(IndicatorSnapshot {
            pct_from_high: pct_from_high(price.price, input.overview.week_52_high),
            market_cap_m: to_millions(input.overview.market_cap),
            float_m: to_millions(input.overview.float_shares),
            price,
            volume,
            rel_volume,
            rsi,
        })
    }
}

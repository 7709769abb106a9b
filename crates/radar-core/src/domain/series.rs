//! 일봉 가격/거래량 시계열.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ComputationError;

/// 일봉 한 개.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
}

/// 심볼 하나의 일봉 시계열.
///
/// 날짜 기준 엄격한 오름차순이며 중복 날짜가 없습니다.
/// 생성자에서 이 불변식을 검증합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSeries {
    symbol: String,
    bars: Vec<DailyBar>,
}

impl RawSeries {
    /// 이미 정렬된 일봉으로 시계열 생성.
    ///
    /// 날짜가 오름차순이 아니거나 중복되면 `DegenerateInput`.
    pub fn new(symbol: impl Into<String>, bars: Vec<DailyBar>) -> Result<Self, ComputationError> {
        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ComputationError::degenerate(format!(
                "시계열 날짜가 엄격한 오름차순이 아닙니다: {} -> {}",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    /// 순서가 보장되지 않은 일봉으로 시계열 생성.
    ///
    /// Provider 응답(날짜 키 맵 등)용. 날짜순 정렬 후 중복 날짜가 있으면 `DegenerateInput`.
    pub fn from_unordered(
        symbol: impl Into<String>,
        mut bars: Vec<DailyBar>,
    ) -> Result<Self, ComputationError> {
        bars.sort_by_key(|b| b.date);
        Self::new(symbol, bars)
    }

    /// 심볼.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 전체 일봉 (오름차순).
    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    /// 일봉 개수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 가장 최근 일봉.
    pub fn latest(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    /// 최근 일봉 직전의 일봉.
    pub fn previous(&self) -> Option<&DailyBar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// 종가 목록 (오름차순).
    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// 최근 N개 일봉만 남긴 시계열.
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.bars.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[skip..].to_vec(),
        }
    }
}

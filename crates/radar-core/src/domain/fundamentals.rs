//! 실시간 시세와 펀더멘털 개요.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 최신 시세 (장중 가격 포함).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// 현재가
    pub price: Decimal,
    /// 당일 누적 거래량
    pub volume: Option<i64>,
    /// 시세가 속한 거래일
    pub latest_trading_day: NaiveDate,
    /// 전일 종가
    pub previous_close: Option<Decimal>,
}

/// 펀더멘털 개요.
///
/// 모든 필드는 누락될 수 있으며 `None`은 "제공되지 않음"을 뜻합니다.
/// 0으로 대체하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    /// 시가총액 (통화 단위 원값)
    pub market_cap: Option<Decimal>,
    /// 베타
    pub beta: Option<Decimal>,
    /// 섹터
    pub sector: Option<String>,
    /// 52주 최고가
    pub week_52_high: Option<Decimal>,
    /// 유통 주식 수 (원값)
    pub float_shares: Option<Decimal>,
    /// 유통 주식 대비 공매도 비율 (%)
    pub short_pct_float: Option<Decimal>,
    /// 10일 평균 거래량
    pub avg_volume_10d: Option<i64>,
    /// 일반 평균 거래량 (Provider 기준 기간)
    pub avg_volume: Option<i64>,
}

impl Overview {
    /// 모든 필드가 누락된 개요 (overview 조회 실패 시 사용).
    pub fn missing() -> Self {
        Self::default()
    }

    /// 제공된 필드가 하나도 없는지 여부.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 비어 있는 필드를 `other`의 값으로 채운 개요 반환.
    pub fn or(self, other: Overview) -> Self {
        Self {
            market_cap: self.market_cap.or(other.market_cap),
            beta: self.beta.or(other.beta),
            sector: self.sector.or(other.sector),
            week_52_high: self.week_52_high.or(other.week_52_high),
            float_shares: self.float_shares.or(other.float_shares),
            short_pct_float: self.short_pct_float.or(other.short_pct_float),
            avg_volume_10d: self.avg_volume_10d.or(other.avg_volume_10d),
            avg_volume: self.avg_volume.or(other.avg_volume),
        }
    }
}

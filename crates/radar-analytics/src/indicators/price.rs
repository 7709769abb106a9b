//! 가격 기반 지표.
//!
//! - 등락률: `(현재가 - 전일 종가) / 전일 종가 × 100`
//! - 52주 최고가 대비: `현재가 / 52주 최고가 × 100`

use chrono::NaiveDate;
use radar_core::{ComputationError, PriceSource, Quote, RawSeries};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = dec!(100);

/// 현재가와 등락률.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    /// 현재가
    pub price: Decimal,
    /// 비교 기준 전일 종가
    pub previous_close: Decimal,
    /// 등락률 (%). 전일 종가가 0 이하이면 `None`.
    pub change_pct: Option<Decimal>,
    /// 현재가 출처
    pub source: PriceSource,
}

/// 두 가격 사이의 변화율 (%).
///
/// `previous`가 0 이하이면 `None`.
pub fn pct_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }

    (current - previous)
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
}

/// 시계열(과 선택적 실시간 시세)로 현재가와 등락률 계산.
///
/// 최근 일봉 날짜가 `today`이고 같은 날의 시세가 있으면 시세 가격을 현재가로 사용하고,
/// 그렇지 않으면 마지막 두 종가를 비교합니다. 일봉이 2개 미만이면 `InsufficientData`.
pub fn price_change(
    series: &RawSeries,
    quote: Option<&Quote>,
    today: NaiveDate,
) -> Result<PriceChange, ComputationError> {
    let (latest, previous) = match (series.latest(), series.previous()) {
        (Some(latest), Some(previous)) => (latest, previous),
        _ => {
            return Err(ComputationError::InsufficientData {
                required: 2,
                provided: series.len(),
            })
        }
    };

    let live = quote.filter(|q| {
        latest.date == today && q.latest_trading_day == today && q.price > Decimal::ZERO
    });

    let (price, source) = match live {
        Some(q) => (q.price, PriceSource::LiveQuote),
        None => (latest.close, PriceSource::LastClose),
    };

    Ok(PriceChange {
        price,
        previous_close: previous.close,
        change_pct: pct_change(price, previous.close),
        source,
    })
}

/// 52주 최고가 대비 현재가 비율 (%).
///
/// 최고가가 없거나 0 이하이면 현재가를 최고가로 간주합니다 (100%).
/// 현재가 자체가 0 이하일 때만 `None`.
pub fn pct_from_high(price: Decimal, week_52_high: Option<Decimal>) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }

    let high = week_52_high
        .filter(|h| *h > Decimal::ZERO)
        .unwrap_or(price);

    price
        .checked_div(high)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use radar_core::DailyBar;

    fn series(closes: &[Decimal]) -> RawSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| DailyBar {
                date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + chrono::Days::new(i as u64),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 1_000,
            })
            .collect();
        RawSeries::new("TEST", bars).unwrap()
    }

    fn quote(price: Decimal, day: NaiveDate) -> Quote {
        Quote {
            price,
            volume: Some(5_000),
            latest_trading_day: day,
            previous_close: None,
        }
    }

    #[test]
    fn test_change_from_last_two_closes() {
        let s = series(&[dec!(10), dec!(11)]);
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        let change = price_change(&s, None, today).unwrap();
        assert_eq!(change.price, dec!(11));
        assert_eq!(change.change_pct, Some(dec!(10)));
        assert_eq!(change.source, PriceSource::LastClose);
    }

    #[test]
    fn test_live_quote_preferred_when_latest_session_is_today() {
        let s = series(&[dec!(10), dec!(11)]);
        let today = s.latest().unwrap().date;

        let change = price_change(&s, Some(&quote(dec!(12), today)), today).unwrap();
        assert_eq!(change.price, dec!(12));
        assert_eq!(change.change_pct, Some(dec!(20)));
        assert_eq!(change.source, PriceSource::LiveQuote);
    }

    #[test]
    fn test_stale_session_ignores_quote() {
        let s = series(&[dec!(10), dec!(11)]);
        let latest = s.latest().unwrap().date;
        let today = latest + chrono::Days::new(1);

        let change = price_change(&s, Some(&quote(dec!(12), today)), today).unwrap();
        assert_eq!(change.price, dec!(11));
        assert_eq!(change.source, PriceSource::LastClose);
    }

    #[test]
    fn test_single_bar_is_insufficient() {
        let s = series(&[dec!(10)]);
        let err = price_change(&s, None, NaiveDate::MIN).unwrap_err();
        assert_eq!(
            err,
            ComputationError::InsufficientData {
                required: 2,
                provided: 1
            }
        );
    }

    #[test]
    fn test_non_positive_previous_close_is_missing() {
        assert_eq!(pct_change(dec!(5), Decimal::ZERO), None);
        assert_eq!(pct_change(dec!(5), dec!(-1)), None);

        let s = series(&[Decimal::ZERO, dec!(11)]);
        let change = price_change(&s, None, NaiveDate::MIN).unwrap();
        assert_eq!(change.change_pct, None);
        assert_eq!(change.price, dec!(11));
    }

    #[test]
    fn test_pct_from_high() {
        let pct = pct_from_high(dec!(11), Some(dec!(12.1))).unwrap();
        assert_eq!(pct.round_dp(1), dec!(90.9));
    }

    #[test]
    fn test_pct_from_high_fallback_to_price() {
        assert_eq!(pct_from_high(dec!(11), None), Some(dec!(100)));
        assert_eq!(pct_from_high(dec!(11), Some(Decimal::ZERO)), Some(dec!(100)));
        assert_eq!(pct_from_high(dec!(11), Some(dec!(-3))), Some(dec!(100)));
        assert_eq!(pct_from_high(Decimal::ZERO, Some(dec!(12))), None);
    }

    proptest! {
        #[test]
        fn prop_change_matches_formula(prev_cents in 1i64..10_000_000, last_cents in 0i64..10_000_000) {
            let prev = Decimal::new(prev_cents, 2);
            let last = Decimal::new(last_cents, 2);
            let s = series(&[prev, last]);

            let change = price_change(&s, None, NaiveDate::MIN).unwrap();
            let pct = change.change_pct.unwrap();
            let expected = (last - prev) / prev * HUNDRED;

            prop_assert!((pct - expected).abs() < dec!(0.000001));
        }
    }
}

//! 거래량 기반 지표.
//!
//! ## 상대 거래량 (Relative Volume)
//!
//! `당일 거래량 / 평균 거래량`
//!
//! 평균 거래량은 아래 선호 순서에서 처음으로 존재하는 값을 사용합니다:
//! 1. Provider가 제공한 10일 평균
//! 2. 시계열에서 계산한 10일 평균 (최근 일봉 직전 10거래일)
//! 3. Provider가 제공한 일반 평균
//! 4. 당일 거래량 자체 ([`AverageVolumeSource::TodayFallback`])
//!
//! 4번은 비율이 항상 1.0이 되므로 신뢰도 낮은 대체값으로 표시됩니다.
//! 선택된 평균이 0 이하이면 상대 거래량은 누락(`None`)입니다.

use radar_core::{AverageVolumeSource, RawSeries};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 평균 거래량 후보.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AverageVolumeCandidates {
    /// Provider 10일 평균
    pub ten_day: Option<i64>,
    /// 시계열에서 계산한 10일 평균
    pub ten_day_series: Option<i64>,
    /// Provider 일반 평균
    pub general: Option<i64>,
}

/// 상대 거래량 계산 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeVolume {
    /// 상대 거래량. 평균이 0 이하이면 `None`.
    pub value: Option<Decimal>,
    /// 사용한 평균 거래량
    pub average: i64,
    /// 평균 거래량 출처
    pub source: AverageVolumeSource,
}

impl RelativeVolume {
    /// 당일 거래량 대체값으로 계산되었는지 여부.
    pub fn is_fallback(&self) -> bool {
        self.source.is_fallback()
    }
}

/// 최근 일봉 직전 `window`개 거래일의 평균 거래량.
///
/// 직전 거래일이 `window`개보다 적으면 `None`.
pub fn series_average_volume(series: &RawSeries, window: usize) -> Option<i64> {
    let bars = series.bars();
    if window == 0 || bars.len() < window + 1 {
        return None;
    }

    let prior = &bars[bars.len() - 1 - window..bars.len() - 1];
    let total: i128 = prior.iter().map(|b| b.volume as i128).sum();
    i64::try_from(total / window as i128).ok()
}

/// 선호 순서에 따라 평균 거래량과 출처를 결정.
pub fn resolve_average_volume(
    candidates: &AverageVolumeCandidates,
    today_volume: i64,
) -> (i64, AverageVolumeSource) {
    candidates
        .ten_day
        .or(candidates.ten_day_series)
        .map(|v| (v, AverageVolumeSource::TenDay))
        .or_else(|| candidates.general.map(|v| (v, AverageVolumeSource::General)))
        .unwrap_or((today_volume, AverageVolumeSource::TodayFallback))
}

/// 상대 거래량 (`today / average`).
///
/// 평균이 없거나 0 이하, 또는 당일 거래량이 음수이면 `None`.
pub fn relative_volume(today_volume: i64, average: Option<i64>) -> Option<Decimal> {
    let average = average.filter(|a| *a > 0)?;
    if today_volume < 0 {
        return None;
    }

    Decimal::from(today_volume).checked_div(Decimal::from(average))
}

/// 후보 평균으로 상대 거래량 계산.
pub fn evaluate_relative_volume(
    candidates: &AverageVolumeCandidates,
    today_volume: i64,
) -> RelativeVolume {
    let (average, source) = resolve_average_volume(candidates, today_volume);

    RelativeVolume {
        value: relative_volume(today_volume, Some(average)),
        average,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use radar_core::DailyBar;
    use rust_decimal_macros::dec;

    fn series_with_volumes(volumes: &[i64]) -> RawSeries {
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, v)| DailyBar {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: dec!(1),
                high: dec!(1),
                low: dec!(1),
                close: dec!(1),
                volume: *v,
            })
            .collect();
        RawSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn test_preference_order() {
        let all = AverageVolumeCandidates {
            ten_day: Some(100),
            ten_day_series: Some(200),
            general: Some(300),
        };
        assert_eq!(
            resolve_average_volume(&all, 50),
            (100, AverageVolumeSource::TenDay)
        );

        let no_provider_ten_day = AverageVolumeCandidates {
            ten_day: None,
            ..all
        };
        assert_eq!(
            resolve_average_volume(&no_provider_ten_day, 50),
            (200, AverageVolumeSource::TenDay)
        );

        let general_only = AverageVolumeCandidates {
            general: Some(300),
            ..Default::default()
        };
        assert_eq!(
            resolve_average_volume(&general_only, 50),
            (300, AverageVolumeSource::General)
        );

        assert_eq!(
            resolve_average_volume(&AverageVolumeCandidates::default(), 50),
            (50, AverageVolumeSource::TodayFallback)
        );
    }

    #[test]
    fn test_fallback_is_flagged() {
        let rv = evaluate_relative_volume(&AverageVolumeCandidates::default(), 4_000);
        assert_eq!(rv.value, Some(Decimal::ONE));
        assert!(rv.is_fallback());

        let rv = evaluate_relative_volume(
            &AverageVolumeCandidates {
                general: Some(4_000),
                ..Default::default()
            },
            4_000,
        );
        assert_eq!(rv.value, Some(Decimal::ONE));
        assert!(!rv.is_fallback());
    }

    #[test]
    fn test_zero_average_is_missing() {
        let rv = evaluate_relative_volume(
            &AverageVolumeCandidates {
                ten_day: Some(0),
                general: Some(1_000),
                ..Default::default()
            },
            500,
        );
        assert_eq!(rv.value, None);
        assert_eq!(rv.source, AverageVolumeSource::TenDay);

        // 당일 거래량도 0이면 대체값도 누락
        let rv = evaluate_relative_volume(&AverageVolumeCandidates::default(), 0);
        assert_eq!(rv.value, None);
    }

    #[test]
    fn test_relative_volume_ratio() {
        assert_eq!(relative_volume(3_000, Some(1_000)), Some(dec!(3)));
        assert_eq!(relative_volume(500, Some(1_000)), Some(dec!(0.5)));
        assert_eq!(relative_volume(500, None), None);
    }

    #[test]
    fn test_series_average_excludes_latest() {
        let mut volumes: Vec<i64> = vec![100; 10];
        volumes.push(9_999);
        let s = series_with_volumes(&volumes);

        assert_eq!(series_average_volume(&s, 10), Some(100));
        assert_eq!(series_average_volume(&s.tail(10), 10), None);
        assert_eq!(series_average_volume(&s, 0), None);
    }

    proptest! {
        #[test]
        fn prop_non_positive_average_never_divides(today in 0i64..1_000_000_000, avg in -1_000_000i64..=0) {
            prop_assert_eq!(relative_volume(today, Some(avg)), None);
            prop_assert_eq!(relative_volume(today, None), None);
        }

        #[test]
        fn prop_positive_average_is_finite_ratio(today in 0i64..1_000_000_000, avg in 1i64..1_000_000_000) {
            let ratio = relative_volume(today, Some(avg)).unwrap();
            prop_assert!(ratio >= Decimal::ZERO);
        }
    }
}

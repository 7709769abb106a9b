//! 필터/정렬 뷰.
//!
//! 완성된 데이터셋 위에서 동작하는 순수 함수들입니다.
//! 필터는 입력 순서를 유지하고, 정렬은 안정 정렬이며 누락 값은 항상 마지막입니다.

use std::cmp::Ordering;
use std::str::FromStr;

use radar_core::{ScreeningDataset, ScreeningRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 누락 값 처리 정책.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// 누락 값을 0으로 보고 비교
    #[default]
    TreatAsZero,
    /// 조건이 걸린 필드가 누락되면 제외
    Exclude,
}

/// 스크리닝 필터 (모든 조건의 AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningFilter {
    pub min_change_pct: Option<Decimal>,
    pub min_rsi: Option<Decimal>,
    pub min_news_count: Option<u32>,
    #[serde(default)]
    pub missing: MissingPolicy,
}

impl ScreeningFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_change_pct(mut self, value: Decimal) -> Self {
        self.min_change_pct = Some(value);
        self
    }

    pub fn min_rsi(mut self, value: Decimal) -> Self {
        self.min_rsi = Some(value);
        self
    }

    pub fn min_news_count(mut self, value: u32) -> Self {
        self.min_news_count = Some(value);
        self
    }

    pub fn with_missing(mut self, policy: MissingPolicy) -> Self {
        self.missing = policy;
        self
    }

    /// 조건이 하나도 없는지 여부.
    pub fn is_empty(&self) -> bool {
        self.min_change_pct.is_none() && self.min_rsi.is_none() && self.min_news_count.is_none()
    }

    fn passes(&self, value: Option<Decimal>, floor: Option<Decimal>) -> bool {
        let Some(floor) = floor else {
            return true;
        };
        match (value, self.missing) {
            (Some(v), _) => v >= floor,
            (None, MissingPolicy::TreatAsZero) => Decimal::ZERO >= floor,
            (None, MissingPolicy::Exclude) => false,
        }
    }

    /// 레코드 하나가 모든 조건을 만족하는지 여부.
    pub fn matches(&self, record: &ScreeningRecord) -> bool {
        self.passes(record.change_pct, self.min_change_pct)
            && self.passes(record.rsi_14, self.min_rsi)
            && self
                .min_news_count
                .map_or(true, |floor| record.news_count >= floor)
    }

    /// 데이터셋 필터링 (입력 순서 유지).
    pub fn filter<'a>(&self, dataset: &'a ScreeningDataset) -> Vec<&'a ScreeningRecord> {
        dataset.iter().filter(|r| self.matches(r)).collect()
    }
}

/// 정렬 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankKey {
    Change,
    RelVolume,
    Rsi,
    FromHigh,
    MarketCap,
    News,
    Volume,
    Symbol,
}

impl FromStr for RankKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "change" | "change-pct" => Ok(Self::Change),
            "rel-volume" | "relvol" => Ok(Self::RelVolume),
            "rsi" => Ok(Self::Rsi),
            "from-high" => Ok(Self::FromHigh),
            "market-cap" | "mcap" => Ok(Self::MarketCap),
            "news" => Ok(Self::News),
            "volume" => Ok(Self::Volume),
            "symbol" => Ok(Self::Symbol),
            other => Err(format!("알 수 없는 정렬 기준: {}", other)),
        }
    }
}

/// 정렬 방향.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

fn decimal_key(record: &ScreeningRecord, key: RankKey) -> Option<Decimal> {
    match key {
        RankKey::Change => record.change_pct,
        RankKey::RelVolume => record.rel_volume,
        RankKey::Rsi => record.rsi_14,
        RankKey::FromHigh => record.pct_from_high,
        RankKey::MarketCap => record.market_cap_m,
        RankKey::News => Some(Decimal::from(record.news_count)),
        RankKey::Volume => Some(Decimal::from(record.volume)),
        RankKey::Symbol => None,
    }
}

/// 레코드 정렬 (안정 정렬, 누락 값은 방향과 무관하게 마지막).
pub fn rank(records: &mut [&ScreeningRecord], key: RankKey, direction: SortDirection) {
    records.sort_by(|a, b| {
        if key == RankKey::Symbol {
            let ord = a.symbol.cmp(&b.symbol);
            return match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
        }

        match (decimal_key(a, key), decimal_key(b, key)) {
            (Some(x), Some(y)) => match direction {
                SortDirection::Ascending => x.cmp(&y),
                SortDirection::Descending => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

//! 스크리닝 결과 레코드와 데이터셋.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// 현재가 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// 마지막 일봉 종가
    LastClose,
    /// 당일 실시간 시세
    LiveQuote,
}

/// 상대 거래량 계산에 사용한 평균 거래량 출처.
///
/// 선호 순서대로 정의되어 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageVolumeSource {
    /// 10일 평균 거래량
    TenDay,
    /// 일반 평균 거래량
    General,
    /// 평균 없음 - 당일 거래량으로 대체 (신뢰도 낮음, 비율은 항상 1.0)
    TodayFallback,
}

impl AverageVolumeSource {
    /// 신뢰도 낮은 대체값인지 여부.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::TodayFallback)
    }
}

/// 스크리닝 테이블의 한 행.
///
/// 수치 필드는 유한한 값이거나 `None`(누락)입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    /// 심볼
    pub symbol: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 등락률 (%)
    pub change_pct: Option<Decimal>,
    /// 상대 거래량 (당일 / 평균)
    pub rel_volume: Option<Decimal>,
    /// 평균 거래량 출처
    pub rel_volume_source: Option<AverageVolumeSource>,
    /// 당일 거래량
    pub volume: i64,
    /// 평균 거래량
    pub avg_volume: Option<i64>,
    /// 시가총액 (백만)
    pub market_cap_m: Option<Decimal>,
    /// 베타
    pub beta: Option<Decimal>,
    /// 52주 최고가 대비 (%)
    pub pct_from_high: Option<Decimal>,
    /// RSI(14)
    pub rsi_14: Option<Decimal>,
    /// 섹터
    pub sector: Option<String>,
    /// 유통 주식 수 (백만)
    pub float_m: Option<Decimal>,
    /// 공매도 비율 (%)
    pub short_pct: Option<Decimal>,
    /// 뉴스 언급 수
    pub news_count: u32,
    /// 현재가 출처
    pub price_source: PriceSource,
    /// 최근 거래일
    pub as_of: NaiveDate,
    /// 수집 시각
    pub fetched_at: DateTime<Utc>,
}

impl ScreeningRecord {
    /// 상대 거래량이 당일 거래량 대체값으로 계산되었는지 여부.
    pub fn rel_volume_is_fallback(&self) -> bool {
        self.rel_volume_source
            .map(|s| s.is_fallback())
            .unwrap_or(false)
    }
}

/// 등락률 내림차순, 누락 값은 뒤로, 동률은 심볼 사전순.
pub fn compare_by_change_desc(a: &ScreeningRecord, b: &ScreeningRecord) -> Ordering {
    match (a.change_pct, b.change_pct) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.symbol.cmp(&b.symbol))
}

/// 스크리닝 데이터셋.
///
/// 성공한 심볼당 레코드 하나. 같은 심볼의 레코드는 두 개 이상 존재하지 않으며
/// 항상 [`compare_by_change_desc`] 순서로 정렬되어 있습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScreeningDataset {
    records: Vec<ScreeningRecord>,
}

impl ScreeningDataset {
    /// 레코드 목록으로 데이터셋 생성.
    ///
    /// 같은 심볼이 여러 번 나오면 먼저 나온 레코드만 유지합니다.
    pub fn from_records(records: impl IntoIterator<Item = ScreeningRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut records: Vec<ScreeningRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.symbol.clone()))
            .collect();

        records.sort_by(compare_by_change_desc);
        Self { records }
    }

    /// 빈 데이터셋.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 레코드 (정렬 순서).
    pub fn records(&self) -> &[ScreeningRecord] {
        &self.records
    }

    /// 레코드 순회.
    pub fn iter(&self) -> std::slice::Iter<'_, ScreeningRecord> {
        self.records.iter()
    }

    /// 레코드 수.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 심볼로 레코드 조회.
    pub fn get(&self, symbol: &str) -> Option<&ScreeningRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    /// 심볼 목록 (정렬 순서).
    pub fn symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }

    /// 레코드 소유권 반환.
    pub fn into_records(self) -> Vec<ScreeningRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a ScreeningDataset {
    type Item = &'a ScreeningRecord;
    type IntoIter = std::slice::Iter<'a, ScreeningRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

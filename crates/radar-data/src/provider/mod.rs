//! 시장 데이터 Provider 모듈.
//!
//! 스크리닝에 필요한 원시 데이터를 외부 소스에서 가져오는 Provider들을 정의합니다.
//! 모든 Provider는 [`MarketDataProvider`] trait을 구현하며, 실패는 다섯 종류의
//! [`ProviderError`]로만 노출됩니다.
//!
//! ## Alpha Vantage
//! - `AlphaVantageClient`: REST API 클라이언트 (API 키 필요)
//! - 일봉, 실시간 시세, 펀더멘털 개요, 뉴스, RSI
//!
//! ## Yahoo Finance
//! - `YahooProvider`: 일봉/시세 및 일봉에서 파생한 개요
//!
//! ## 조합 / 테스트
//! - `CompositeProvider`: 순서대로 시도하는 failover
//! - `FixtureProvider`: JSON 파일 또는 코드로 구성한 데이터 재생

pub mod alpha_vantage;
pub mod composite;
pub mod fixture;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use composite::CompositeProvider;
pub use fixture::{CallCounts, FixtureProvider, FixtureSymbol};
pub use yahoo::YahooProvider;

use async_trait::async_trait;
use radar_core::{Overview, ProviderError, ProviderResult, Quote, RawSeries};
use rust_decimal::Decimal;

/// 시장 데이터 Provider trait.
///
/// 각 메서드는 한 번의 논리적 요청이며 재시도하지 않습니다.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 호출 하나가 차례로 시도할 수 있는 upstream 수.
    ///
    /// 호출자는 호출당 타임아웃에 이 값을 곱해 전체 대기 한도를 정합니다.
    fn upstream_count(&self) -> usize {
        1
    }

    /// 최근 일봉 시계열 조회 (날짜 오름차순).
    async fn fetch_daily_series(&self, symbol: &str) -> ProviderResult<RawSeries>;

    /// 실시간(최근) 시세 조회.
    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote>;

    /// 펀더멘털 개요 조회. 제공하지 않는 필드는 `None`.
    async fn fetch_overview(&self, symbol: &str) -> ProviderResult<Overview>;

    /// 최근 뉴스 건수 조회.
    async fn fetch_news_count(&self, symbol: &str) -> ProviderResult<u32> {
        Err(ProviderError::Unavailable(format!(
            "{}: 뉴스 조회를 지원하지 않습니다 ({})",
            self.name(),
            symbol
        )))
    }

    /// Provider가 계산한 최신 RSI 조회.
    async fn fetch_rsi(&self, symbol: &str, period: usize) -> ProviderResult<Decimal> {
        Err(ProviderError::Unavailable(format!(
            "{}: RSI({}) 조회를 지원하지 않습니다 ({})",
            self.name(),
            period,
            symbol
        )))
    }
}

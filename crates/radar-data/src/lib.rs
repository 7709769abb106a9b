//! 시장 데이터 수집 및 캐싱.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 시장 데이터 Provider trait과 구현체 (Alpha Vantage, Yahoo Finance, 복합, Fixture)
//! - 심볼별 스크리닝 레코드 캐시

pub mod cache;
pub mod provider;

pub use cache::{CacheEntry, CacheStats, RecordCache};
pub use provider::{
    AlphaVantageClient, CallCounts, CompositeProvider, FixtureProvider, FixtureSymbol,
    MarketDataProvider, YahooProvider,
};
pub use provider::fixture::{bars_from_closes, FixtureErrors, FixtureLoadError};

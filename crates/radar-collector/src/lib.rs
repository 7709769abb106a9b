//! 워치리스트 스크리닝 수집기.
//!
//! 이 crate는 다음을 제공합니다:
//! - 심볼 해석기 (Provider 호출 + 지표 계산 → 스크리닝 레코드)
//! - 캐시를 거치는 배치 집계기와 "지금 새로고침"
//! - 필터/정렬 뷰와 표/JSON 출력
//! - `radar` CLI 바이너리

pub mod aggregator;
pub mod config;
pub mod error;
pub mod providers;
pub mod render;
pub mod resolver;
pub mod stats;
pub mod view;

pub use aggregator::{
    normalize_watchlist, BatchAggregator, BatchReport, BatchStatus, SymbolFailure,
};
pub use config::{CollectorConfig, ProviderKind};
pub use error::{CollectorError, Result};
pub use providers::build_provider;
pub use render::OutputFormat;
pub use resolver::SymbolResolver;
pub use stats::CollectionStats;
pub use view::{rank, MissingPolicy, RankKey, ScreeningFilter, SortDirection};

//! 배치 집계기.
//!
//! 워치리스트 전체에 대해 캐시를 거쳐 심볼 해석기를 실행하고,
//! 성공한 레코드로 데이터셋을, 실패한 심볼로 실패 목록을 만듭니다.
//! 한 심볼의 실패는 다른 심볼에 영향을 주지 않습니다.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use radar_core::{Clock, ResolveFailure, ScreeningDataset, ScreeningRecord};
use radar_data::{CacheStats, MarketDataProvider, RecordCache};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use crate::config::CollectorConfig;
use crate::resolver::SymbolResolver;
use crate::stats::CollectionStats;
use crate::Result;

/// 기본 동시 해석 수.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// 해석에 실패한 심볼.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub failure: ResolveFailure,
}

impl SymbolFailure {
    /// 실패 사유 (에러 종류 또는 계산 에러).
    pub fn reason(&self) -> String {
        self.failure.reason()
    }
}

/// 배치 결과 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// 모든 심볼 성공
    Complete,
    /// 일부 심볼 실패
    Partial,
    /// 성공한 심볼 없음
    NoData,
}

/// 배치 실행 결과.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub dataset: ScreeningDataset,
    /// 워치리스트 순서
    pub failures: Vec<SymbolFailure>,
    pub stats: CollectionStats,
    pub cache: CacheStats,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        if self.dataset.is_empty() {
            BatchStatus::NoData
        } else if self.failures.is_empty() {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial
        }
    }

    /// 실패한 심볼 목록.
    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.symbol.as_str()).collect()
    }
}

/// 워치리스트 정규화: 공백 제거, 대문자화, 빈 항목과 중복 제거 (첫 등장 유지).
pub fn normalize_watchlist<S: AsRef<str>>(watchlist: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    watchlist
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// 배치 집계기.
pub struct BatchAggregator {
    resolver: SymbolResolver,
    cache: Arc<RecordCache>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl BatchAggregator {
    /// 해석기와 캐시로 생성.
    ///
    /// 완료 시각은 해석기의 시계를 사용합니다.
    pub fn new(resolver: SymbolResolver, cache: Arc<RecordCache>) -> Self {
        Self {
            clock: resolver.clock(),
            resolver,
            cache,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// 설정으로 해석기와 캐시를 구성하여 생성.
    pub fn from_config(
        config: &CollectorConfig,
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let resolver = SymbolResolver::new(provider)
            .with_clock(clock.clone())
            .with_market_timezone(config.market_timezone()?)
            .with_call_timeout(config.pipeline.call_timeout())
            .with_rsi_period(config.pipeline.rsi_period);
        let cache = Arc::new(RecordCache::new(config.pipeline.cache_ttl(), clock));

        Ok(Self::new(resolver, cache).with_concurrency(config.pipeline.concurrency))
    }

    /// 동시 해석 수 지정 (최소 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    /// 워치리스트 전체 실행.
    ///
    /// 모든 심볼의 해석이 끝난 뒤에 데이터셋을 만듭니다.
    pub async fn run<S: AsRef<str>>(&self, watchlist: &[S]) -> BatchReport {
        let start = Instant::now();
        let symbols = normalize_watchlist(watchlist);
        let total = symbols.len();

        info!(
            total,
            concurrency = self.concurrency,
            provider = self.resolver.provider_name(),
            "배치 실행 시작"
        );

        let done = AtomicUsize::new(0);
        let mut outcomes: Vec<(usize, String, std::result::Result<ScreeningRecord, ResolveFailure>)> =
            stream::iter(symbols.into_iter().enumerate())
                .map(|(idx, symbol)| {
                    let span = radar_core::symbol_span!(
                        "resolve",
                        symbol.as_str(),
                        self.resolver.provider_name()
                    );
                    let done = &done;
                    async move {
                        let result = self
                            .cache
                            .get_or_resolve(&symbol, || self.resolver.resolve(&symbol))
                            .await;
                        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(
                            progress = format!("{}/{}", finished, total),
                            ok = result.is_ok(),
                            "심볼 처리 완료"
                        );
                        (idx, symbol, result)
                    }
                    .instrument(span)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut stats = CollectionStats::new(total);
        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (_, symbol, result) in outcomes {
            match result {
                Ok(record) => {
                    stats.record_success(&record);
                    records.push(record);
                }
                Err(failure) => {
                    stats.record_failure(&failure);
                    failures.push(SymbolFailure { symbol, failure });
                }
            }
        }

        let dataset = ScreeningDataset::from_records(records);
        stats.elapsed = start.elapsed();
        stats.log_summary("스크리닝 배치");

        let report = BatchReport {
            dataset,
            failures,
            stats,
            cache: self.cache.stats(),
            completed_at: self.clock.now(),
        };

        if report.status() == BatchStatus::NoData && total > 0 {
            warn!(total, "데이터를 가져온 심볼이 없습니다");
        }

        report
    }

    /// 캐시를 비우고 즉시 실행 (외부 "지금 새로고침" 신호).
    pub async fn refresh_now<S: AsRef<str>>(&self, watchlist: &[S]) -> BatchReport {
        info!("캐시 전체 무효화 후 재실행");
        self.cache.invalidate_all().await;
        self.run(watchlist).await
    }
}

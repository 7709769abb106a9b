//! 복합 Provider (failover).
//!
//! 등록 순서대로 Provider를 시도하여 처음 성공한 응답을 사용합니다.
//! 모두 실패하면 마지막 에러를 반환합니다.
//!
//! 개요(overview)만은 예외로, 성공한 모든 Provider의 응답을 병합하여
//! 앞선 Provider가 제공하지 않은 필드를 뒤의 Provider로 채웁니다.
//!
//! Provider별 타임아웃을 지정하면 응답이 없는 Provider는 `Timeout`으로 처리되고
//! 다음 Provider로 넘어갑니다.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use radar_core::{Overview, ProviderError, ProviderResult, Quote, RawSeries};
use rust_decimal::Decimal;
use tracing::debug;

use super::MarketDataProvider;

/// 복합 Provider.
pub struct CompositeProvider {
    providers: Vec<Box<dyn MarketDataProvider>>,
    per_provider_timeout: Option<Duration>,
}

impl CompositeProvider {
    /// Provider 목록으로 생성 (앞쪽이 우선).
    pub fn new(providers: Vec<Box<dyn MarketDataProvider>>) -> Self {
        Self {
            providers,
            per_provider_timeout: None,
        }
    }

    /// Provider 하나당 응답 대기 한도.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_provider_timeout = Some(timeout);
        self
    }

    /// Provider 추가 (가장 낮은 우선순위).
    pub fn add_provider(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// 등록된 Provider 수.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn no_provider(symbol: &str) -> ProviderError {
        ProviderError::Unavailable(format!("{}: 등록된 Provider가 없습니다", symbol))
    }

    /// Provider 하나에 대한 호출 (타임아웃 적용).
    async fn attempt<T>(
        &self,
        provider: &dyn MarketDataProvider,
        piece: &str,
        symbol: &str,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let Some(limit) = self.per_provider_timeout else {
            return call.await;
        };

        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(ProviderError::Timeout(format!(
                "{} {} ({}): {:.1}초 내에 응답 없음",
                piece,
                symbol,
                provider.name(),
                limit.as_secs_f64()
            )))
        })
    }

    /// 처음 성공한 Provider의 결과 반환.
    async fn first_success<'a, T, F, Fut>(
        &'a self,
        piece: &'static str,
        symbol: &str,
        call: F,
    ) -> ProviderResult<T>
    where
        F: Fn(&'a dyn MarketDataProvider) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut last_error = Self::no_provider(symbol);

        for provider in &self.providers {
            match self
                .attempt(provider.as_ref(), piece, symbol, call(provider.as_ref()))
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(
                        provider = provider.name(),
                        piece,
                        symbol,
                        error = %e,
                        "Provider 실패, 다음 Provider 시도"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl MarketDataProvider for CompositeProvider {
    fn name(&self) -> &str {
        "composite"
    }

    fn upstream_count(&self) -> usize {
        self.providers
            .iter()
            .map(|p| p.upstream_count())
            .sum::<usize>()
            .max(1)
    }

    async fn fetch_daily_series(&self, symbol: &str) -> ProviderResult<RawSeries> {
        self.first_success("series", symbol, |p| p.fetch_daily_series(symbol))
            .await
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        self.first_success("quote", symbol, |p| p.fetch_quote(symbol))
            .await
    }

    async fn fetch_overview(&self, symbol: &str) -> ProviderResult<Overview> {
        let mut merged: Option<Overview> = None;
        let mut last_error = Self::no_provider(symbol);

        for provider in &self.providers {
            match self
                .attempt(provider.as_ref(), "overview", symbol, provider.fetch_overview(symbol))
                .await
            {
                Ok(overview) => {
                    merged = Some(match merged {
                        Some(existing) => existing.or(overview),
                        None => overview,
                    });
                }
                Err(e) => {
                    debug!(
                        provider = provider.name(),
                        symbol,
                        error = %e,
                        "개요 조회 실패"
                    );
                    last_error = e;
                }
            }
        }

        merged.ok_or(last_error)
    }

    async fn fetch_news_count(&self, symbol: &str) -> ProviderResult<u32> {
        self.first_success("news", symbol, |p| p.fetch_news_count(symbol))
            .await
    }

    async fn fetch_rsi(&self, symbol: &str, period: usize) -> ProviderResult<Decimal> {
        self.first_success("rsi", symbol, |p| p.fetch_rsi(symbol, period))
            .await
    }
}

//! 스크리닝 레코드 캐시.
//!
//! 심볼별로 최근 해석 결과를 TTL 동안 보관합니다.
//!
//! # 동시성
//!
//! 심볼마다 비동기 락(slot)을 두어 같은 심볼의 해석은 한 번에 하나만 진행됩니다.
//! 진행 중인 해석 뒤에서 기다리던 호출은:
//! - 해석이 성공하면 그 레코드를 받고,
//! - 해석이 실패하면 다시 조회하지 않고 같은 실패를 받습니다.
//!
//! 실패는 캐시 항목으로 저장되지 않으므로, 대기 중이 아니었던 이후 호출은 새로 해석합니다.
//! 만료된 항목의 재해석이 실패하면 만료 항목은 제거됩니다.
//!
//! # 무효화
//!
//! 무효화는 슬롯을 지우지 않고 슬롯의 세대(generation)만 올립니다.
//! 이전 세대에 저장된 항목과 실패는 버려지고, 무효화 시점에 진행 중이던 해석의 결과도
//! 저장되지 않습니다. 슬롯 락은 그대로 남으므로 무효화 뒤에도 심볼당 해석은 하나씩만 진행됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use radar_core::{Clock, ResolveFailure, ScreeningRecord};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// 캐시 항목.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// 캐시된 레코드
    pub record: ScreeningRecord,
    /// 저장 시각 (캐시 시계 기준)
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.stored_at < ttl
    }
}

/// 캐시 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// 신선한 항목으로 응답한 횟수
    pub hits: u64,
    /// 해석을 실행한 횟수
    pub misses: u64,
    /// 진행 중이던 해석의 결과(성공/실패)를 공유받은 횟수
    pub coalesced: u64,
}

impl CacheStats {
    /// 해석 없이 응답한 비율 (0.0 ~ 1.0).
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    entry: Option<CacheEntry>,
    last_failure: Option<ResolveFailure>,
    /// `entry`/`last_failure`를 만든 해석이 시작될 때의 세대
    generation: u64,
}

/// 심볼 하나의 캐시 슬롯.
#[derive(Debug, Default)]
struct Slot {
    /// 해석이 끝날 때마다 증가 (락을 쥔 상태에서만 변경)
    settled: AtomicU64,
    /// 무효화될 때마다 증가 (락 없이 변경)
    generation: AtomicU64,
    state: Mutex<SlotState>,
}

impl Slot {
    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// 현재 세대의 항목.
    fn current_entry<'s>(&self, state: &'s SlotState) -> Option<&'s CacheEntry> {
        if state.generation == self.generation.load(Ordering::Acquire) {
            state.entry.as_ref()
        } else {
            None
        }
    }
}

/// 레코드 캐시.
#[derive(Debug)]
pub struct RecordCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl RecordCache {
    /// TTL과 시계로 캐시 생성.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slots: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// 캐시 TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get_or_create_slot(&self, symbol: &str) -> Arc<Slot> {
        let slots = self.slots.read().await;
        if let Some(slot) = slots.get(symbol) {
            return slot.clone();
        }
        drop(slots);

        let mut slots = self.slots.write().await;
        slots
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone()
    }

    /// 신선한 항목이 있으면 반환하고, 없으면 `resolve`를 실행해 저장.
    ///
    /// 같은 심볼에 대한 동시 호출 중 `resolve`는 최대 하나만 실행됩니다.
    pub async fn get_or_resolve<F, Fut>(
        &self,
        symbol: &str,
        resolve: F,
    ) -> Result<ScreeningRecord, ResolveFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ScreeningRecord, ResolveFailure>>,
    {
        let slot = self.get_or_create_slot(symbol).await;
        let observed = slot.settled.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;
        let waited = slot.settled.load(Ordering::Acquire) != observed;

        let generation = slot.generation.load(Ordering::Acquire);
        if state.generation != generation {
            debug!(symbol, "무효화된 항목 폐기");
            state.entry = None;
            state.last_failure = None;
            state.generation = generation;
        }

        let now = self.clock.now();
        if let Some(entry) = state.entry.as_ref().filter(|e| e.is_fresh(now, self.ttl)) {
            if waited {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "진행 중이던 해석 결과 공유");
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "캐시 적중");
            }
            return Ok(entry.record.clone());
        }

        if waited {
            if let Some(failure) = &state.last_failure {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, reason = %failure.reason(), "진행 중이던 해석 실패 공유");
                return Err(failure.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(symbol, stale = state.entry.is_some(), "캐시 미스, 해석 시작");

        let result = resolve().await;
        // 해석 중에 무효화되었다면 다음 호출이 폐기합니다.
        state.generation = generation;
        match &result {
            Ok(record) => {
                state.entry = Some(CacheEntry {
                    record: record.clone(),
                    stored_at: self.clock.now(),
                });
                state.last_failure = None;
            }
            Err(failure) => {
                state.entry = None;
                state.last_failure = Some(failure.clone());
            }
        }
        slot.settled.fetch_add(1, Ordering::Release);

        result
    }

    /// 신선한 항목 조회 (해석하지 않음).
    ///
    /// 해석이 진행 중인 심볼은 `None`.
    pub async fn peek(&self, symbol: &str) -> Option<ScreeningRecord> {
        let slot = self.slots.read().await.get(symbol).cloned()?;
        let state = slot.state.try_lock().ok()?;
        let now = self.clock.now();

        slot.current_entry(&state)
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.record.clone())
    }

    /// 심볼 하나의 항목 무효화.
    pub async fn invalidate(&self, symbol: &str) {
        if let Some(slot) = self.slots.read().await.get(symbol) {
            slot.invalidate();
            debug!(symbol, "캐시 항목 무효화");
        }
    }

    /// 모든 항목 무효화.
    pub async fn invalidate_all(&self) {
        let slots = self.slots.read().await;
        for slot in slots.values() {
            slot.invalidate();
        }
        debug!(count = slots.len(), "캐시 전체 무효화");
    }

    /// 항목을 보유한 심볼 수 (만료 여부 무관, 해석 중인 심볼 제외).
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| {
                slot.state
                    .try_lock()
                    .map(|state| slot.current_entry(&state).is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use radar_core::{ManualClock, PriceSource, ProviderError};
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap()
    }

    fn record(symbol: &str) -> ScreeningRecord {
        ScreeningRecord {
            symbol: symbol.to_string(),
            price: dec!(11),
            change_pct: Some(dec!(10)),
            rel_volume: None,
            rel_volume_source: None,
            volume: 2_000,
            avg_volume: None,
            market_cap_m: None,
            beta: None,
            pct_from_high: None,
            rsi_14: None,
            sector: None,
            float_m: None,
            short_pct: None,
            news_count: 0,
            price_source: PriceSource::LastClose,
            as_of: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            fetched_at: start(),
        }
    }

    fn cache(clock: &ManualClock) -> RecordCache {
        RecordCache::new(Duration::minutes(5), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_resolve("MP", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(record("MP"))
                })
                .await;
            assert_eq!(result.unwrap().symbol, "MP");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                coalesced: 0
            }
        );
    }

    #[tokio::test]
    async fn test_expired_entry_refreshed() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);
        let resolve = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(record("MP"))
        };

        cache.get_or_resolve("MP", resolve).await.unwrap();
        clock.advance(Duration::minutes(4));
        cache.get_or_resolve("MP", resolve).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::minutes(1));
        assert!(cache.peek("MP").await.is_none());
        cache.get_or_resolve("MP", resolve).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_resolve("TMC", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Timeout("series".into()).into())
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_stale_entry_evicted_on_failed_refresh() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        cache
            .get_or_resolve("MP", || async { Ok(record("MP")) })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);

        clock.advance(Duration::minutes(10));
        let result = cache
            .get_or_resolve("MP", || async {
                Err(ProviderError::Unavailable("down".into()).into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.len().await, 0);
        assert!(cache.peek("MP").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_resolution() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);
        let resolve = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Ok(record("MP"))
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_resolve("MP", resolve),
            cache.get_or_resolve("MP", resolve),
            cache.get_or_resolve("MP", resolve),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().coalesced, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_receive_in_flight_failure() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);
        let resolve = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Err(ProviderError::RateLimited("quota".into()).into())
        };

        let (a, b) = tokio::join!(
            cache.get_or_resolve("MP", resolve),
            cache.get_or_resolve("MP", resolve),
        );

        assert_eq!(a.unwrap_err(), b.unwrap_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);

        for symbol in ["MP", "TMC", "UUUU"] {
            cache
                .get_or_resolve(symbol, || async { Ok(record(symbol)) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 3);

        cache.invalidate("MP").await;
        assert!(cache.peek("MP").await.is_none());
        assert!(cache.peek("TMC").await.is_some());

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_resolution_keeps_single_flight() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let resolve = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(record("MP"))
        };

        let (first, second) = tokio::join!(cache.get_or_resolve("MP", resolve), async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cache.invalidate_all().await;
            cache.get_or_resolve("MP", resolve).await
        });

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        // 무효화 이전에 시작한 해석 결과는 재사용하지 않음
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.peek("MP").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_in_flight_result_not_served() {
        let clock = ManualClock::new(start());
        let cache = cache(&clock);
        let calls = AtomicUsize::new(0);

        let ((), first) = tokio::join!(
            async {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                cache.invalidate("MP").await;
            },
            cache.get_or_resolve("MP", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                Ok(record("MP"))
            })
        );

        assert!(first.is_ok());
        assert!(cache.peek("MP").await.is_none());
        assert_eq!(cache.len().await, 0);

        cache
            .get_or_resolve("MP", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(record("MP"))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            coalesced: 1,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}

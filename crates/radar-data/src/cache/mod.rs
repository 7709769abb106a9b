//! 캐싱 레이어.
//!
//! - Record 캐시: 심볼별 스크리닝 레코드를 TTL 동안 보관하고 동시 해석을 병합

pub mod record_cache;

pub use record_cache::{CacheEntry, CacheStats, RecordCache};

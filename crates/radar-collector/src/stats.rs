//! 배치 실행 통계.

use std::collections::BTreeMap;
use std::time::Duration;

use radar_core::{ResolveFailure, ScreeningRecord};
use serde::{Deserialize, Serialize};

/// 배치 한 번의 집계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 정규화된 워치리스트 크기
    pub total: usize,
    pub success: usize,
    /// hard failure 수
    pub errors: usize,
    /// 평균 거래량이 없어 당일 거래량으로 상대 거래량을 낸 레코드 수
    pub rel_volume_fallbacks: usize,
    /// 실패 사유별 심볼 수 (예: `Timeout` → 2)
    pub failures_by_reason: BTreeMap<String, usize>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, record: &ScreeningRecord) {
        self.success += 1;
        if record.rel_volume_is_fallback() {
            self.rel_volume_fallbacks += 1;
        }
    }

    pub fn record_failure(&mut self, failure: &ResolveFailure) {
        self.errors += 1;
        *self.failures_by_reason.entry(failure.reason()).or_default() += 1;
    }

    /// 성공률 (%).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.success as f64 * 100.0 / self.total as f64
    }

    /// `Timeout=2, NotFound=1` 형태의 실패 요약.
    pub fn failure_breakdown(&self) -> String {
        self.failures_by_reason
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 요약 로그 (info).
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            failures = %self.failure_breakdown(),
            rel_volume_fallbacks = self.rel_volume_fallbacks,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "배치 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::{ComputationError, ProviderError};

    #[test]
    fn test_failures_grouped_by_reason() {
        let mut stats = CollectionStats::new(4);
        stats.record_failure(&ProviderError::Timeout("a".into()).into());
        stats.record_failure(&ProviderError::Timeout("b".into()).into());
        stats.record_failure(
            &ComputationError::InsufficientData {
                required: 2,
                provided: 1,
            }
            .into(),
        );

        assert_eq!(stats.errors, 3);
        assert_eq!(stats.failure_breakdown(), "InsufficientData=1, Timeout=2");
        assert!((stats.success_rate() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate() {
        let stats = CollectionStats {
            total: 4,
            success: 3,
            ..CollectionStats::new(4)
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(CollectionStats::new(0).success_rate(), 0.0);
    }
}

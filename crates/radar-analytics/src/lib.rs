//! 스크리닝 지표 계산 엔진.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 등락률, 52주 최고가 대비 비율
//! - 평균 거래량 선택과 상대 거래량
//! - RSI(14)
//! - 시가총액/유통주식 백만 단위 정규화
//!
//! 모든 함수는 순수 함수이며 I/O를 수행하지 않습니다.

pub mod indicators;

pub use indicators::{
    IndicatorEngine, IndicatorInput, IndicatorSnapshot, PriceChange, RelativeVolume,
    AVG_VOLUME_WINDOW, RSI_PERIOD,
};

//! 스크리닝 도메인 모델.

pub mod fundamentals;
pub mod record;
pub mod series;

pub use fundamentals::{Overview, Quote};
pub use record::{
    compare_by_change_desc, AverageVolumeSource, PriceSource, ScreeningDataset, ScreeningRecord,
};
pub use series::{DailyBar, RawSeries};

//! # Radar Core
//!
//! 스크리닝 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! - 일봉 시계열, 시세, 펀더멘털 개요
//! - 스크리닝 레코드 및 데이터셋
//! - Provider/계산 에러 분류
//! - 주입 가능한 시계
//! - 로깅 인프라

pub mod clock;
pub mod domain;
pub mod error;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::*;
pub use error::*;
pub use logging::*;

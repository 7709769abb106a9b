//! 단위 정규화.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const MILLION: Decimal = dec!(1_000_000);

/// 원값을 백만 단위로 변환. 누락 값은 누락으로 유지합니다.
pub fn to_millions(raw: Option<Decimal>) -> Option<Decimal> {
    raw.and_then(|v| v.checked_div(MILLION))
}

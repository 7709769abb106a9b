//! 모멘텀 지표 (Momentum Indicators).
//!
//! ## RSI (Relative Strength Index)
//!
//! - 상승폭 = 양의 종가 변화, 하락폭 = 음의 종가 변화의 절댓값
//! - 최근 `period`개 변화의 단순 평균으로 평균 상승폭/하락폭 계산
//! - RS = 평균 상승폭 / 평균 하락폭
//! - RSI = 100 - 100 / (1 + RS)
//!
//! 평균 하락폭이 0이면 RSI는 50(중립)으로 정의합니다.

use radar_core::ComputationError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 기본 RSI 기간.
pub const RSI_PERIOD: usize = 14;

const HUNDRED: Decimal = dec!(100);
const NEUTRAL: Decimal = dec!(50);

/// 종가별 RSI 계산.
///
/// 반환 벡터의 길이는 `closes`와 같고, 앞의 `period`개는 `None`입니다.
/// 종가가 `period + 1`개 미만이면 `InsufficientData`.
pub fn rsi_series(
    closes: &[Decimal],
    period: usize,
) -> Result<Vec<Option<Decimal>>, ComputationError> {
    if period == 0 {
        return Err(ComputationError::degenerate("RSI 기간은 0보다 커야 합니다"));
    }

    if closes.len() < period + 1 {
        return Err(ComputationError::InsufficientData {
            required: period + 1,
            provided: closes.len(),
        });
    }

    let (gains, losses): (Vec<Decimal>, Vec<Decimal>) = closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            if delta > Decimal::ZERO {
                (delta, Decimal::ZERO)
            } else {
                (Decimal::ZERO, delta.abs())
            }
        })
        .unzip();

    let divisor = Decimal::from(period);
    let mut result = vec![None; period];

    // 변화 인덱스 k는 종가 k+1에 대응
    for end in period..=gains.len() {
        let avg_gain = gains[end - period..end].iter().sum::<Decimal>() / divisor;
        let avg_loss = losses[end - period..end].iter().sum::<Decimal>() / divisor;
        result.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }

    Ok(result)
}

/// 최신 종가 기준 RSI.
pub fn rsi(closes: &[Decimal], period: usize) -> Result<Decimal, ComputationError> {
    rsi_series(closes, period)?
        .last()
        .copied()
        .flatten()
        .ok_or(ComputationError::InsufficientData {
            required: period + 1,
            provided: closes.len(),
        })
}

fn rsi_from_averages(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return NEUTRAL;
    }

    let rs = avg_gain / avg_loss;
    HUNDRED - HUNDRED / (Decimal::ONE + rs)
}

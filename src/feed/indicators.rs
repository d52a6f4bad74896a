//! Indicator math over exchange bars
//!
//! All functions return `None` when there is not enough data, which the
//! regime classifier treats as a missing field.

use super::{Bar, Zones};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Minimum 1m bars for a 15m change
pub const MIN_BARS_15M_CHANGE: usize = 20;
/// ATR period on 15m bars
pub const ATR_PERIOD: usize = 14;
/// Zones never look back over fewer bars than this
pub const MIN_ZONE_LOOKBACK: usize = 60;

/// 15 minute percentage change from 1m bars: last close vs the close 15 bars earlier
pub fn pct_change_15m(bars: &[Bar]) -> Option<Decimal> {
    if bars.len() < MIN_BARS_15M_CHANGE {
        return None;
    }
    let now = bars[bars.len() - 1].close;
    let then = bars[bars.len() - 16].close;
    if now <= Decimal::ZERO || then <= Decimal::ZERO {
        return None;
    }
    Some((now / then - Decimal::ONE) * dec!(100))
}

/// Average true range over the last `period` bars
pub fn atr(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 2 {
        return None;
    }
    let ranges: Vec<Decimal> = bars
        .windows(2)
        .map(|pair| {
            let prev_close = pair[0].close;
            let bar = pair[1];
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect();
    let recent = &ranges[ranges.len() - period..];
    let sum: Decimal = recent.iter().sum();
    Some(sum / Decimal::from(recent.len()))
}

/// Upper and lower zones from the recent extremes of 1m bars.
///
/// The zone thickness is a quarter ATR, floored at 0.07% of the last close.
pub fn compute_zones(bars: &[Bar], atr: Option<Decimal>, lookback: usize) -> Option<Zones> {
    if bars.is_empty() {
        return None;
    }
    let n = bars.len().min(lookback.max(MIN_ZONE_LOOKBACK));
    let sample = &bars[bars.len() - n..];

    let mid = sample
        .iter()
        .rev()
        .map(|b| b.close)
        .find(|c| *c > Decimal::ZERO)?;
    let high = sample.iter().map(|b| b.high).max()?;
    let low = sample.iter().map(|b| b.low).min()?;

    let atr_pad = atr
        .filter(|a| *a > Decimal::ZERO)
        .map(|a| a * dec!(0.25))
        .unwrap_or(Decimal::ZERO);
    let pad = atr_pad.max(mid * dec!(0.0007));

    let upper_lo = high - pad;
    let lower_hi = low + pad;
    let width = (upper_lo - lower_hi).max(Decimal::ZERO);

    Some(Zones {
        upper_lo,
        upper_hi: high,
        lower_lo: low,
        lower_hi,
        width_pct: width / mid * dec!(100),
    })
}

/// Open interest change between the oldest and newest sample
pub fn oi_delta(points: &[(DateTime<Utc>, Decimal)]) -> Option<Decimal> {
    if points.len() < 2 {
        return None;
    }
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(ts, _)| *ts);
    let first = sorted.first()?.1;
    let last = sorted.last()?.1;
    Some(last - first)
}

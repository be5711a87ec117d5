// Technical indicators module
// Implements RSI and SMA over the rolling price series

pub mod moving_average;
pub mod rsi;

pub use moving_average::calculate_sma;
pub use rsi::calculate_rsi;

use crate::config::RiskPolicy;
use crate::execution::PriceSeries;
use crate::models::IndicatorSnapshot;

/// Reported while fewer than `rsi_period + 1` prices exist
pub const RSI_UNREADY: f64 = 50.0;
/// Reported while fewer than `period` prices exist
pub const MA_UNREADY: f64 = 0.0;

/// Computes the indicator set the strategy trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorEngine {
    rsi_period: usize,
    ma_short_period: usize,
    ma_long_period: usize,
}

impl IndicatorEngine {
    pub fn new(rsi_period: usize, ma_short_period: usize, ma_long_period: usize) -> Self {
        Self {
            rsi_period,
            ma_short_period,
            ma_long_period,
        }
    }

    pub fn from_policy(policy: &RiskPolicy) -> Self {
        Self::new(
            policy.rsi_period,
            policy.ma_short_period,
            policy.ma_long_period,
        )
    }

    /// RSI of the series, or `RSI_UNREADY` without enough history
    pub fn rsi(&self, series: &PriceSeries) -> f64 {
        calculate_rsi(series.prices(), self.rsi_period).unwrap_or(RSI_UNREADY)
    }

    /// SMA of the series, or `MA_UNREADY` without enough history
    pub fn ma(&self, series: &PriceSeries, period: usize) -> f64 {
        calculate_sma(series.prices(), period).unwrap_or(MA_UNREADY)
    }

    pub fn compute(&self, series: &PriceSeries) -> IndicatorSnapshot {
        let snapshot = IndicatorSnapshot {
            rsi: self.rsi(series),
            ma_short: self.ma(series, self.ma_short_period),
            ma_long: self.ma(series, self.ma_long_period),
        };

        tracing::debug!(
            samples = series.len(),
            rsi = snapshot.rsi,
            ma_short = snapshot.ma_short,
            ma_long = snapshot.ma_long,
            "Indicators computed"
        );

        snapshot
    }

    /// True once every indicator has more history than it strictly needs
    pub fn has_enough_data(&self, series: &PriceSeries) -> bool {
        series.len() > self.ma_long_period && series.len() > self.rsi_period + 1
    }
}

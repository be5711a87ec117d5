use crate::config::RiskPolicy;
use crate::indicators::{MA_UNREADY, RSI_UNREADY};
use crate::models::{IndicatorSnapshot, Position, Signal, TradeAction};

/// Outcome of applying an executed trade to the position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Opened { entry_price: f64 },
    Closed { entry_price: f64, profit_loss_percent: f64 },
    /// The trade did not match the current state; nothing changed
    Ignored,
}

/// Single-position state machine: Flat or Long(entry)
///
/// Only emits signals. Orders are executed by the engine, which reports
/// fills back through `apply`.
#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    position: Position,
    policy: RiskPolicy,
}

impl PositionStateMachine {
    pub fn new(initial: Position, policy: RiskPolicy) -> Self {
        Self {
            position: initial,
            policy,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_long(&self) -> bool {
        self.position.is_long()
    }

    /// Operator override of the current position
    pub fn reset(&mut self, position: Position) {
        tracing::info!(?position, "Position set manually");
        self.position = position;
    }

    /// Lowest exit price that still covers both taker fees plus the margin
    pub fn min_profitable_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + 2.0 * self.policy.taker_fee + self.policy.min_profit_margin)
    }

    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.policy.stop_loss_fraction)
    }

    /// Decide what to do at `price`
    ///
    /// # Arguments
    /// * `enough_data` - whether the price series is past its warm-up
    pub fn evaluate(&self, price: f64, indicators: &IndicatorSnapshot, enough_data: bool) -> Signal {
        if !enough_data {
            return Signal::None;
        }

        // A genuine RSI of exactly 50.0 is indistinguishable from "unready"
        if indicators.rsi == RSI_UNREADY
            || indicators.ma_short == MA_UNREADY
            || indicators.ma_long == MA_UNREADY
        {
            return Signal::None;
        }

        match self.position {
            Position::Flat => self.evaluate_entry(indicators),
            Position::Long { entry_price } => self.evaluate_exit(price, entry_price, indicators),
        }
    }

    fn evaluate_entry(&self, indicators: &IndicatorSnapshot) -> Signal {
        if indicators.rsi < self.policy.rsi_oversold && indicators.ma_short > indicators.ma_long {
            tracing::info!(
                rsi = indicators.rsi,
                ma_short = indicators.ma_short,
                ma_long = indicators.ma_long,
                "✅ Buy signal"
            );
            return Signal::Buy;
        }

        Signal::None
    }

    fn evaluate_exit(&self, price: f64, entry_price: f64, indicators: &IndicatorSnapshot) -> Signal {
        let profit_percent = profit_percent(entry_price, price);

        // Stop-loss pre-empts every other rule, including the fee guard
        if price < self.stop_price(entry_price) {
            tracing::warn!(
                price,
                entry_price,
                loss_percent = profit_percent,
                "⚠️ Stop loss hit"
            );
            return Signal::Sell;
        }

        if price < self.min_profitable_price(entry_price) {
            return Signal::None;
        }

        let technical_exit = indicators.rsi > self.policy.rsi_overbought
            || (indicators.ma_short < indicators.ma_long && indicators.rsi > self.policy.rsi_neutral);

        let profit_ok = !self.policy.require_min_profit_on_technical_sell
            || profit_percent >= self.policy.sell_profit_threshold_percent;

        if technical_exit && profit_ok {
            tracing::info!(
                rsi = indicators.rsi,
                ma_short = indicators.ma_short,
                ma_long = indicators.ma_long,
                profit_percent,
                "✅ Sell signal"
            );
            return Signal::Sell;
        }

        Signal::None
    }

    /// Record an executed trade
    pub fn apply(&mut self, action: TradeAction, price: f64) -> Transition {
        match (action, self.position) {
            (TradeAction::Buy, Position::Flat) => {
                self.position = Position::Long { entry_price: price };
                Transition::Opened { entry_price: price }
            }
            (TradeAction::Sell, Position::Long { entry_price }) => {
                self.position = Position::Flat;
                Transition::Closed {
                    entry_price,
                    profit_loss_percent: profit_percent(entry_price, price),
                }
            }
            (action, position) => {
                tracing::warn!(?action, ?position, "Trade does not match position state, ignoring");
                Transition::Ignored
            }
        }
    }
}

/// Percentage move from `entry_price` to `price`
pub fn profit_percent(entry_price: f64, price: f64) -> f64 {
    (price - entry_price) / entry_price * 100.0
}

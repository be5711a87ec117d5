use crate::config::RiskPolicy;
use crate::models::Signal;

/// Smallest tradable increment of the base asset (5 decimal places)
const QUANTITY_STEP: f64 = 100_000.0;

/// Turns capital and the risk policy into an order quantity
#[derive(Debug, Clone)]
pub struct RiskSizer {
    risk_fraction: f64,
    min_order_value: f64,
}

impl RiskSizer {
    pub fn new(risk_fraction: f64, min_order_value: f64) -> Self {
        Self {
            risk_fraction,
            min_order_value,
        }
    }

    pub fn from_policy(policy: &RiskPolicy) -> Self {
        Self::new(policy.risk_fraction, policy.min_order_value)
    }

    /// Order quantity for `signal` at `price`, or 0.0 when the order must not be sent
    ///
    /// # Arguments
    /// * `funds` - Capital the risk fraction applies to
    /// * `available_quote` - Free quote balance, only binding when entering
    /// * `in_position` - Whether a position is currently held
    pub fn size(
        &self,
        signal: Signal,
        price: f64,
        funds: f64,
        available_quote: f64,
        in_position: bool,
    ) -> f64 {
        if signal == Signal::None || price <= 0.0 {
            return 0.0;
        }

        let mut trade_amount = (funds * self.risk_fraction).max(self.min_order_value);

        if !in_position && available_quote < trade_amount {
            trade_amount = available_quote;
        }

        if trade_amount < self.min_order_value {
            tracing::warn!(
                trade_amount,
                min_order_value = self.min_order_value,
                "⚠️ Insufficient balance for minimum order value"
            );
            return 0.0;
        }

        let quantity = (trade_amount / price * QUANTITY_STEP).floor() / QUANTITY_STEP;

        if quantity * price < self.min_order_value {
            tracing::warn!(
                order_value = quantity * price,
                min_order_value = self.min_order_value,
                "⚠️ Order value below exchange minimum after rounding"
            );
            return 0.0;
        }

        quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> RiskSizer {
        RiskSizer::from_policy(&RiskPolicy::default())
    }

    #[test]
    fn test_quantity_truncated_to_five_decimals() {
        let quantity = sizer().size(Signal::Buy, 50_000.0, 1000.0, 1000.0, false);
        assert!((quantity - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_when_rounding_drops_below_minimum() {
        let quantity = sizer().size(Signal::Buy, 5_000_000.0, 1000.0, 1000.0, false);
        assert_eq!(quantity, 0.0);
    }

    #[test]
    fn test_small_funds_lifted_to_minimum_order() {
        // 2% of 100 is 2, lifted to 11
        let quantity = sizer().size(Signal::Buy, 10.0, 100.0, 1000.0, false);
        assert!((quantity - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_to_available_quote_when_entering() {
        // Wants 20, only 15 available
        let quantity = sizer().size(Signal::Buy, 10.0, 1000.0, 15.0, false);
        assert!((quantity - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_quote_rejects() {
        let quantity = sizer().size(Signal::Buy, 10.0, 1000.0, 5.0, false);
        assert_eq!(quantity, 0.0);
    }

    #[test]
    fn test_quote_balance_ignored_when_exiting() {
        let quantity = sizer().size(Signal::Sell, 10.0, 1000.0, 0.0, true);
        assert!((quantity - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_signal_sizes_nothing() {
        assert_eq!(sizer().size(Signal::None, 10.0, 1000.0, 1000.0, false), 0.0);
    }
}

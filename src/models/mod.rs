use serde::{Deserialize, Serialize};

/// Trading signal emitted by the position state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    None,
    Buy,
    Sell,
}

/// Current holding in the traded instrument
///
/// Exactly one variant holds at any time; the entry price only exists while long.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Position {
    Flat,
    Long { entry_price: f64 },
}

impl Position {
    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            Position::Long { entry_price } => Some(*entry_price),
            Position::Flat => None,
        }
    }
}

/// Indicator values derived from the price series; never persisted
///
/// Unready values carry sentinels: RSI 50.0, moving averages 0.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub ma_short: f64,
    pub ma_long: f64,
}

/// Free balances of the traded pair
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Balances {
    pub base: f64,
    pub quote: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// One executed trade, as persisted to the history file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub timestamp: i64, // Unix seconds
    pub action: TradeAction,
    pub price: f64,
    pub quantity: f64,
    #[serde(rename = "profit_loss", default, skip_serializing_if = "Option::is_none")]
    pub profit_loss_percent: Option<f64>,
    #[serde(rename = "btc_balance")]
    pub base_balance_after: f64,
    #[serde(rename = "usdt_balance")]
    pub quote_balance_after: f64,
}

/// Order side on the exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<TradeAction> for OrderSide {
    fn from(action: TradeAction) -> Self {
        match action {
            TradeAction::Buy => OrderSide::Buy,
            TradeAction::Sell => OrderSide::Sell,
        }
    }
}

/// A past fill on the account, as reported by the exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub is_buy: bool,
    pub price: f64,
}

/// Acknowledgement of a submitted market order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderResult {
    pub order_id: String,
    pub side: OrderSide,
    pub executed_quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sell_record_wire_format() {
        let record = TradeRecord {
            timestamp: 1_700_000_000,
            action: TradeAction::Sell,
            price: 42_500.0,
            quantity: 0.0004,
            profit_loss_percent: Some(1.2),
            base_balance_after: 0.0,
            quote_balance_after: 1017.0,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"], "sell");
        assert_eq!(json["profit_loss"], 1.2);
        assert_eq!(json["btc_balance"], 0.0);
        assert_eq!(json["usdt_balance"], 1017.0);
    }

    #[test]
    fn test_buy_record_omits_profit_loss() {
        let record = TradeRecord {
            timestamp: 1_700_000_000,
            action: TradeAction::Buy,
            price: 42_000.0,
            quantity: 0.0004,
            profit_loss_percent: None,
            base_balance_after: 0.0004,
            quote_balance_after: 983.2,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("profit_loss"));

        let parsed: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_position_accessors() {
        assert!(!Position::Flat.is_long());
        assert_eq!(Position::Flat.entry_price(), None);

        let long = Position::Long { entry_price: 100.0 };
        assert!(long.is_long());
        assert_eq!(long.entry_price(), Some(100.0));
    }
}

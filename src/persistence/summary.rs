use crate::models::{TradeAction, TradeRecord};
use serde::{Deserialize, Serialize};

/// Aggregate statistics over the trade history
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerSummary {
    pub buys: usize,
    pub sells: usize,
    pub winning_sells: usize,
    pub losing_sells: usize,
    pub win_rate: f64,               // Share of sells with positive P&L, 0.0-1.0
    pub cumulative_pnl_percent: f64, // Sum of per-trade P&L percentages
    pub best_trade_percent: Option<f64>,
    pub worst_trade_percent: Option<f64>,
    pub last_action: Option<TradeAction>,
}

impl LedgerSummary {
    pub fn from_records(records: &[TradeRecord]) -> Self {
        let mut summary = LedgerSummary {
            last_action: records.last().map(|r| r.action),
            ..Default::default()
        };

        for record in records {
            match record.action {
                TradeAction::Buy => summary.buys += 1,
                TradeAction::Sell => {
                    summary.sells += 1;

                    // Older histories may lack the figure on a sell
                    let Some(pnl) = record.profit_loss_percent else {
                        continue;
                    };

                    if pnl > 0.0 {
                        summary.winning_sells += 1;
                    } else {
                        summary.losing_sells += 1;
                    }
                    summary.cumulative_pnl_percent += pnl;
                    summary.best_trade_percent =
                        Some(summary.best_trade_percent.map_or(pnl, |best| best.max(pnl)));
                    summary.worst_trade_percent =
                        Some(summary.worst_trade_percent.map_or(pnl, |worst| worst.min(pnl)));
                }
            }
        }

        let closed = summary.winning_sells + summary.losing_sells;
        if closed > 0 {
            summary.win_rate = summary.winning_sells as f64 / closed as f64;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(action: TradeAction, pnl: Option<f64>) -> TradeRecord {
        TradeRecord {
            timestamp: 0,
            action,
            price: 100.0,
            quantity: 0.1,
            profit_loss_percent: pnl,
            base_balance_after: 0.0,
            quote_balance_after: 0.0,
        }
    }

    #[test]
    fn test_empty_history() {
        let summary = LedgerSummary::from_records(&[]);
        assert_eq!(summary, LedgerSummary::default());
    }

    #[test]
    fn test_summary_statistics() {
        let records = vec![
            trade(TradeAction::Buy, None),
            trade(TradeAction::Sell, Some(1.5)),
            trade(TradeAction::Buy, None),
            trade(TradeAction::Sell, Some(-2.0)),
            trade(TradeAction::Buy, None),
            trade(TradeAction::Sell, Some(0.5)),
            trade(TradeAction::Buy, None),
        ];

        let summary = LedgerSummary::from_records(&records);
        assert_eq!(summary.buys, 4);
        assert_eq!(summary.sells, 3);
        assert_eq!(summary.winning_sells, 2);
        assert_eq!(summary.losing_sells, 1);
        assert!((summary.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!(summary.cumulative_pnl_percent.abs() < 1e-12);
        assert_eq!(summary.best_trade_percent, Some(1.5));
        assert_eq!(summary.worst_trade_percent, Some(-2.0));
        assert_eq!(summary.last_action, Some(TradeAction::Buy));
    }
}

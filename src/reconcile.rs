use crate::config::StartupPosition;
use crate::error::Result;
use crate::exchange::{with_timeout, ExchangeClient};
use crate::models::{Position, TradeAction};
use crate::persistence::TradeLedger;
use std::time::Duration;

/// Startup reconciliation settings
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub symbol: String,
    pub recent_trades_limit: usize,
    pub timeout: Duration,
}

/// Align the local position with the exchange before trading starts
///
/// Holding base asset while the ledger does not end in a sell means we are
/// long at the most recent buy fill. Everything else, including any exchange
/// failure or timeout, starts flat.
pub async fn reconcile_position(
    exchange: &dyn ExchangeClient,
    last_action: Option<TradeAction>,
    options: &ReconcileOptions,
) -> Position {
    match with_timeout(options.timeout, "reconciliation", query_position(exchange, last_action, options)).await {
        Ok(position) => position,
        Err(e) => {
            tracing::warn!("Could not load current position ({}), starting flat", e);
            Position::Flat
        }
    }
}

async fn query_position(
    exchange: &dyn ExchangeClient,
    last_action: Option<TradeAction>,
    options: &ReconcileOptions,
) -> Result<Position> {
    let balances = exchange.get_balances().await?;

    if balances.base <= 0.0 || last_action == Some(TradeAction::Sell) {
        tracing::info!(
            base_balance = balances.base,
            ?last_action,
            "No open position detected"
        );
        return Ok(Position::Flat);
    }

    let fills = exchange
        .list_recent_trades(&options.symbol, options.recent_trades_limit)
        .await?;

    // A fill without a usable price cannot anchor the stop-loss or fee guard
    match fills.iter().rev().find(|fill| fill.is_buy && fill.price > 0.0) {
        Some(fill) => {
            tracing::info!(
                base_balance = balances.base,
                entry_price = fill.price,
                "Existing position detected"
            );
            Ok(Position::Long {
                entry_price: fill.price,
            })
        }
        None => {
            tracing::info!(
                base_balance = balances.base,
                "Base balance held but no priced buy fill found, starting flat"
            );
            Ok(Position::Flat)
        }
    }
}

/// Resolve the initial position according to the configured startup mode
pub async fn startup_position(
    mode: StartupPosition,
    exchange: &dyn ExchangeClient,
    ledger: &TradeLedger,
    options: &ReconcileOptions,
) -> Position {
    let position = match mode {
        StartupPosition::Exchange => {
            reconcile_position(exchange, ledger.last_action(), options).await
        }
        StartupPosition::Flat => Position::Flat,
        StartupPosition::LastBuy => match ledger.last_buy_price() {
            Some(entry_price) if entry_price > 0.0 => Position::Long { entry_price },
            _ => {
                tracing::warn!("No priced buy in trade history, starting flat");
                Position::Flat
            }
        },
    };

    tracing::info!(?mode, ?position, "Initial position set");
    position
}

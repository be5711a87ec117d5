use crate::config::AppConfig;
use crate::exchange::{with_timeout, ExchangeClient};
use crate::execution::{PositionStateMachine, PriceSeries, Transition};
use crate::indicators::IndicatorEngine;
use crate::models::{
    Balances, IndicatorSnapshot, OrderSide, Position, Signal, TradeAction, TradeRecord,
};
use crate::persistence::TradeLedger;
use crate::risk::RiskSizer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// What observers (dashboards) see after each tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSnapshot {
    pub price: Option<f64>,
    pub indicators: IndicatorSnapshot,
    pub ready: bool,
    pub samples: usize,
    pub position: Position,
    pub balances: Balances,
}

/// Result of processing one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    NoSignal,
    /// Signal fired but sizing returned zero
    Rejected(Signal),
    /// Order submission failed or timed out; state unchanged
    OrderFailed(Signal),
    Executed(TradeRecord),
}

/// Drives the evaluate, size, execute and record cycle for each price tick
///
/// Owns the price series and position state; nothing else mutates them.
pub struct TradingEngine {
    symbol: String,
    funds: f64,
    network_timeout: Duration,
    warmup: usize,
    series: PriceSeries,
    indicators: IndicatorEngine,
    state: PositionStateMachine,
    sizer: RiskSizer,
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<TradeLedger>,
    balances: Balances,
    snapshot_tx: watch::Sender<EngineSnapshot>,
}

impl TradingEngine {
    pub fn new(
        config: &AppConfig,
        initial: Position,
        exchange: Arc<dyn ExchangeClient>,
        ledger: Arc<TradeLedger>,
    ) -> Self {
        let policy = &config.risk;
        let series = PriceSeries::new(policy.max_series_length);
        let indicators = IndicatorEngine::from_policy(policy);

        let (snapshot_tx, _) = watch::channel(EngineSnapshot {
            price: None,
            indicators: indicators.compute(&series),
            ready: false,
            samples: 0,
            position: initial,
            balances: Balances::default(),
        });

        Self {
            symbol: config.symbol.clone(),
            funds: config.initial_funds,
            network_timeout: config.network_timeout(),
            warmup: policy.warmup_samples(),
            series,
            indicators,
            state: PositionStateMachine::new(initial, policy.clone()),
            sizer: RiskSizer::from_policy(policy),
            exchange,
            ledger,
            balances: Balances::default(),
            snapshot_tx,
        }
    }

    pub fn position(&self) -> Position {
        self.state.position()
    }

    /// Operator override, applied between ticks
    pub fn set_position(&mut self, position: Position) {
        self.state.reset(position);
        self.publish(self.indicators.compute(&self.series));
    }

    /// Receiver that always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn current_snapshot(&self) -> EngineSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn ledger_snapshot(&self) -> Vec<TradeRecord> {
        self.ledger.snapshot()
    }

    /// Query balances for observers; failures keep the last known values
    pub async fn refresh_balances(&mut self) -> Balances {
        match self.fetch_balances().await {
            Ok(balances) => self.balances = balances,
            Err(e) => tracing::warn!("Failed to refresh balances: {}", e),
        }
        self.publish(self.indicators.compute(&self.series));
        self.balances
    }

    async fn fetch_balances(&self) -> crate::Result<Balances> {
        with_timeout(self.network_timeout, "balance query", self.exchange.get_balances()).await
    }

    pub async fn on_tick(&mut self, price: f64) -> TickOutcome {
        self.series.append(price);

        let indicators = self.indicators.compute(&self.series);
        let enough_data = self.indicators.has_enough_data(&self.series);

        if !enough_data {
            tracing::debug!(
                samples = self.series.len(),
                needed = self.warmup + 1,
                "Waiting for enough data for indicators"
            );
        }

        let signal = self.state.evaluate(price, &indicators, enough_data);
        let outcome = match signal {
            Signal::None => TickOutcome::NoSignal,
            Signal::Buy | Signal::Sell => self.execute(signal, price).await,
        };

        self.publish(indicators);
        outcome
    }

    async fn execute(&mut self, signal: Signal, price: f64) -> TickOutcome {
        let action = match signal {
            Signal::Buy => TradeAction::Buy,
            Signal::Sell => TradeAction::Sell,
            Signal::None => return TickOutcome::NoSignal,
        };

        let available_quote = match self.fetch_balances().await {
            Ok(balances) => {
                self.balances = balances;
                balances.quote
            }
            Err(e) => {
                tracing::warn!("Failed to fetch balances before sizing ({}), assuming zero", e);
                0.0
            }
        };

        let quantity = self
            .sizer
            .size(signal, price, self.funds, available_quote, self.state.is_long());

        if quantity == 0.0 {
            tracing::warn!(?signal, price, "Order not sent: insufficient funds for minimum order");
            return TickOutcome::Rejected(signal);
        }

        tracing::info!(?signal, price, quantity, "Executing {:?}...", action);

        let submitted = with_timeout(
            self.network_timeout,
            "order submission",
            self.exchange
                .submit_market_order(&self.symbol, OrderSide::from(action), quantity),
        )
        .await;

        let order = match submitted {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(?signal, "❌ Failed to execute {:?}: {}", action, e);
                return TickOutcome::OrderFailed(signal);
            }
        };

        let profit_loss_percent = match self.state.apply(action, price) {
            Transition::Closed {
                profit_loss_percent,
                ..
            } => Some(profit_loss_percent),
            Transition::Opened { .. } | Transition::Ignored => None,
        };

        let balances = match self.fetch_balances().await {
            Ok(balances) => {
                self.balances = balances;
                balances
            }
            Err(e) => {
                tracing::warn!("Failed to fetch balances after trade ({}), recording zeros", e);
                Balances::default()
            }
        };

        let record = TradeRecord {
            timestamp: Utc::now().timestamp(),
            action,
            price,
            quantity,
            profit_loss_percent,
            base_balance_after: balances.base,
            quote_balance_after: balances.quote,
        };
        self.ledger.append(record.clone());

        match profit_loss_percent {
            Some(pnl) => tracing::info!(
                order_id = %order.order_id,
                price,
                quantity,
                profit_loss_percent = pnl,
                "💰 Sell executed"
            ),
            None => tracing::info!(order_id = %order.order_id, price, quantity, "💰 Buy executed"),
        }
        tracing::debug!(base = balances.base, quote = balances.quote, "Balances after trade");

        TickOutcome::Executed(record)
    }

    fn publish(&self, indicators: IndicatorSnapshot) {
        let snapshot = EngineSnapshot {
            price: self.series.latest(),
            indicators,
            ready: self.indicators.has_enough_data(&self.series),
            samples: self.series.len(),
            position: self.state.position(),
            balances: self.balances,
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Process ticks one at a time until the feed ends or shutdown is requested
    ///
    /// Shutdown is only observed between ticks, so an order already submitted
    /// is always awaited and recorded before the loop exits.
    pub async fn run(&mut self, mut ticks: mpsc::Receiver<f64>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(symbol = %self.symbol, position = ?self.position(), "Trading loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown requested");
                        break;
                    }
                }
                tick = ticks.recv() => match tick {
                    Some(price) => {
                        self.on_tick(price).await;
                    }
                    None => {
                        tracing::info!("Price feed closed");
                        break;
                    }
                },
            }
        }

        tracing::info!(trades = self.ledger.len(), "Trading loop stopped");
    }
}

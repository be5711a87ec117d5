use super::ExchangeClient;
use crate::error::{Result, TraderError};
use crate::models::{Balances, Fill, OrderResult, OrderSide};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct PaperAccount {
    balances: Balances,
    mark_price: f64,
    fills: Vec<Fill>,
    next_order_id: u64,
    failing_orders: usize,
    offline: bool,
    latency: Duration,
}

/// In-memory exchange that fills market orders at the current mark price
///
/// Taker fees are charged in the quote asset on both sides.
pub struct PaperExchange {
    account: Mutex<PaperAccount>,
    taker_fee: f64,
}

impl PaperExchange {
    pub fn new(base: f64, quote: f64, taker_fee: f64) -> Self {
        Self {
            account: Mutex::new(PaperAccount {
                balances: Balances { base, quote },
                mark_price: 0.0,
                fills: Vec::new(),
                next_order_id: 1,
                failing_orders: 0,
                offline: false,
                latency: Duration::ZERO,
            }),
            taker_fee,
        }
    }

    /// Seed the account's fill history, oldest first
    pub fn with_fills(self, fills: Vec<Fill>) -> Self {
        self.account().fills = fills;
        self
    }

    fn account(&self) -> MutexGuard<'_, PaperAccount> {
        self.account.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_mark_price(&self, price: f64) {
        self.account().mark_price = price;
    }

    /// Reject the next `count` orders
    pub fn fail_next_orders(&self, count: usize) {
        self.account().failing_orders = count;
    }

    /// While offline every call fails
    pub fn set_offline(&self, offline: bool) {
        self.account().offline = offline;
    }

    /// Delay applied to every call
    pub fn set_latency(&self, latency: Duration) {
        self.account().latency = latency;
    }

    pub fn balances(&self) -> Balances {
        self.account().balances
    }

    async fn simulate_network(&self) -> Result<()> {
        let (latency, offline) = {
            let account = self.account();
            (account.latency, account.offline)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if offline {
            return Err(TraderError::Exchange("paper exchange offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn get_balances(&self) -> Result<Balances> {
        self.simulate_network().await?;
        Ok(self.account().balances)
    }

    async fn list_recent_trades(&self, _symbol: &str, limit: usize) -> Result<Vec<Fill>> {
        self.simulate_network().await?;

        let account = self.account();
        let skip = account.fills.len().saturating_sub(limit);
        Ok(account.fills[skip..].to_vec())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderResult> {
        self.simulate_network().await?;

        let mut account = self.account();

        if account.failing_orders > 0 {
            account.failing_orders -= 1;
            return Err(TraderError::Exchange("order rejected".to_string()));
        }
        if quantity <= 0.0 {
            return Err(TraderError::Exchange(format!("invalid quantity {}", quantity)));
        }
        if account.mark_price <= 0.0 {
            return Err(TraderError::Exchange(format!("no market price for {}", symbol)));
        }

        let price = account.mark_price;
        let notional = quantity * price;
        let fee = notional * self.taker_fee;

        match side {
            OrderSide::Buy => {
                if account.balances.quote < notional + fee {
                    return Err(TraderError::Exchange(format!(
                        "insufficient quote balance: need {:.2}, have {:.2}",
                        notional + fee,
                        account.balances.quote
                    )));
                }
                account.balances.quote -= notional + fee;
                account.balances.base += quantity;
            }
            OrderSide::Sell => {
                if account.balances.base < quantity {
                    return Err(TraderError::Exchange(format!(
                        "insufficient base balance: need {:.5}, have {:.5}",
                        quantity, account.balances.base
                    )));
                }
                account.balances.base -= quantity;
                account.balances.quote += notional - fee;
            }
        }

        account.fills.push(Fill {
            is_buy: side == OrderSide::Buy,
            price,
        });

        let order_id = format!("paper-{}", account.next_order_id);
        account.next_order_id += 1;

        tracing::debug!(%order_id, ?side, quantity, price, "Paper order filled");

        Ok(OrderResult {
            order_id,
            side,
            executed_quantity: quantity,
        })
    }
}

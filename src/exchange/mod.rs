// External collaborators: exchange account access and the price feed
pub mod feed;
pub mod paper;

pub use feed::{PriceFeed, ReplayFeed, SyntheticFeed};
pub use paper::PaperExchange;

use crate::error::{Result, TraderError};
use crate::models::{Balances, Fill, OrderResult, OrderSide};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Account-level access to the exchange
///
/// Implementations own connectivity, authentication and rate limiting.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Free base and quote balances of the traded pair
    async fn get_balances(&self) -> Result<Balances>;

    /// Recent fills on the account, oldest first
    async fn list_recent_trades(&self, symbol: &str, limit: usize) -> Result<Vec<Fill>>;

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderResult>;
}

/// Run an exchange call with an upper bound on its duration
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TraderError::Timeout { operation, limit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), "noop", async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TraderError::Timeout {
                operation: "slow call",
                ..
            }
        ));
        // Sub-second limits must not round down to zero
        assert_eq!(err.to_string(), "slow call timed out after 10ms");
    }
}

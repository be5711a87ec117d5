use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TICK_BUFFER: usize = 256;

/// Source of live price ticks for one symbol
///
/// Reconnection is the feed's own business; the receiver closes only when
/// the feed is cancelled or exhausted.
pub trait PriceFeed: Send {
    fn subscribe(&mut self, symbol: &str) -> mpsc::Receiver<f64>;

    fn cancel(&mut self);
}

/// Seeded random-walk feed for paper trading
pub struct SyntheticFeed {
    seed: u64,
    start_price: f64,
    volatility: f64, // Max relative move per tick, e.g. 0.002 = ±0.2%
    interval: Duration,
    max_ticks: Option<usize>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticFeed {
    pub fn new(seed: u64, start_price: f64, interval: Duration) -> Self {
        Self {
            seed,
            start_price,
            volatility: 0.002,
            interval,
            max_ticks: None,
            task: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Stop after `ticks` prices instead of running forever
    pub fn with_max_ticks(mut self, ticks: usize) -> Self {
        self.max_ticks = Some(ticks);
        self
    }
}

impl PriceFeed for SyntheticFeed {
    fn subscribe(&mut self, symbol: &str) -> mpsc::Receiver<f64> {
        self.cancel();

        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = self.start_price;
        let volatility = self.volatility;
        let interval = self.interval;
        let max_ticks = self.max_ticks;

        tracing::info!(symbol, seed = self.seed, start_price = price, "Synthetic feed subscribed");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut sent = 0usize;

            loop {
                if max_ticks.is_some_and(|max| sent >= max) {
                    break;
                }
                ticker.tick().await;

                price *= 1.0 + rng.gen_range(-volatility..=volatility);
                if tx.send(price).await.is_err() {
                    break;
                }
                sent += 1;
            }
        }));

        rx
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SyntheticFeed {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Replays a fixed list of prices, then closes
pub struct ReplayFeed {
    prices: Vec<f64>,
    task: Option<JoinHandle<()>>,
}

impl ReplayFeed {
    pub fn new(prices: Vec<f64>) -> Self {
        Self { prices, task: None }
    }
}

impl PriceFeed for ReplayFeed {
    fn subscribe(&mut self, _symbol: &str) -> mpsc::Receiver<f64> {
        self.cancel();

        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let prices = self.prices.clone();

        self.task = Some(tokio::spawn(async move {
            for price in prices {
                if tx.send(price).await.is_err() {
                    break;
                }
            }
        }));

        rx
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReplayFeed {
    fn drop(&mut self) {
        self.cancel();
    }
}

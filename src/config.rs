use crate::error::{Result, TraderError};
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Risk and signal policy for the single-instrument strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskPolicy {
    pub risk_fraction: f64,        // Share of funds committed per trade
    pub min_order_value: f64,      // Exchange minimum notional, in quote units
    pub taker_fee: f64,            // Charged on every market order
    pub min_profit_margin: f64,    // Margin on top of round-trip fees
    pub stop_loss_fraction: f64,   // Forced exit below entry * (1 - fraction)
    pub sell_profit_threshold_percent: f64,
    pub rsi_period: usize,
    pub ma_short_period: usize,
    pub ma_long_period: usize,
    pub max_series_length: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_neutral: f64,
    /// When false, a technical sell only needs the fee-aware price guard
    pub require_min_profit_on_technical_sell: bool,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            risk_fraction: 0.02,
            min_order_value: 11.0,
            taker_fee: 0.001,
            min_profit_margin: 0.001,
            stop_loss_fraction: 0.02,
            sell_profit_threshold_percent: 0.3,
            rsi_period: 14,
            ma_short_period: 9,
            ma_long_period: 21,
            max_series_length: 100,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_neutral: 50.0,
            require_min_profit_on_technical_sell: true,
        }
    }
}

impl RiskPolicy {
    /// Samples the series must exceed before any signal is considered
    pub fn warmup_samples(&self) -> usize {
        self.ma_long_period.max(self.rsi_period + 1)
    }

    pub fn validate(&self) -> Result<()> {
        let fraction = |name: &str, value: f64| -> Result<()> {
            if !(value > 0.0 && value < 1.0) {
                return Err(TraderError::Config(format!(
                    "{} must be in (0, 1), got {}",
                    name, value
                )));
            }
            Ok(())
        };

        fraction("risk_fraction", self.risk_fraction)?;
        fraction("stop_loss_fraction", self.stop_loss_fraction)?;

        if self.min_order_value <= 0.0 {
            return Err(TraderError::Config(format!(
                "min_order_value must be positive, got {}",
                self.min_order_value
            )));
        }
        if self.taker_fee < 0.0 || self.min_profit_margin < 0.0 {
            return Err(TraderError::Config(
                "taker_fee and min_profit_margin cannot be negative".to_string(),
            ));
        }
        if self.sell_profit_threshold_percent < 0.0 {
            return Err(TraderError::Config(
                "sell_profit_threshold_percent cannot be negative".to_string(),
            ));
        }
        if self.rsi_period == 0 || self.ma_short_period == 0 || self.ma_long_period == 0 {
            return Err(TraderError::Config(
                "indicator periods must be non-zero".to_string(),
            ));
        }
        if self.ma_short_period >= self.ma_long_period {
            return Err(TraderError::Config(format!(
                "ma_short_period ({}) must be below ma_long_period ({})",
                self.ma_short_period, self.ma_long_period
            )));
        }
        if !(self.rsi_oversold < self.rsi_neutral && self.rsi_neutral < self.rsi_overbought) {
            return Err(TraderError::Config(
                "RSI thresholds must satisfy oversold < neutral < overbought".to_string(),
            ));
        }
        if self.max_series_length <= self.warmup_samples() {
            return Err(TraderError::Config(format!(
                "max_series_length ({}) must exceed {} samples or no signal can ever fire",
                self.max_series_length,
                self.warmup_samples()
            )));
        }

        Ok(())
    }
}

/// How the position is initialised before the first tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartupPosition {
    /// Reconcile against exchange balances and fills
    #[default]
    Exchange,
    /// Start out of the market regardless of holdings
    Flat,
    /// Assume a position entered at the last ledger buy
    LastBuy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symbol: String,
    pub initial_funds: f64,
    pub testnet: bool,
    pub history_file: PathBuf,
    pub log_filter: String,
    pub network_timeout_secs: u64,
    pub reconcile_timeout_secs: u64,
    pub recent_trades_limit: usize,
    pub startup_position: StartupPosition,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub risk: RiskPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            initial_funds: 1000.0,
            testnet: true,
            history_file: PathBuf::from("history/trade_history.json"),
            log_filter: "spottrader=info".to_string(),
            network_timeout_secs: 10,
            reconcile_timeout_secs: 15,
            recent_trades_limit: 1000,
            startup_position: StartupPosition::Exchange,
            api_key: None,
            api_secret: None,
            risk: RiskPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then an optional file, then `TRADER_*` env vars
    ///
    /// Nested keys use a double underscore, e.g. `TRADER_RISK__STOP_LOSS_FRACTION`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, None)
    }

    /// Same as `load`, reading variables from `env` instead of the process
    /// environment when given
    fn load_from(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("TRADER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(?config.symbol, ?config.history_file, "Configuration loaded");

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(TraderError::Config("symbol cannot be empty".to_string()));
        }
        if self.initial_funds <= 0.0 {
            return Err(TraderError::Config(format!(
                "initial_funds must be positive, got {}",
                self.initial_funds
            )));
        }
        if self.network_timeout_secs == 0 || self.reconcile_timeout_secs == 0 {
            return Err(TraderError::Config("timeouts must be non-zero".to_string()));
        }
        self.risk.validate()
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

// 7.0 config.rs: all strategy settings in one place. pairs, ladders, budget, risk limits.
// 7.1 field names match the yaml files operators already keep, so they stay snake_case as-is.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::types::{Quote, Side};

/// Venue network the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMode {
    #[default]
    OneWay,
    Hedge,
}

/// Complete configuration for one strategy instance. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub connector_name: String,
    /// Quote pairs in venue label form, e.g. "BTC-USDC". Order is significant.
    pub trading_pairs: Vec<String>,
    pub leverage: u32,
    /// Total notional spread evenly over every pair, side and level.
    pub total_amount_quote: Quote,
    pub position_mode: PositionMode,
    /// Tick interval in seconds.
    pub executor_refresh_time: u64,
    /// Loss cooldown in seconds.
    pub cooldown_time: u64,
    pub network: Network,
    pub dry_run: bool,
    /// Per pair notional caps per cycle. Pairs without an entry are uncapped.
    pub per_pair_max_quote: BTreeMap<String, Quote>,

    pub buy_spreads: Vec<Decimal>,
    pub sell_spreads: Vec<Decimal>,
    pub order_levels: usize,
    pub order_refresh_time: u64,

    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Per order notional ceiling.
    pub max_position_size: Quote,
    pub max_drawdown: Decimal,
    pub funding_rate_threshold: Decimal,

    /// Overrides the network default gateway endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            connector_name: "hyperliquid_perpetual".to_string(),
            trading_pairs: vec![
                "BTC-USDC".to_string(),
                "ETH-USDC".to_string(),
                "SOL-USDC".to_string(),
            ],
            leverage: 3,
            total_amount_quote: Quote::new(dec!(10000)),
            position_mode: PositionMode::OneWay,
            executor_refresh_time: 30,
            cooldown_time: 300,
            network: Network::Mainnet,
            dry_run: true,
            per_pair_max_quote: BTreeMap::new(),
            buy_spreads: vec![dec!(0.0001), dec!(0.0002), dec!(0.0005)],
            sell_spreads: vec![dec!(0.0001), dec!(0.0002), dec!(0.0005)],
            order_levels: 3,
            order_refresh_time: 10,
            stop_loss: dec!(0.002),
            take_profit: dec!(0.001),
            max_position_size: Quote::new(dec!(5000)),
            max_drawdown: dec!(0.05),
            funding_rate_threshold: dec!(0.0001),
            base_url: None,
        }
    }
}

impl StrategyConfig {
    // Guarded testnet probe: tiny budget, hard caps, write path previewed only.
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.network = Network::Testnet;
        config.dry_run = false;
        config.leverage = 1;
        config.total_amount_quote = Quote::new(dec!(100));
        config.max_position_size = Quote::new(dec!(25));
        config.per_pair_max_quote = config
            .trading_pairs
            .iter()
            .map(|pair| (pair.clone(), Quote::new(dec!(40))))
            .collect();
        config
    }

    // Mainnet with tighter risk: lower leverage, earlier breaker, longer cooldown.
    pub fn conservative() -> Self {
        let mut config = Self::default();
        config.leverage = 1;
        config.max_drawdown = dec!(0.02);
        config.cooldown_time = 600;
        config.max_position_size = Quote::new(dec!(1000));
        config.funding_rate_threshold = dec!(0.0002);
        config
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&raw)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading_pairs.is_empty() {
            return Err(ConfigError::NoTradingPairs);
        }
        let mut seen = HashSet::new();
        for pair in &self.trading_pairs {
            if pair.trim().is_empty() {
                return Err(ConfigError::InvalidPair { pair: pair.clone() });
            }
            if !seen.insert(pair.as_str()) {
                return Err(ConfigError::DuplicatePair { pair: pair.clone() });
            }
        }

        if self.leverage == 0 {
            return Err(ConfigError::InvalidValue {
                field: "leverage",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.order_levels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "order_levels",
                reason: "must be at least 1".to_string(),
            });
        }

        // builder indexes ladders by level, so both must cover every level
        for (side, ladder) in [(Side::Buy, &self.buy_spreads), (Side::Sell, &self.sell_spreads)] {
            if ladder.len() < self.order_levels {
                return Err(ConfigError::LadderTooShort {
                    side,
                    have: ladder.len(),
                    need: self.order_levels,
                });
            }
            if ladder.iter().any(|s| *s < Decimal::ZERO) {
                return Err(ConfigError::InvalidValue {
                    field: "spreads",
                    reason: format!("{side} spreads must be non-negative"),
                });
            }
        }

        if !self.total_amount_quote.is_positive() {
            return Err(ConfigError::InvalidValue {
                field: "total_amount_quote",
                reason: "must be positive".to_string(),
            });
        }

        if !self.max_position_size.is_positive() {
            return Err(ConfigError::InvalidValue {
                field: "max_position_size",
                reason: "must be positive".to_string(),
            });
        }

        if self.max_drawdown <= Decimal::ZERO || self.max_drawdown > Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "max_drawdown",
                reason: "must be in (0, 1]".to_string(),
            });
        }

        for (field, value) in [("stop_loss", self.stop_loss), ("take_profit", self.take_profit)] {
            if value < Decimal::ZERO || value >= Decimal::ONE {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be in [0, 1)".to_string(),
                });
            }
        }

        if self.funding_rate_threshold < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "funding_rate_threshold",
                reason: "must be non-negative".to_string(),
            });
        }

        if self.executor_refresh_time == 0 {
            return Err(ConfigError::InvalidValue {
                field: "executor_refresh_time",
                reason: "must be at least 1 second".to_string(),
            });
        }

        for (pair, cap) in &self.per_pair_max_quote {
            if cap.is_negative() {
                return Err(ConfigError::InvalidCap { pair: pair.clone() });
            }
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.executor_refresh_time)
    }

    pub fn pair_cap(&self, pair: &str) -> Option<Quote> {
        self.per_pair_max_quote.get(pair).copied()
    }
}

// Configuration errors. all of these are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("trading_pairs must not be empty")]
    NoTradingPairs,

    #[error("invalid trading pair {pair:?}")]
    InvalidPair { pair: String },

    #[error("trading pair {pair} listed more than once")]
    DuplicatePair { pair: String },

    #[error("{side} spread ladder has {have} entries, order_levels needs {need}")]
    LadderTooShort { side: Side, have: usize, need: usize },

    #[error("per pair cap for {pair} must be non-negative")]
    InvalidCap { pair: String },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

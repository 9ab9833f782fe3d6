//! Order intents and the desired order builder.
//!
//! An intent is what the strategy would like resting on the book: a pair, a side,
//! a spread from mid and a quote notional. Intents are plain values; two intents
//! with the same four fields are the same intent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::StrategyConfig;
use crate::funding::FundingSignals;
use crate::types::{Quote, Side};

/// A desired quote. Structural equality, no identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderIntent {
    pub pair: String,
    pub side: Side,
    /// Distance from mid as a fraction (0.0001 = 1bp).
    pub spread: Decimal,
    /// Quote currency notional. Never negative once past the risk gate.
    pub size_quote: Quote,
}

impl OrderIntent {
    pub fn new(pair: impl Into<String>, side: Side, spread: Decimal, size_quote: Quote) -> Self {
        Self {
            pair: pair.into(),
            side,
            spread,
            size_quote,
        }
    }

    pub fn with_size(&self, size_quote: Quote) -> Self {
        Self {
            size_quote,
            ..self.clone()
        }
    }
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} spread={} size={}",
            self.pair, self.side, self.spread, self.size_quote
        )
    }
}

/// Builds the ladder of intents for every configured pair.
#[derive(Debug, Clone)]
pub struct DesiredOrderBuilder {
    pairs: Vec<String>,
    buy_spreads: Vec<Decimal>,
    sell_spreads: Vec<Decimal>,
    levels: usize,
    allocation: Quote,
}

impl DesiredOrderBuilder {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            pairs: config.trading_pairs.clone(),
            buy_spreads: config.buy_spreads.clone(),
            sell_spreads: config.sell_spreads.clone(),
            levels: config.order_levels,
            allocation: per_level_allocation(
                config.total_amount_quote,
                config.trading_pairs.len(),
                config.order_levels,
            ),
        }
    }

    pub fn allocation(&self) -> Quote {
        self.allocation
    }

    /// `2 * levels` intents per pair, buy then sell for each level, pairs in
    /// config order. Pairs missing from `signals` get zero bias.
    pub fn build(&self, signals: &FundingSignals) -> Vec<OrderIntent> {
        let mut orders = Vec::with_capacity(self.pairs.len() * self.levels * 2);
        for pair in &self.pairs {
            let bias = signals.get(pair).copied().unwrap_or(Decimal::ZERO);
            let (buy_skew, sell_skew) = skew_factors(bias);

            // ladders shorter than `levels` are rejected by config validation
            for (buy, sell) in self
                .buy_spreads
                .iter()
                .zip(self.sell_spreads.iter())
                .take(self.levels)
            {
                orders.push(OrderIntent::new(pair.as_str(), Side::Buy, *buy * buy_skew, self.allocation));
                orders.push(OrderIntent::new(pair.as_str(), Side::Sell, *sell * sell_skew, self.allocation));
            }
        }
        orders
    }
}

// positive bias widens bids (lean short), negative bias widens asks (lean long)
pub fn skew_factors(bias: Decimal) -> (Decimal, Decimal) {
    let buy = Decimal::ONE + bias.max(Decimal::ZERO);
    let sell = Decimal::ONE + (-bias).max(Decimal::ZERO);
    (buy, sell)
}

/// Equal split of the budget across pairs, both sides and every level.
pub fn per_level_allocation(total: Quote, pairs: usize, levels: usize) -> Quote {
    let slots = pairs.max(1) * (levels * 2).max(1);
    Quote::new(total.value() / Decimal::from(slots))
}

//! Level 2 order book snapshot as returned by the market data gateway.
//!
//! Levels are best-first on both sides. The book is read-only here: it feeds the
//! startup summary and the periodic health snapshot, never the quoting math.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl BookLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Highest bid first.
    pub bids: Vec<BookLevel>,
    /// Lowest ask first.
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { bids, asks }
    }

    /// The fail-soft default for a book that could not be fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks.first().copied()
    }

    pub fn mid(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some((bid.price + ask.price) / Decimal::TWO)
    }

    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Cumulative size of the top `levels` bids.
    pub fn bid_depth(&self, levels: usize) -> Decimal {
        self.bids.iter().take(levels).map(|l| l.size).sum()
    }

    /// Cumulative size of the top `levels` asks.
    pub fn ask_depth(&self, levels: usize) -> Decimal {
        self.asks.iter().take(levels).map(|l| l.size).sum()
    }

    pub fn summary(&self, depth_levels: usize) -> BookSummary {
        BookSummary {
            best_bid: self.best_bid().map(|l| l.price),
            best_ask: self.best_ask().map(|l| l.price),
            mid: self.mid(),
            spread: self.spread(),
            bid_depth: self.bid_depth(depth_levels),
            ask_depth: self.ask_depth(depth_levels),
            bid_levels: self.bids.len(),
            ask_levels: self.asks.len(),
        }
    }
}

/// Top of book and shallow depth metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub mid: Option<Decimal>,
    pub spread: Option<Decimal>,
    pub bid_depth: Decimal,
    pub ask_depth: Decimal,
    pub bid_levels: usize,
    pub ask_levels: usize,
}

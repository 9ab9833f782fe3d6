// 8.2: market health. a best effort startup summary per pair and a periodic book snapshot.
// failures here are logged at debug and swallowed.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::core::Controller;
use super::results::HealthSnapshot;
use crate::gateway::{pair_to_coin, MarketDataGateway};

impl<G: MarketDataGateway> Controller<G> {
    pub(super) fn startup_snapshot(&mut self) {
        let pairs = self.strategy.trading_pairs.clone();
        let mut mappings = Vec::with_capacity(pairs.len());

        for pair in &pairs {
            let coin = match self.gateway.resolve_coin(pair) {
                Ok(coin) => coin,
                Err(err) => {
                    debug!(pair = %pair, error = %err, "coin resolution failed");
                    pair_to_coin(pair).to_string()
                }
            };
            let rate = match self.gateway.funding_rate(pair) {
                Ok(rate) => rate,
                Err(err) => {
                    debug!(pair = %pair, error = %err, "startup funding fetch failed");
                    Decimal::ZERO
                }
            };
            let (best_bid, best_ask) = match self.gateway.orderbook(pair) {
                Ok(book) => (book.best_bid(), book.best_ask()),
                Err(err) => {
                    debug!(pair = %pair, error = %err, "startup orderbook fetch failed");
                    (None, None)
                }
            };
            info!(
                pair = %pair,
                coin = %coin,
                funding_rate = %rate,
                best_bid = ?best_bid,
                best_ask = ?best_ask,
                "startup summary"
            );
            mappings.push(format!("{pair} -> {coin}"));
        }

        info!(?mappings, "resolved coin mappings");
    }

    /// Round robin over the pairs, one pair per snapshot tick.
    pub(super) fn health_snapshot(&mut self, tick: u64) -> Option<HealthSnapshot> {
        let interval = self.config.health_interval;
        let pairs = &self.strategy.trading_pairs;
        if interval == 0 || tick % interval != 0 || pairs.is_empty() {
            return None;
        }

        let idx = usize::try_from((tick / interval) % pairs.len() as u64).unwrap_or(0);
        let pair = pairs[idx].clone();

        let book = match self.gateway.orderbook(&pair) {
            Ok(book) => book,
            Err(err) => {
                debug!(pair = %pair, error = %err, "health snapshot failed");
                return None;
            }
        };

        let summary = book.summary(self.config.health_depth);
        info!(
            pair = %pair,
            best_bid = ?summary.best_bid,
            best_ask = ?summary.best_ask,
            mid = ?summary.mid,
            spread = ?summary.spread,
            bid_depth = %summary.bid_depth,
            ask_depth = %summary.ask_depth,
            bid_levels = summary.bid_levels,
            ask_levels = summary.ask_levels,
            "health"
        );

        Some(HealthSnapshot { pair, book: summary })
    }
}

//! In-memory gateway for tests and offline runs.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use super::{pair_to_coin, GatewayError, MarketDataGateway};
use crate::book::OrderBook;

#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    funding: HashMap<String, Decimal>,
    books: HashMap<String, OrderBook>,
    coins: HashMap<String, String>,
    failing: HashSet<String>,
    offline: bool,
    funding_calls: usize,
    book_calls: usize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_funding(mut self, pair: &str, rate: Decimal) -> Self {
        self.set_funding(pair, rate);
        self
    }

    pub fn with_book(mut self, pair: &str, book: OrderBook) -> Self {
        self.books.insert(pair.to_string(), book);
        self
    }

    pub fn with_coin(mut self, pair: &str, coin: &str) -> Self {
        self.coins.insert(pair.to_string(), coin.to_string());
        self
    }

    pub fn set_funding(&mut self, pair: &str, rate: Decimal) {
        self.funding.insert(pair.to_string(), rate);
    }

    /// Every call for this pair fails until cleared.
    pub fn fail_pair(&mut self, pair: &str) {
        self.failing.insert(pair.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Every call fails while offline.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn funding_calls(&self) -> usize {
        self.funding_calls
    }

    pub fn book_calls(&self) -> usize {
        self.book_calls
    }

    fn check(&self, pair: &str) -> Result<(), GatewayError> {
        if self.offline {
            return Err(GatewayError::Unavailable("mock offline".to_string()));
        }
        if self.failing.contains(pair) {
            return Err(GatewayError::Transport(format!("mock failure for {pair}")));
        }
        Ok(())
    }
}

impl MarketDataGateway for MockGateway {
    fn funding_rate(&mut self, pair: &str) -> Result<Decimal, GatewayError> {
        self.funding_calls += 1;
        self.check(pair)?;
        // unlisted pairs quote flat funding
        Ok(self.funding.get(pair).copied().unwrap_or(Decimal::ZERO))
    }

    fn orderbook(&mut self, pair: &str) -> Result<OrderBook, GatewayError> {
        self.book_calls += 1;
        self.check(pair)?;
        Ok(self.books.get(pair).cloned().unwrap_or_default())
    }

    fn resolve_coin(&mut self, pair: &str) -> Result<String, GatewayError> {
        self.check(pair)?;
        Ok(self
            .coins
            .get(pair)
            .cloned()
            .unwrap_or_else(|| pair_to_coin(pair).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mock_serves_configured_values() {
        let mut gw = MockGateway::new()
            .with_funding("BTC-USDC", dec!(0.0003))
            .with_coin("BTC-USDC", "UBTC");

        assert_eq!(gw.funding_rate("BTC-USDC").unwrap(), dec!(0.0003));
        assert_eq!(gw.funding_rate("ETH-USDC").unwrap(), Decimal::ZERO);
        assert_eq!(gw.resolve_coin("BTC-USDC").unwrap(), "UBTC");
        assert_eq!(gw.resolve_coin("ETH-USDC").unwrap(), "ETH");
        assert_eq!(gw.funding_calls(), 2);
    }

    #[test]
    fn mock_failures() {
        let mut gw = MockGateway::new().with_funding("BTC-USDC", dec!(0.0003));
        gw.fail_pair("BTC-USDC");
        assert!(gw.funding_rate("BTC-USDC").is_err());

        gw.clear_failures();
        gw.set_offline(true);
        assert!(gw.orderbook("ETH-USDC").is_err());
    }
}

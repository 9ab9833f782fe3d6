// 4.0: market data gateway. the only place the strategy touches the network.
// everything here is read-only. failures come back as GatewayError and the caller
// decides the safe default (zero funding, empty book).

mod hyperliquid;
mod latency;
mod mock;
mod retry;

pub use hyperliquid::{HttpTransport, HyperliquidGateway, InfoTransport, MAINNET_URL, TESTNET_URL};
pub use latency::{LatencyStats, LatencyTracker};
pub use mock::MockGateway;
pub use retry::RetryPolicy;

use crate::book::OrderBook;
use rust_decimal::Decimal;

/// Market data source consumed by the control loop.
///
/// Calls are synchronous and may block the tick. Implementations own their own
/// retry policy; callers never retry.
pub trait MarketDataGateway {
    /// Current funding rate per funding period for a quote pair label.
    fn funding_rate(&mut self, pair: &str) -> Result<Decimal, GatewayError>;

    /// L2 snapshot, best-first on both sides.
    fn orderbook(&mut self, pair: &str) -> Result<OrderBook, GatewayError>;

    /// Venue asset symbol for a quote pair label, e.g. "BTC-USDC" -> "BTC".
    fn resolve_coin(&mut self, pair: &str) -> Result<String, GatewayError>;
}

impl<G: MarketDataGateway + ?Sized> MarketDataGateway for Box<G> {
    fn funding_rate(&mut self, pair: &str) -> Result<Decimal, GatewayError> {
        (**self).funding_rate(pair)
    }

    fn orderbook(&mut self, pair: &str) -> Result<OrderBook, GatewayError> {
        (**self).orderbook(pair)
    }

    fn resolve_coin(&mut self, pair: &str) -> Result<String, GatewayError> {
        (**self).resolve_coin(pair)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("http status {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("coin {0} not listed by venue")]
    UnknownCoin(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl GatewayError {
    // worth another attempt: network hiccups and server side statuses
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Http { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// "BTC-USDC" -> "BTC". Labels without a dash are already coins.
pub fn pair_to_coin(pair: &str) -> &str {
    match pair.split_once('-') {
        Some((coin, _)) => coin,
        None => pair,
    }
}

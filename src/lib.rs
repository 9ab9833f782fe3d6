// pmm-funding: funding-aware perpetual market making control loop.
// risk-first: every desired order passes the risk gate before it is reconciled.
// nothing is ever sent to an exchange. dry-run logs diffs, guarded mode logs a clamped preview.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Side, Quote, Timestamp
//   2.x  config.rs: strategy config, yaml loading, validation, presets
//   3.x  book.rs: l2 book levels and summaries
//   4.x  gateway/: market data trait, hyperliquid client, retry, latency, mock
//   5.x  funding.rs: funding rate -> bias signal
//   6.x  equity.rs: equity peak/drawdown, pnl simulation, performance
//   6.3  risk.rs: loss cooldown, drawdown breaker, notional caps, barriers
//   7.x  sync.rs: diff against last submitted intents, guarded preview
//   8.x  controller/: lifecycle and the tick pipeline
//   9.x  events.rs: bounded audit log of controller events
//   order.rs: order intents and the spread ladder builder

pub mod book;
pub mod config;
pub mod controller;
pub mod equity;
pub mod events;
pub mod funding;
pub mod gateway;
pub mod order;
pub mod risk;
pub mod sync;
pub mod types;

// re exports for convenience
pub use book::{BookLevel, BookSummary, OrderBook};
pub use config::{ConfigError, Network, PositionMode, StrategyConfig};
pub use controller::{Controller, ControllerConfig, ControllerStatus, HealthSnapshot, TickReport};
pub use equity::{simulate_pnl_delta, EquityTracker, PerformanceTracker, PnlReport};
pub use events::{Event, EventId, EventLog, EventPayload};
pub use funding::{funding_bias, FundingSignalGenerator, FundingSignals};
pub use gateway::{GatewayError, HyperliquidGateway, MarketDataGateway, MockGateway, RetryPolicy};
pub use order::{DesiredOrderBuilder, OrderIntent};
pub use risk::{Barriers, BlockReason, CapAudit, FilterOutcome, RiskGate, RiskParams};
pub use sync::{ExecutionMode, OrderSynchronizer, SyncOutcome};
pub use types::{Quote, Side, Timestamp};

// 8.0 controller/core.rs: the controller struct, lifecycle and accessors.

use tracing::info;

use super::config::ControllerConfig;
use super::results::ControllerStatus;
use crate::config::{ConfigError, StrategyConfig};
use crate::equity::PerformanceTracker;
use crate::events::{EventLog, EventPayload, StartedEvent, StoppedEvent};
use crate::funding::FundingSignalGenerator;
use crate::gateway::MarketDataGateway;
use crate::order::DesiredOrderBuilder;
use crate::risk::{RiskGate, RiskParams};
use crate::sync::{ExecutionMode, OrderSynchronizer};
use crate::types::{Quote, Timestamp};

/** 8.1: one strategy instance. owns its gateway and every piece of state */
#[derive(Debug)]
pub struct Controller<G: MarketDataGateway> {
    pub(super) strategy: StrategyConfig,
    pub(super) config: ControllerConfig,
    pub(super) gateway: G,
    pub(super) signals: FundingSignalGenerator,
    pub(super) builder: DesiredOrderBuilder,
    pub(super) risk: RiskGate,
    pub(super) sync: OrderSynchronizer,
    pub(super) performance: PerformanceTracker,
    pub(super) events: EventLog,
    pub(super) status: ControllerStatus,
    pub(super) tick_count: u64,
    pub(super) equity: Quote,
}

impl<G: MarketDataGateway> Controller<G> {
    pub fn new(strategy: StrategyConfig, gateway: G) -> Result<Self, ConfigError> {
        Self::with_config(strategy, gateway, ControllerConfig::default())
    }

    pub fn with_config(
        strategy: StrategyConfig,
        gateway: G,
        config: ControllerConfig,
    ) -> Result<Self, ConfigError> {
        strategy.validate()?;
        Ok(Self {
            signals: FundingSignalGenerator::new(strategy.funding_rate_threshold),
            builder: DesiredOrderBuilder::from_config(&strategy),
            risk: RiskGate::new(RiskParams::from_config(&strategy)),
            sync: OrderSynchronizer::new(ExecutionMode::from_config(&strategy)),
            performance: PerformanceTracker::new(),
            events: EventLog::new(config.max_events),
            status: ControllerStatus::Stopped,
            tick_count: 0,
            // paper equity starts at the full budget
            equity: strategy.total_amount_quote,
            strategy,
            config,
            gateway,
        })
    }

    pub fn start(&mut self) {
        if self.status == ControllerStatus::Running {
            info!("controller already running");
            return;
        }
        info!(
            connector = %self.strategy.connector_name,
            network = ?self.strategy.network,
            dry_run = self.strategy.dry_run,
            mode = ?self.sync.mode(),
            leverage = self.strategy.leverage,
            position_mode = ?self.strategy.position_mode,
            order_refresh_secs = self.strategy.order_refresh_time,
            pairs = ?self.strategy.trading_pairs,
            "starting controller"
        );
        self.status = ControllerStatus::Running;
        self.signals.start();
        self.sync.start();
        self.startup_snapshot();
        self.emit_event(
            Timestamp::now(),
            EventPayload::Started(StartedEvent {
                connector: self.strategy.connector_name.clone(),
                pairs: self.strategy.trading_pairs.clone(),
                mode: self.sync.mode(),
                leverage: self.strategy.leverage,
                position_mode: self.strategy.position_mode,
                order_refresh_time: self.strategy.order_refresh_time,
            }),
        );
    }

    pub fn stop(&mut self) {
        if self.status == ControllerStatus::Stopped {
            info!("controller already stopped");
            return;
        }
        info!(ticks = self.tick_count, equity = %self.equity, "stopping controller");
        self.status = ControllerStatus::Stopped;
        self.signals.stop();
        self.sync.stop();
        self.emit_event(
            Timestamp::now(),
            EventPayload::Stopped(StoppedEvent {
                ticks: self.tick_count,
            }),
        );
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ControllerStatus::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn equity(&self) -> Quote {
        self.equity
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn risk(&self) -> &RiskGate {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskGate {
        &mut self.risk
    }

    pub fn synchronizer(&self) -> &OrderSynchronizer {
        &self.sync
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub(super) fn emit_event(&mut self, timestamp: Timestamp, payload: EventPayload) {
        self.events.record(timestamp, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PositionMode;
    use crate::events::EventPayload;
    use crate::gateway::MockGateway;

    fn config() -> StrategyConfig {
        StrategyConfig {
            trading_pairs: vec!["BTC-USDC".to_string()],
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = StrategyConfig {
            trading_pairs: Vec::new(),
            ..StrategyConfig::default()
        };
        assert_eq!(
            Controller::new(bad, MockGateway::new()).err(),
            Some(ConfigError::NoTradingPairs)
        );
    }

    #[test]
    fn lifecycle_is_idempotent() {
        let mut controller = Controller::new(config(), MockGateway::new()).unwrap();
        assert_eq!(controller.status(), ControllerStatus::Stopped);

        controller.start();
        controller.start();
        assert!(controller.is_running());
        assert_eq!(controller.events().len(), 1);

        controller.stop();
        controller.stop();
        assert_eq!(controller.status(), ControllerStatus::Stopped);
        assert_eq!(controller.events().len(), 2);
        assert!(matches!(
            controller.events().events()[1].payload,
            EventPayload::Stopped(StoppedEvent { ticks: 0 })
        ));
    }

    #[test]
    fn start_event_carries_execution_settings() {
        let strategy = StrategyConfig {
            leverage: 2,
            position_mode: PositionMode::Hedge,
            order_refresh_time: 15,
            ..config()
        };
        let mut controller = Controller::new(strategy, MockGateway::new()).unwrap();
        controller.start();

        match &controller.events().events()[0].payload {
            EventPayload::Started(started) => {
                assert_eq!(started.connector, "hyperliquid_perpetual");
                assert_eq!(started.leverage, 2);
                assert_eq!(started.position_mode, PositionMode::Hedge);
                assert_eq!(started.order_refresh_time, 15);
                assert_eq!(started.pairs, vec!["BTC-USDC".to_string()]);
            }
            other => panic!("expected start event, got {other:?}"),
        }
    }

    #[test]
    fn equity_starts_at_budget() {
        let controller = Controller::new(config(), MockGateway::new()).unwrap();
        assert_eq!(controller.equity(), config().total_amount_quote);
        assert_eq!(controller.tick_count(), 0);
    }
}

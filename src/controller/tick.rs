// 8.1: the tick pipeline. each stage feeds the next; nothing loops back.

use rust_decimal::Decimal;
use tracing::info;

use super::core::Controller;
use super::results::{ControllerStatus, TickReport};
use crate::equity::simulate_pnl_delta;
use crate::events::{
    CapsAppliedEvent, EquityUpdatedEvent, EventPayload, LossRecordedEvent, OrdersBlockedEvent,
    OrdersSyncedEvent,
};
use crate::funding::FundingSignals;
use crate::gateway::MarketDataGateway;
use crate::types::{as_percent, Quote, Timestamp};

impl<G: MarketDataGateway> Controller<G> {
    /// One control cycle. None while stopped.
    pub fn on_tick(&mut self) -> Option<TickReport> {
        self.on_tick_at(Timestamp::now())
    }

    pub fn on_tick_at(&mut self, now: Timestamp) -> Option<TickReport> {
        if self.status != ControllerStatus::Running {
            return None;
        }

        // 1) funding signal
        let signals = self
            .signals
            .get_signals(&mut self.gateway, &self.strategy.trading_pairs);

        // 2) desired ladder
        let desired = self.builder.build(&signals);

        // 3) risk
        let filtered = self.risk.filter_orders_at(&desired, now);

        // 4) reconcile
        let synced = self.sync.sync_orders(&filtered.orders);

        self.tick_count += 1;
        let tick = self.tick_count;

        if let Some(reason) = &filtered.blocked {
            self.emit_event(
                now,
                EventPayload::OrdersBlocked(OrdersBlockedEvent {
                    tick,
                    reason: reason.clone(),
                }),
            );
        } else if filtered.capped + filtered.skipped > 0 {
            self.emit_event(
                now,
                EventPayload::CapsApplied(CapsAppliedEvent {
                    tick,
                    capped: filtered.capped,
                    skipped: filtered.skipped,
                }),
            );
        }
        if !synced.is_noop() {
            self.emit_event(
                now,
                EventPayload::OrdersSynced(OrdersSyncedEvent {
                    tick,
                    added: synced.to_add.len(),
                    removed: synced.to_remove.len(),
                }),
            );
        }

        // 5) book health
        let health = self.health_snapshot(tick);

        // 6) equity
        let pnl_delta = self.apply_simulated_pnl(&signals, tick, now);

        Some(TickReport {
            tick,
            desired: desired.len(),
            kept: filtered.orders.len(),
            added: synced.to_add.len(),
            removed: synced.to_remove.len(),
            blocked: filtered.blocked,
            health,
            pnl_delta,
            equity: self.equity,
            signals,
        })
    }

    fn apply_simulated_pnl(&mut self, signals: &FundingSignals, tick: u64, now: Timestamp) -> Quote {
        let pnl_delta = simulate_pnl_delta(signals, self.strategy.total_amount_quote);
        self.equity = self.equity.add(pnl_delta);

        if !pnl_delta.is_zero() {
            self.performance.record_trade(pnl_delta);
        }
        if pnl_delta.is_negative() {
            self.risk.record_fill_at(pnl_delta, now);
            self.emit_event(
                now,
                EventPayload::LossRecorded(LossRecordedEvent { tick, pnl: pnl_delta }),
            );
        }
        self.risk.update_equity(self.equity);

        let drawdown = self.risk.equity().drawdown();
        let peak = self.risk.equity().peak().unwrap_or(self.equity);
        info!(
            equity = %self.equity.value().round_dp(2),
            peak = %peak,
            drawdown_pct = %as_percent(drawdown.unwrap_or(Decimal::ZERO).max(Decimal::ZERO)).round_dp(4),
            cooldown_active = self.risk.should_pause_at(now),
            "equity status"
        );
        self.emit_event(
            now,
            EventPayload::EquityUpdated(EquityUpdatedEvent {
                tick,
                equity: self.equity,
                peak,
                drawdown,
            }),
        );

        pnl_delta
    }
}

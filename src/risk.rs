//! Risk gate: loss cooldown, drawdown circuit breaker and notional caps.
//!
//! Every desired order passes through [`RiskGate::filter_orders`] before it can
//! reach the synchronizer. A cooldown or a drawdown breach blocks the whole
//! cycle; otherwise orders are clipped to the per order ceiling and per pair
//! caps are consumed strictly in input order, so earlier levels win.
//!
//! Time dependent calls come in two forms: the plain one reads the wall clock,
//! the `_at` one takes the timestamp explicitly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::config::StrategyConfig;
use crate::equity::EquityTracker;
use crate::order::OrderIntent;
use crate::types::{as_percent, Quote, Timestamp};

/// Risk limits for one strategy instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParams {
    /// Stop loss distance from entry as a fraction.
    pub stop_loss: Decimal,
    /// Take profit distance from entry as a fraction.
    pub take_profit: Decimal,
    /// Per order notional ceiling.
    pub max_position_size: Quote,
    /// Drawdown from peak equity that trips the breaker (0.05 = 5%).
    pub max_drawdown: Decimal,
    /// Order block after a realized loss, in milliseconds.
    pub cooldown_ms: i64,
    /// Per pair notional caps per cycle.
    pub per_pair_caps: BTreeMap<String, Quote>,
}

impl RiskParams {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            stop_loss: config.stop_loss,
            take_profit: config.take_profit,
            max_position_size: config.max_position_size,
            max_drawdown: config.max_drawdown,
            cooldown_ms: i64::try_from(config.cooldown_time.saturating_mul(1000)).unwrap_or(i64::MAX),
            per_pair_caps: config.per_pair_max_quote.clone(),
        }
    }
}

impl Default for RiskParams {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}

/// Absolute exit prices for a position opened at some entry price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barriers {
    pub stop_loss_px: Decimal,
    pub take_profit_px: Decimal,
}

/// Why a whole cycle was blocked. Expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    LossCooldown { remaining_ms: i64 },
    DrawdownBreached { drawdown: Decimal, max_drawdown: Decimal },
}

/// Cap usage for one capped pair after a filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapAudit {
    pub used: Quote,
    pub cap: Quote,
    pub remaining: Quote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub orders: Vec<OrderIntent>,
    pub blocked: Option<BlockReason>,
    /// Orders truncated to fit a pair cap.
    pub capped: usize,
    /// Orders dropped: non-positive size or exhausted pair cap.
    pub skipped: usize,
    /// One entry per capped pair, including pairs that got no orders.
    pub audit: BTreeMap<String, CapAudit>,
}

impl FilterOutcome {
    fn blocked(reason: BlockReason) -> Self {
        Self {
            blocked: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    pub fn total_for(&self, pair: &str) -> Quote {
        self.orders
            .iter()
            .filter(|o| o.pair == pair)
            .map(|o| o.size_quote)
            .sum()
    }
}

/// Stateful filter between the order builder and the synchronizer.
#[derive(Debug, Clone)]
pub struct RiskGate {
    params: RiskParams,
    last_loss_at: Option<Timestamp>,
    equity: EquityTracker,
}

impl RiskGate {
    pub fn new(params: RiskParams) -> Self {
        Self {
            params,
            last_loss_at: None,
            equity: EquityTracker::new(),
        }
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    pub fn equity(&self) -> &EquityTracker {
        &self.equity
    }

    pub fn last_loss_at(&self) -> Option<Timestamp> {
        self.last_loss_at
    }

    pub fn compute_barriers(&self, entry_px: Decimal) -> Barriers {
        if entry_px <= Decimal::ZERO {
            return Barriers {
                stop_loss_px: Decimal::ZERO,
                take_profit_px: Decimal::ZERO,
            };
        }
        Barriers {
            stop_loss_px: entry_px * (Decimal::ONE - self.params.stop_loss),
            take_profit_px: entry_px * (Decimal::ONE + self.params.take_profit),
        }
    }

    pub fn record_fill(&mut self, pnl_delta: Quote) {
        self.record_fill_at(pnl_delta, Timestamp::now());
    }

    /// A loss restarts the cooldown from `now`. Gains are ignored.
    pub fn record_fill_at(&mut self, pnl_delta: Quote, now: Timestamp) {
        if pnl_delta.is_negative() {
            self.last_loss_at = Some(now);
            warn!(
                pnl = %pnl_delta,
                cooldown_ms = self.params.cooldown_ms,
                "loss recorded, cooldown started"
            );
        }
    }

    pub fn update_equity(&mut self, equity: Quote) {
        self.equity.update_equity(equity);
    }

    /// Manual breaker reset: the current equity becomes the new peak.
    pub fn reset_equity_peak(&mut self) {
        let Some(now) = self.equity.current() else {
            return;
        };
        info!(equity = %now, "equity peak reset");
        self.equity = EquityTracker::new();
        self.equity.update_equity(now);
    }

    pub fn should_pause_after_loss(&self) -> bool {
        self.should_pause_at(Timestamp::now())
    }

    pub fn should_pause_at(&self, now: Timestamp) -> bool {
        self.cooldown_remaining_at(now).is_some()
    }

    /// Milliseconds left in the loss cooldown, None when not cooling down.
    pub fn cooldown_remaining_at(&self, now: Timestamp) -> Option<i64> {
        let last = self.last_loss_at?;
        // a clock stepping backwards reads as no time elapsed
        let elapsed = last.millis_until(&now).max(0);
        if elapsed < self.params.cooldown_ms {
            Some(self.params.cooldown_ms - elapsed)
        } else {
            None
        }
    }

    pub fn breached_drawdown(&self) -> bool {
        self.equity.breached(self.params.max_drawdown)
    }

    pub fn block_reason_at(&self, now: Timestamp) -> Option<BlockReason> {
        if let Some(remaining_ms) = self.cooldown_remaining_at(now) {
            return Some(BlockReason::LossCooldown { remaining_ms });
        }
        if self.breached_drawdown() {
            return Some(BlockReason::DrawdownBreached {
                drawdown: self.equity.drawdown().unwrap_or(Decimal::ZERO),
                max_drawdown: self.params.max_drawdown,
            });
        }
        None
    }

    pub fn filter_orders(&self, intents: &[OrderIntent]) -> FilterOutcome {
        self.filter_orders_at(intents, Timestamp::now())
    }

    pub fn filter_orders_at(&self, intents: &[OrderIntent], now: Timestamp) -> FilterOutcome {
        if let Some(reason) = self.block_reason_at(now) {
            match &reason {
                BlockReason::LossCooldown { remaining_ms } => warn!(
                    remaining_ms,
                    cooldown_ms = self.params.cooldown_ms,
                    "risk pause active after recent loss, blocking new orders"
                ),
                BlockReason::DrawdownBreached { drawdown, max_drawdown } => error!(
                    drawdown_pct = %as_percent(*drawdown).round_dp(4),
                    max_drawdown = %max_drawdown,
                    "circuit breaker tripped, blocking new orders"
                ),
            }
            return FilterOutcome::blocked(reason);
        }

        let mut outcome = FilterOutcome::default();
        let mut used_by_pair: BTreeMap<&str, Quote> = BTreeMap::new();

        for intent in intents {
            let mut size = intent.size_quote.min(self.params.max_position_size);
            if !size.is_positive() {
                outcome.skipped += 1;
                continue;
            }

            if let Some(cap) = self.params.per_pair_caps.get(&intent.pair).copied() {
                let used = used_by_pair.get(intent.pair.as_str()).copied().unwrap_or_default();
                let remaining = cap.saturating_sub(used);
                if remaining.is_zero() {
                    warn!(pair = %intent.pair, cap = %cap, "per pair cap reached, skipping order");
                    outcome.skipped += 1;
                    continue;
                }
                if size > remaining {
                    warn!(
                        pair = %intent.pair,
                        from = %size,
                        to = %remaining,
                        "per pair cap would be exceeded, capping size"
                    );
                    size = remaining;
                    outcome.capped += 1;
                }
                used_by_pair.insert(intent.pair.as_str(), used.add(size));
            }

            outcome.orders.push(intent.with_size(size));
        }

        for (pair, cap) in &self.params.per_pair_caps {
            let used = used_by_pair.get(pair.as_str()).copied().unwrap_or_default();
            outcome.audit.insert(
                pair.clone(),
                CapAudit {
                    used,
                    cap: *cap,
                    remaining: cap.saturating_sub(used),
                },
            );
        }

        if !outcome.audit.is_empty() {
            info!(
                audit = ?outcome.audit,
                capped_orders = outcome.capped,
                skipped_orders = outcome.skipped,
                "cap audit"
            );
        }

        outcome
    }
}

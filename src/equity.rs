// 6.0: equity and drawdown tracking. peak is a high water mark over every update.
// 6.1: pnl simulation. no fills exist in dry-run, so equity moves on a funding-derived proxy.
// 6.2: cumulative performance counters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::funding::{mean_bias, FundingSignals};
use crate::types::Quote;

// proxy pnl per tick as a fraction of budget per unit of bias
const SIMULATED_PNL_SCALE: Decimal = dec!(0.0001);

#[derive(Debug, Clone, Default)]
pub struct EquityTracker {
    peak: Option<Quote>,
    now: Option<Quote>,
}

impl EquityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_equity(&mut self, equity: Quote) {
        self.now = Some(equity);
        self.peak = Some(match self.peak {
            Some(peak) if peak >= equity => peak,
            _ => equity,
        });
    }

    pub fn peak(&self) -> Option<Quote> {
        self.peak
    }

    pub fn current(&self) -> Option<Quote> {
        self.now
    }

    /// `1 - now / peak`. None until both are known and peak is positive.
    pub fn drawdown(&self) -> Option<Decimal> {
        let peak = self.peak?;
        let now = self.now?;
        if !peak.is_positive() {
            return None;
        }
        Some(Decimal::ONE - now.value() / peak.value())
    }

    pub fn breached(&self, max_drawdown: Decimal) -> bool {
        self.drawdown().is_some_and(|dd| dd >= max_drawdown)
    }
}

/// Funding carry proxy: mean bias scaled to the budget. Zero with no signals.
pub fn simulate_pnl_delta(signals: &FundingSignals, total_quote: Quote) -> Quote {
    if signals.is_empty() {
        return Quote::zero();
    }
    Quote::new(mean_bias(signals) * total_quote.value() * SIMULATED_PNL_SCALE)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PnlReport {
    pub realized: Quote,
    pub fills: u64,
    pub losing_fills: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    report: PnlReport,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trade(&mut self, pnl_delta: Quote) {
        self.report.realized = self.report.realized.add(pnl_delta);
        self.report.fills += 1;
        if pnl_delta.is_negative() {
            self.report.losing_fills += 1;
        }
    }

    pub fn snapshot(&self) -> PnlReport {
        self.report.clone()
    }
}

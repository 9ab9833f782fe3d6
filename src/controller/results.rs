// 8.0.2: result types for controller operations.

use serde::Serialize;

use crate::book::BookSummary;
use crate::funding::FundingSignals;
use crate::risk::BlockReason;
use crate::types::Quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerStatus {
    Stopped,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub pair: String,
    pub book: BookSummary,
}

/// What one tick did. Counts refer to intents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub signals: FundingSignals,
    pub desired: usize,
    pub kept: usize,
    pub added: usize,
    pub removed: usize,
    pub blocked: Option<BlockReason>,
    pub health: Option<HealthSnapshot>,
    pub pnl_delta: Quote,
    pub equity: Quote,
}

impl TickReport {
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }
}

// 7.0: order synchronizer. owns the last submitted intent set and diffs each tick against it.
// nothing is ever transmitted: dry-run logs the diff, guarded mode also logs a clamped preview.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::StrategyConfig;
use crate::order::OrderIntent;
use crate::types::Quote;

/// Additions shown in a guarded preview.
pub const PREVIEW_LIMIT: usize = 5;

/// Preview sizes are clamped to this notional.
pub const SAFETY_CEILING: Quote = Quote::new(dec!(5));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    DryRun,
    /// testnet with dry_run off. still preview only.
    Guarded,
}

impl ExecutionMode {
    pub fn from_config(config: &StrategyConfig) -> Self {
        if config.dry_run {
            return ExecutionMode::DryRun;
        }
        if config.network.is_testnet() {
            ExecutionMode::Guarded
        } else {
            warn!("live execution on mainnet is not supported, running dry-run");
            ExecutionMode::DryRun
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub to_add: Vec<OrderIntent>,
    pub to_remove: Vec<OrderIntent>,
    /// Clamped additions, populated in guarded mode only.
    pub preview: Vec<OrderIntent>,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OrderSynchronizer {
    mode: ExecutionMode,
    running: bool,
    last_desired: Vec<OrderIntent>,
}

impl OrderSynchronizer {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            running: false,
            last_desired: Vec::new(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn start(&mut self) {
        info!(mode = ?self.mode, "order synchronizer started");
        self.running = true;
    }

    pub fn stop(&mut self) {
        info!(resting = self.last_desired.len(), "order synchronizer stopped");
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_desired(&self) -> &[OrderIntent] {
        &self.last_desired
    }

    /// Diff `desired` against the previous call and store it. No-op while stopped.
    pub fn sync_orders(&mut self, desired: &[OrderIntent]) -> SyncOutcome {
        if !self.running {
            return SyncOutcome::default();
        }

        let to_add = difference(desired, &self.last_desired);
        let to_remove = difference(&self.last_desired, desired);
        self.last_desired = desired.to_vec();

        info!(
            desired = desired.len(),
            to_add = to_add.len(),
            to_remove = to_remove.len(),
            "orders synced"
        );
        debug!(?to_add, ?to_remove, "order diff");

        let preview = match self.mode {
            ExecutionMode::DryRun => Vec::new(),
            ExecutionMode::Guarded => guarded_preview(&to_add, to_remove.len()),
        };

        SyncOutcome {
            to_add,
            to_remove,
            preview,
        }
    }
}

// set difference a \ b. duplicates collapse, first occurrence order is kept.
fn difference(a: &[OrderIntent], b: &[OrderIntent]) -> Vec<OrderIntent> {
    let exclude: HashSet<&OrderIntent> = b.iter().collect();
    let mut seen = HashSet::new();
    a.iter()
        .filter(|o| !exclude.contains(o) && seen.insert(*o))
        .cloned()
        .collect()
}

fn guarded_preview(to_add: &[OrderIntent], pending_cancels: usize) -> Vec<OrderIntent> {
    let preview: Vec<OrderIntent> = to_add
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|o| o.with_size(o.size_quote.min(SAFETY_CEILING)))
        .collect();

    for order in &preview {
        info!(order = %order, "guarded preview");
    }
    let suppressed = to_add.len() - preview.len();
    if suppressed > 0 {
        info!(suppressed, "guarded preview truncated");
    }
    if pending_cancels > 0 {
        info!(pending_cancels, "guarded preview cancels pending");
    }
    preview
}

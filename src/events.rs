// 9.0: every controller state change produces an event. the log is the audit trail of a run:
// lifecycle, blocked cycles, cap hits, diffs and equity moves. EventPayload lists them all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PositionMode;
use crate::risk::BlockReason;
use crate::sync::ExecutionMode;
use crate::types::{Quote, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Lifecycle
    Started(StartedEvent),
    Stopped(StoppedEvent),

    // Risk
    OrdersBlocked(OrdersBlockedEvent),
    CapsApplied(CapsAppliedEvent),
    LossRecorded(LossRecordedEvent),

    // Reconciliation
    OrdersSynced(OrdersSyncedEvent),

    // Equity
    EquityUpdated(EquityUpdatedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedEvent {
    pub connector: String,
    pub pairs: Vec<String>,
    pub mode: ExecutionMode,
    pub leverage: u32,
    pub position_mode: PositionMode,
    pub order_refresh_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppedEvent {
    pub ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersBlockedEvent {
    pub tick: u64,
    pub reason: BlockReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsAppliedEvent {
    pub tick: u64,
    pub capped: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecordedEvent {
    pub tick: u64,
    pub pnl: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersSyncedEvent {
    pub tick: u64,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityUpdatedEvent {
    pub tick: u64,
    pub equity: Quote,
    pub peak: Quote,
    pub drawdown: Option<Decimal>,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded in-memory log. Oldest events are dropped past `max_events`.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) {
        let event = Event::new(self.next_id(), timestamp, payload);
        self.emit(event);
    }

    /// Serialized log, one JSON object per event.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl EventEmitter for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

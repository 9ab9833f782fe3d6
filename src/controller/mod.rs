// 8.0: controller. one tick runs signals -> desired orders -> risk filter -> sync -> equity.
// single threaded and fail-soft: gateway trouble degrades a tick, never aborts it.

mod config;
mod core;
mod health;
mod results;
mod tick;

pub use config::ControllerConfig;
pub use core::Controller;
pub use results::{ControllerStatus, HealthSnapshot, TickReport};

//! Controller tuning knobs that are not part of the strategy config.

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Run a book health snapshot every this many ticks. Zero disables it.
    pub health_interval: u64,
    /// Levels summed into the snapshot depth figures.
    pub health_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            health_interval: 2,
            health_depth: 5,
        }
    }
}

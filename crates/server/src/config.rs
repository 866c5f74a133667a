//! Processor tuning knobs.

/// Pacing of the processing loop.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// How often the processor drains its queue and reconciles.
    pub tick_interval_ms: u64,
    /// Ceiling on datagrams handled per tick; the rest wait for the next
    /// one so a chatty client cannot starve reconciliation.
    pub max_packages_per_tick: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25,
            max_packages_per_tick: 10,
        }
    }
}

//! Explicit run context carrying the start instant, replacing the original
//! tool's process-global `start_t` + `pelapsed()` pair (Design Notes: "do
//! not rely on process-global mutable state").

use std::time::Instant;

use log::info;

pub struct RunContext {
    start: Instant,
}

impl RunContext {
    pub fn start() -> Self {
        RunContext { start: Instant::now() }
    }

    /// Logs an elapsed-seconds checkpoint to stderr via `log`, mirroring the
    /// original's `pelapsed(label)` stderr lines.
    pub fn checkpoint(&self, label: &str) {
        info!("[shark/{label}] time elapsed {:.1}s", self.start.elapsed().as_secs_f64());
    }
}

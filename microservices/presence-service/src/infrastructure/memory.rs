//! Process memory probe for presence stats

use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// Reads the resident memory of the current process
pub struct MemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Process id unavailable, memory usage reported as 0");
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }

    /// Resident set size in MiB, rounded to two decimals
    pub fn resident_mib(&self) -> f64 {
        let Some(pid) = self.pid else {
            return 0.0;
        };

        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return 0.0;
        }

        system
            .process(pid)
            .map(|process| {
                let mib = process.memory() as f64 / 1024.0 / 1024.0;
                (mib * 100.0).round() / 100.0
            })
            .unwrap_or(0.0)
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

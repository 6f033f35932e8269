use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use opswarm_types::json::{json, Value};
use sysinfo::System;

/// Host metrics reported with every heartbeat.
pub struct SystemMetrics {
    sys: Mutex<System>,
    current_workers: AtomicUsize,
}

impl SystemMetrics {
    pub fn new() -> Self {
        SystemMetrics {
            sys: Mutex::new(System::new()),
            current_workers: AtomicUsize::new(0),
        }
    }

    pub fn worker_started(&self) {
        self.current_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) {
        self.current_workers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Samples cpu and memory usage. First call after startup reports 0.0
    /// cpu because usage needs two refreshes to produce a delta.
    pub fn collect(&self) -> Value {
        let (cpu_util, ram_mb) = match self.sys.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu_usage();
                sys.refresh_memory();
                (
                    f64::from(sys.global_cpu_usage()) / 100.0,
                    sys.used_memory() / (1024 * 1024),
                )
            }
            Err(_) => (0.0, 0),
        };
        json!({
            "cpu_util": cpu_util,
            "ram_mb": ram_mb,
            "current_workers": self.current_workers.load(Ordering::Relaxed),
        })
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

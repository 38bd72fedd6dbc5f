// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal flags for the driver loop.
//!
//! SIGINT and SIGTERM request a graceful shutdown: the flag is checked at
//! iteration boundaries and between spawns, and running workers are allowed
//! to finish. SIGHUP is logged and ignored (reserved for reconfiguration).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared signal state, checked by the driver at its suspension points.
#[derive(Debug, Clone)]
pub struct SignalFlags {
    shutdown: Arc<AtomicBool>,
    sighup: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Install process-wide handlers for SIGINT, SIGTERM, and SIGHUP.
    pub fn install() -> std::io::Result<Self> {
        let flags = Self::detached();
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flags.shutdown))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flags.shutdown))?;
        signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&flags.sighup))?;
        Ok(flags)
    }

    /// Flags without OS handlers, driven manually (tests, embedding).
    pub fn detached() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            sighup: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Request shutdown programmatically.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Consume a pending SIGHUP, if any.
    pub fn take_sighup(&self) -> bool {
        self.sighup.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;

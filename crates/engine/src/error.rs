// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine errors.

use thiserror::Error;

/// Errors from one worker invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Store(#[from] wk_store::StoreError),

    #[error("failed to spawn worker: {0}")]
    Spawn(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from the driver loop.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("another driver is live (pid {pid})")]
    AlreadyRunning { pid: String },

    #[error(transparent)]
    Store(#[from] wk_store::StoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

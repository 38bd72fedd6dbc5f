// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by walk store operations.
///
/// `MalformedRecord` is only returned when the caller asked for that record
/// specifically; aggregations log and skip malformed entries instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not a walk directory (no _walk.md): {}", root.display())]
    NotAWalk { root: PathBuf },

    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("issue already exists: {0}")]
    AlreadyExists(String),

    #[error("issue not open: {0}")]
    NotOpen(String),

    #[error("malformed record at {}: {detail}", path.display())]
    MalformedRecord { path: PathBuf, detail: String },

    #[error("memory not found: {0}")]
    MemoryNotFound(String),

    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn malformed(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        StoreError::MalformedRecord {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}

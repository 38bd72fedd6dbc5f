// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wk-store: Filesystem-backed walk state.
//!
//! A walk directory is the database: issues are directories that move
//! atomically between `open/` and `closed/`, epochs are symlink indexes over
//! the closed partition, and memories/proposals are JSON files. Writes are
//! guarded by an exclusive advisory lock on `.walk.lock`; reads are
//! lock-free and tolerate directories vanishing mid-scan.

pub mod context;
pub mod discovery;
pub mod epochs;
pub mod error;
pub mod frontmatter;
pub mod issues;
pub mod memories;
pub mod paths;
pub mod snapshot;
pub mod walk;

pub use context::{ExpansionStats, NewContext, RecentClosed, RecentEpochGroup, TypeStats};
pub use discovery::DiscoveryTree;
pub use error::StoreError;
pub use issues::CreateIssue;
pub use snapshot::WalkSnapshot;
pub use walk::{WalkLock, WalkStore};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wk-prompt: Deterministic prompt assembly and report rendering.
//!
//! Every function here is pure over a store snapshot: the same snapshot
//! yields byte-identical output.

pub mod planner;
pub mod report;
pub mod worker;

pub use planner::build_planner_prompt;
pub use report::{render_history, render_status, render_summary};
pub use worker::{build_worker_prompt, WorkerPromptInput};

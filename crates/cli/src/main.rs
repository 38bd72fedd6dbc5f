// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wk — walk investigation driver and issue store CLI.
//!
//! `wk run` starts the driver; everything else is a thin shell over the
//! store, which is also the surface workers use to close, comment on, and
//! create issues from inside a run.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wk", version, about = "Autonomous investigation driver")]
struct Cli {
    /// Walk directory (default: $WALK_DIR, then the current directory)
    #[arg(long, global = true)]
    walk: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new walk directory
    Init {
        dir: PathBuf,
        #[arg(long)]
        title: String,
        /// File holding the walk goals; stdin when omitted and piped
        #[arg(long)]
        goals_file: Option<PathBuf>,
    },
    /// Start the driver loop
    Run {
        /// Stop after N loop iterations (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_iterations: u64,
    },
    /// Create an open issue
    New {
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long = "type")]
        issue_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        priority: u32,
        #[arg(long = "blocked-by")]
        blocked_by: Vec<String>,
        #[arg(long = "derived-from")]
        derived_from: Vec<String>,
    },
    /// Close an open issue
    Close {
        slug: String,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "routine")]
        signal: String,
    },
    /// Append a comment to an issue
    Comment { slug: String, text: String },
    /// List issues
    List {
        #[arg(long, default_value = "open")]
        status: String,
    },
    /// Show one issue
    Show { slug: String },
    /// Bump an issue to the front of the queue
    Bump { slug: String },
    /// Add a blocking dependency
    Block { slug: String, dep: String },
    /// Remove the driver block marker
    Unblock { slug: String },
    /// Propose a memory for the next planning round
    Propose { key: String, text: String },
    /// Accept a pending memory proposal (planner)
    Accept { key: String },
    /// Discard a pending memory proposal (planner)
    Discard { key: String },
    /// End a memory's life at the current epoch
    Forget { key: String },
    /// One-screen walk status
    Status,
    /// Epoch-by-epoch closure history
    History,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match commands::dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Logging goes to stderr so command output stays clean on stdout.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("WALK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

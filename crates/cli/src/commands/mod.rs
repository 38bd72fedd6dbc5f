// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers: thin shells over the store and the driver.

use crate::{Cli, Commands};
use anyhow::{bail, Context};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;
use wk_core::{IssueStatus, Signal, Slug, WalkHeader};
use wk_engine::{Driver, DriverExit, DriverOptions, SignalFlags, RESTART_EXIT_CODE};
use wk_prompt::{render_history, render_status};
use wk_store::{CreateIssue, WalkStore};

/// Execute one command; returns the process exit code.
pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Init {
            dir,
            title,
            goals_file,
        } => init(dir, title, goals_file),
        command => {
            let store = open_store(cli.walk)?;
            run_command(store, command)
        }
    }
}

fn run_command(store: WalkStore, command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::Init { .. } => unreachable!("handled in dispatch"),
        Commands::Run { max_iterations } => run_driver(store, max_iterations),
        Commands::New {
            slug,
            title,
            body,
            issue_type,
            priority,
            blocked_by,
            derived_from,
        } => {
            let issue = store.create(CreateIssue {
                slug: parse_slug(&slug)?,
                title,
                body,
                issue_type,
                priority,
                blocked_by: parse_slugs(&blocked_by)?,
                derived_from: parse_slugs(&derived_from)?,
            })?;
            println!("created {}", issue.slug);
            Ok(0)
        }
        Commands::Close {
            slug,
            reason,
            signal,
        } => {
            let signal = Signal::parse(&signal)
                .with_context(|| format!("unknown signal {signal:?} (routine|surprising|pivotal)"))?;
            let closure = store.close_issue(&parse_slug(&slug)?, &reason, signal)?;
            println!("closed {slug} (epoch {})", closure.epoch);
            Ok(0)
        }
        Commands::Comment { slug, text } => {
            store.add_comment(&parse_slug(&slug)?, &text)?;
            Ok(0)
        }
        Commands::List { status } => {
            let status = match status.as_str() {
                "open" => IssueStatus::Open,
                "closed" => IssueStatus::Closed,
                other => bail!("unknown status {other:?} (open|closed)"),
            };
            let issues = store.list(status)?;
            print!("{}", crate::output::render_list(&issues));
            Ok(0)
        }
        Commands::Show { slug } => {
            let slug = parse_slug(&slug)?;
            let issue = store.show(&slug)?;
            let comments = store.read_comments(&slug);
            print!("{}", crate::output::render_issue(&issue, comments.as_deref()));
            Ok(0)
        }
        Commands::Bump { slug } => {
            store.set_priority_override(&parse_slug(&slug)?)?;
            Ok(0)
        }
        Commands::Block { slug, dep } => {
            store.block(&parse_slug(&slug)?, &parse_slug(&dep)?)?;
            Ok(0)
        }
        Commands::Unblock { slug } => {
            store.unblock_driver(&parse_slug(&slug)?)?;
            Ok(0)
        }
        Commands::Propose { key, text } => {
            let proposed_by = std::env::var("WALK_ISSUE").ok();
            store.propose_memory(&key, &text, proposed_by)?;
            Ok(0)
        }
        Commands::Accept { key } => {
            store.accept_proposal(&key, Some("planner"))?;
            Ok(0)
        }
        Commands::Discard { key } => {
            store.discard_proposal(&key)?;
            Ok(0)
        }
        Commands::Forget { key } => {
            let killed_by = std::env::var("WALK_ISSUE").ok();
            store.forget_memory(&key, killed_by.as_deref())?;
            Ok(0)
        }
        Commands::Status => {
            print!("{}", render_status(&store.snapshot()?));
            Ok(0)
        }
        Commands::History => {
            print!("{}", render_history(&store.snapshot()?));
            Ok(0)
        }
    }
}

fn init(dir: PathBuf, title: String, goals_file: Option<PathBuf>) -> anyhow::Result<i32> {
    if dir.join("_walk.md").exists() {
        bail!("walk already exists at {}", dir.display());
    }
    let goals = match goals_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading goals from {}", path.display()))?,
        None => {
            let mut goals = String::new();
            std::io::stdin().read_to_string(&mut goals)?;
            goals
        }
    };
    WalkStore::scaffold(&dir, &WalkHeader::new(title), &goals)?;
    println!("initialized walk at {}", dir.display());
    Ok(0)
}

fn run_driver(store: WalkStore, max_iterations: u64) -> anyhow::Result<i32> {
    let options = DriverOptions {
        max_iterations: (max_iterations > 0).then_some(max_iterations),
        sleep: None,
        drain_timeout: None,
        signals: Some(SignalFlags::install()?),
    };
    let mut driver = Driver::new(store, options)?;
    match driver.run()? {
        DriverExit::Finished => Ok(0),
        DriverExit::Restart => Ok(RESTART_EXIT_CODE),
    }
}

/// Resolve the walk directory: `--walk`, then `$WALK_DIR`, then the
/// current directory.
fn open_store(flag: Option<PathBuf>) -> anyhow::Result<WalkStore> {
    let root = flag
        .or_else(|| std::env::var_os("WALK_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(WalkStore::open(&root)
        .with_context(|| format!("opening walk at {}", root.display()))?)
}

fn parse_slug(s: &str) -> anyhow::Result<Slug> {
    Ok(Slug::parse(s)?)
}

fn parse_slugs(list: &[String]) -> anyhow::Result<BTreeSet<Slug>> {
    list.iter().map(|s| parse_slug(s)).collect()
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One consistent read of everything the planner prompt and the reporting
//! renderers consume.

use crate::context::{ExpansionStats, RecentEpochGroup};
use crate::error::StoreError;
use crate::walk::WalkStore;
use std::collections::BTreeMap;
use wk_core::{Clock, Issue, IssueStatus, Memory, Proposal, Slug, WalkHeader};

/// A point-in-time view of a walk.
///
/// Building the same snapshot from unchanged store state yields identical
/// contents, which is what makes prompt assembly deterministic.
#[derive(Debug, Clone)]
pub struct WalkSnapshot {
    pub header: WalkHeader,
    pub goals: String,
    pub current_epoch: Option<u64>,
    /// Every epoch with the slugs closed in it.
    pub epochs: BTreeMap<u64, Vec<Slug>>,
    /// Open issues in listing order (ready first, then priority).
    pub open_issues: Vec<Issue>,
    /// Closed issues in closing order.
    pub closed_issues: Vec<Issue>,
    /// Recently closed issues under the planner byte budget.
    pub recent_closed: Vec<RecentEpochGroup>,
    pub memories: Vec<Memory>,
    pub proposals: Vec<Proposal>,
    pub stats: ExpansionStats,
    /// Full discovery parentage (open + closed).
    pub parents_of: BTreeMap<Slug, Vec<Slug>>,
    /// The byte budget the recent-closed window was built with.
    pub context_budget: u64,
}

impl WalkSnapshot {
    /// Total worker spend across all recorded runs.
    pub fn total_cost_usd(&self) -> f64 {
        self.open_issues
            .iter()
            .chain(self.closed_issues.iter())
            .flat_map(|issue| &issue.runs)
            .filter_map(|run| run.cost_usd)
            .sum()
    }

    /// Total recorded worker invocations.
    pub fn total_runs(&self) -> usize {
        self.open_issues
            .iter()
            .chain(self.closed_issues.iter())
            .map(|issue| issue.runs.len())
            .sum()
    }

    pub fn parent_annotation(&self, slug: &Slug) -> Option<String> {
        let parents = self.parents_of.get(slug)?;
        let names: Vec<&str> = parents.iter().map(Slug::as_str).collect();
        Some(names.join(", "))
    }
}

impl<C: Clock> WalkStore<C> {
    /// Assemble a snapshot. The recent-closed window honours the walk's
    /// configured planner byte budget.
    pub fn snapshot(&self) -> Result<WalkSnapshot, StoreError> {
        let (header, goals) = self.load_walk()?;
        let context_budget = header.config.planner_context_bytes;
        let tree = self.build_discovery_tree(true);

        Ok(WalkSnapshot {
            current_epoch: self.current_epoch(),
            epochs: self.epochs(),
            open_issues: self.list(IssueStatus::Open)?,
            closed_issues: self.list(IssueStatus::Closed)?,
            recent_closed: self.recent_closed(context_budget),
            memories: self.memories()?,
            proposals: self.proposals()?,
            stats: self.expansion_stats(),
            parents_of: tree.parents_of,
            header,
            goals,
            context_budget,
        })
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

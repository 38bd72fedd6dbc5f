// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery DAG derived from `derived_from` links.
//!
//! Many-to-many parentage is rendered as a tree by designating one primary
//! parent per child (the lexicographically first link name) and annotating
//! the rest as back-references. Cycles cannot occur because links are set
//! only at creation time.

use crate::walk::WalkStore;
use std::collections::BTreeMap;
use wk_core::{Clock, Issue, IssueStatus, Slug};

/// The discovery graph over a walk's issues.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryTree {
    /// Issues with no recorded parent, sorted.
    pub roots: Vec<Slug>,
    /// Primary-parent edges: parent → children, each child under exactly
    /// one parent.
    pub children: BTreeMap<Slug, Vec<Slug>>,
    /// Full parentage: child → all parents, sorted.
    pub parents_of: BTreeMap<Slug, Vec<Slug>>,
    /// The issues included in the graph.
    pub issues: BTreeMap<Slug, Issue>,
}

impl DiscoveryTree {
    /// The primary parent used for tree placement: the lexicographically
    /// first parent present in the graph.
    pub fn primary_parent(&self, child: &Slug) -> Option<&Slug> {
        self.parents_of
            .get(child)?
            .iter()
            .find(|parent| self.issues.contains_key(*parent))
    }

    /// Parents beyond the primary one (annotated as back-references).
    pub fn extra_parents(&self, child: &Slug) -> Vec<&Slug> {
        let primary = self.primary_parent(child);
        self.parents_of
            .get(child)
            .map(|parents| {
                parents
                    .iter()
                    .filter(|parent| Some(*parent) != primary)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<C: Clock> WalkStore<C> {
    /// Build the discovery tree over open issues, optionally including the
    /// closed partition.
    pub fn build_discovery_tree(&self, include_closed: bool) -> DiscoveryTree {
        let mut issues: BTreeMap<Slug, Issue> = BTreeMap::new();
        for issue in self.scan(IssueStatus::Open) {
            issues.insert(issue.slug.clone(), issue);
        }
        if include_closed {
            for issue in self.scan(IssueStatus::Closed) {
                issues.insert(issue.slug.clone(), issue);
            }
        }

        let mut tree = DiscoveryTree::default();
        for (slug, issue) in &issues {
            // Parents outside the included set still count for parentage:
            // a child of an excluded (closed) parent is not a root, it is
            // an orphan attached to nothing; render it as a root so it
            // remains reachable.
            let parents: Vec<Slug> = issue.derived_from.iter().cloned().collect();
            if parents.is_empty() {
                tree.roots.push(slug.clone());
            } else {
                tree.parents_of.insert(slug.clone(), parents.clone());
                match parents.iter().find(|p| issues.contains_key(*p)) {
                    Some(primary) => {
                        tree.children
                            .entry(primary.clone())
                            .or_default()
                            .push(slug.clone());
                    }
                    None => tree.roots.push(slug.clone()),
                }
            }
        }

        tree.roots.sort();
        for children in tree.children.values_mut() {
            children.sort();
        }
        tree.issues = issues;
        tree
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

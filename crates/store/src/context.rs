// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context accounting over the closed partition: what is new since the last
//! planning round, what recently closed, and how much issues expand.

use crate::paths;
use crate::walk::WalkStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use wk_core::{Clock, Issue, IssueStatus, Signal, Slug};

/// Closed context accumulated since a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewContext {
    /// Result + comment bytes across the new closures.
    pub bytes: u64,
    /// Non-routine signals among them.
    pub signals: Vec<Signal>,
    /// The closed slugs, oldest first.
    pub issues: Vec<Slug>,
}

impl NewContext {
    pub fn has_pivotal(&self) -> bool {
        self.signals.contains(&Signal::Pivotal)
    }

    pub fn has_surprising(&self) -> bool {
        self.signals.contains(&Signal::Surprising)
    }
}

/// One recently closed issue as the planner sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentClosed {
    pub slug: Slug,
    pub title: String,
    pub signal: Signal,
    pub closed_at: DateTime<Utc>,
    /// Body + result + comment bytes.
    pub bytes: u64,
    /// Discovery parents, sorted.
    pub parents: Vec<Slug>,
}

/// Recently closed issues grouped by epoch, newest epoch first.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentEpochGroup {
    pub epoch: u64,
    /// Newest closure first within the epoch.
    pub issues: Vec<RecentClosed>,
}

/// Ratio statistics for one issue type (or overall).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeStats {
    pub count: usize,
    pub median: f64,
    pub p75: f64,
    pub total_body_bytes: u64,
    pub total_closed_bytes: u64,
}

/// Expansion ratios aggregated per type and overall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionStats {
    pub overall: Option<TypeStats>,
    pub by_type: BTreeMap<String, TypeStats>,
}

/// A closed issue paired with its on-disk byte sizes.
struct MeasuredClosure {
    issue: Issue,
    body_bytes: u64,
    result_bytes: u64,
    comments_bytes: u64,
}

impl MeasuredClosure {
    fn closed_bytes(&self) -> u64 {
        self.result_bytes + self.comments_bytes
    }

    fn total_bytes(&self) -> u64 {
        self.body_bytes + self.result_bytes + self.comments_bytes
    }
}

impl<C: Clock> WalkStore<C> {
    /// Closed context newer than `since` (strict inequality).
    pub fn new_context_since(&self, since: DateTime<Utc>) -> NewContext {
        let mut measured: Vec<MeasuredClosure> = self
            .measured_closures()
            .into_iter()
            .filter(|m| {
                m.issue
                    .closure
                    .as_ref()
                    .is_some_and(|c| c.closed_at > since)
            })
            .collect();
        measured.sort_by_key(|m| m.issue.closure.as_ref().map(|c| c.closed_at));

        let mut context = NewContext::default();
        for m in &measured {
            context.bytes += m.closed_bytes();
            if let Some(closure) = &m.issue.closure {
                if closure.signal != Signal::Routine {
                    context.signals.push(closure.signal);
                }
            }
            context.issues.push(m.issue.slug.clone());
        }
        context
    }

    /// Walk closed issues newest-first, accumulating until `min_bytes` of
    /// body + result + comment content, grouped by epoch (newest first).
    pub fn recent_closed(&self, min_bytes: u64) -> Vec<RecentEpochGroup> {
        let mut measured = self.measured_closures();
        // Newest first; epoch breaks closed_at ties
        measured.sort_by_key(|m| {
            m.issue
                .closure
                .as_ref()
                .map(|c| (std::cmp::Reverse(c.closed_at), std::cmp::Reverse(c.epoch)))
        });

        let mut taken = Vec::new();
        let mut cumulative = 0u64;
        for m in measured {
            if m.issue.closure.is_none() {
                continue;
            }
            cumulative += m.total_bytes();
            taken.push(m);
            if cumulative >= min_bytes {
                break;
            }
        }

        let mut groups: Vec<RecentEpochGroup> = Vec::new();
        for m in taken {
            let Some(closure) = m.issue.closure.clone() else {
                continue;
            };
            let entry = RecentClosed {
                slug: m.issue.slug.clone(),
                title: m.issue.meta.title.clone(),
                signal: closure.signal,
                closed_at: closure.closed_at,
                bytes: m.total_bytes(),
                parents: m.issue.derived_from.iter().cloned().collect(),
            };
            match groups.iter_mut().find(|g| g.epoch == closure.epoch) {
                Some(group) => group.issues.push(entry),
                None => groups.push(RecentEpochGroup {
                    epoch: closure.epoch,
                    issues: vec![entry],
                }),
            }
        }
        groups
    }

    /// Expansion ratio statistics per type and overall.
    ///
    /// Issues with an empty body are excluded (the ratio is undefined).
    pub fn expansion_stats(&self) -> ExpansionStats {
        let measured: Vec<MeasuredClosure> = self
            .measured_closures()
            .into_iter()
            .filter(|m| m.body_bytes > 0)
            .collect();

        if measured.is_empty() {
            return ExpansionStats::default();
        }

        let mut by_type: BTreeMap<String, Vec<&MeasuredClosure>> = BTreeMap::new();
        for m in &measured {
            by_type.entry(m.issue.issue_type()).or_default().push(m);
        }

        ExpansionStats {
            overall: Some(type_stats(&measured.iter().collect::<Vec<_>>())),
            by_type: by_type
                .into_iter()
                .map(|(issue_type, group)| (issue_type, type_stats(&group)))
                .collect(),
        }
    }

    fn measured_closures(&self) -> Vec<MeasuredClosure> {
        self.scan(IssueStatus::Closed)
            .into_iter()
            .map(|issue| {
                let dir = self.closed_issue_dir(issue.slug.as_str());
                MeasuredClosure {
                    body_bytes: issue.body.len() as u64,
                    result_bytes: file_len(&dir.join(paths::RESULT_FILE)),
                    comments_bytes: file_len(&dir.join(paths::COMMENTS_FILE)),
                    issue,
                }
            })
            .collect()
    }
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn type_stats(group: &[&MeasuredClosure]) -> TypeStats {
    let mut ratios: Vec<f64> = group
        .iter()
        .map(|m| m.closed_bytes() as f64 / m.body_bytes as f64)
        .collect();
    ratios.sort_by(f64::total_cmp);

    TypeStats {
        count: group.len(),
        median: percentile(&ratios, 0.5),
        p75: percentile(&ratios, 0.75),
        total_body_bytes: group.iter().map(|m| m.body_bytes).sum(),
        total_closed_bytes: group.iter().map(|m| m.closed_bytes()).sum(),
    }
}

/// Nearest-rank percentile over a sorted slice, with the conventional
/// two-element average for an even-length median.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    if (q - 0.5).abs() < f64::EPSILON && n % 2 == 0 {
        return (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0;
    }
    let rank = ((q * n as f64).ceil() as usize).clamp(1, n);
    sorted[rank - 1]
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

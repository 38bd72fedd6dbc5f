// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memories and proposals: key/text facts with epoch lifetimes.

use serde::{Deserialize, Serialize};

/// A fact the planner propagates into worker prompts while it is alive.
///
/// Alive at epoch E iff `alive_from <= E` and `alive_until` is unset or
/// `E <= alive_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub key: String,
    pub text: String,
    pub alive_from: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive_until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed_by: Option<String>,
}

impl Memory {
    pub fn alive_at(&self, epoch: u64) -> bool {
        self.alive_from <= epoch && self.alive_until.is_none_or(|until| epoch <= until)
    }

    /// Dead, and died within `window` epochs of `epoch`.
    pub fn recently_dead_at(&self, epoch: u64, window: u64) -> bool {
        match self.alive_until {
            Some(until) => until < epoch && epoch - until <= window,
            None => false,
        }
    }
}

/// A memory candidate awaiting the planner's accept/discard decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub key: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_by: Option<String>,
    pub epoch: u64,
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

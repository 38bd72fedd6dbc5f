// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memories and proposals: JSON files read-modify-written under the walk lock.

use crate::error::StoreError;
use crate::paths;
use crate::walk::WalkStore;
use std::path::Path;
use wk_core::{Clock, Memory, Proposal};

impl<C: Clock> WalkStore<C> {
    /// All memories, alive and dead. An absent file is an empty list.
    pub fn memories(&self) -> Result<Vec<Memory>, StoreError> {
        read_json_list(&self.root().join(paths::MEMORIES_FILE))
    }

    /// Memories alive at the given epoch.
    pub fn alive_memories(&self, epoch: u64) -> Result<Vec<Memory>, StoreError> {
        Ok(self
            .memories()?
            .into_iter()
            .filter(|memory| memory.alive_at(epoch))
            .collect())
    }

    /// All pending proposals.
    pub fn proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        read_json_list(&self.root().join(paths::PROPOSALS_FILE))
    }

    /// Record a memory proposal for the next planning round.
    pub fn propose_memory(
        &self,
        key: &str,
        text: &str,
        proposed_by: Option<String>,
    ) -> Result<Proposal, StoreError> {
        let _lock = self.lock()?;
        let proposal = Proposal {
            key: key.to_string(),
            text: text.to_string(),
            proposed_by,
            epoch: self.current_epoch().unwrap_or(1),
        };
        let mut proposals = self.proposals()?;
        proposals.retain(|p| p.key != key);
        proposals.push(proposal.clone());
        write_json_list(&self.root().join(paths::PROPOSALS_FILE), &proposals)?;
        tracing::debug!(key, "memory proposed");
        Ok(proposal)
    }

    /// Accept a pending proposal: it becomes a memory alive from the
    /// current epoch and leaves the proposal list.
    pub fn accept_proposal(
        &self,
        key: &str,
        accepted_by: Option<&str>,
    ) -> Result<Memory, StoreError> {
        let _lock = self.lock()?;
        let mut proposals = self.proposals()?;
        let index = proposals
            .iter()
            .position(|p| p.key == key)
            .ok_or_else(|| StoreError::ProposalNotFound(key.to_string()))?;
        let proposal = proposals.remove(index);
        write_json_list(&self.root().join(paths::PROPOSALS_FILE), &proposals)?;

        let memory = Memory {
            key: proposal.key,
            text: proposal.text,
            alive_from: self.current_epoch().unwrap_or(1),
            alive_until: None,
            created_by: accepted_by
                .map(String::from)
                .or(proposal.proposed_by),
            killed_by: None,
        };
        let mut memories = self.memories()?;
        memories.push(memory.clone());
        write_json_list(&self.root().join(paths::MEMORIES_FILE), &memories)?;
        tracing::info!(key = %memory.key, "proposal accepted into memory");
        Ok(memory)
    }

    /// Drop a pending proposal without creating a memory.
    pub fn discard_proposal(&self, key: &str) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let mut proposals = self.proposals()?;
        let before = proposals.len();
        proposals.retain(|p| p.key != key);
        if proposals.len() == before {
            return Err(StoreError::ProposalNotFound(key.to_string()));
        }
        write_json_list(&self.root().join(paths::PROPOSALS_FILE), &proposals)?;
        Ok(())
    }

    /// Synthesize a memory directly (planner-authored, no proposal).
    pub fn add_memory(
        &self,
        key: &str,
        text: &str,
        created_by: Option<String>,
    ) -> Result<Memory, StoreError> {
        let _lock = self.lock()?;
        let memory = Memory {
            key: key.to_string(),
            text: text.to_string(),
            alive_from: self.current_epoch().unwrap_or(1),
            alive_until: None,
            created_by,
            killed_by: None,
        };
        let mut memories = self.memories()?;
        memories.push(memory.clone());
        write_json_list(&self.root().join(paths::MEMORIES_FILE), &memories)?;
        Ok(memory)
    }

    /// End a memory's life at the current epoch.
    pub fn forget_memory(&self, key: &str, killed_by: Option<&str>) -> Result<Memory, StoreError> {
        let _lock = self.lock()?;
        let epoch = self.current_epoch().unwrap_or(1);
        let mut memories = self.memories()?;
        let memory = memories
            .iter_mut()
            .rev()
            .find(|memory| memory.key == key && memory.alive_at(epoch))
            .ok_or_else(|| StoreError::MemoryNotFound(key.to_string()))?;
        memory.alive_until = Some(epoch);
        memory.killed_by = killed_by.map(String::from);
        let updated = memory.clone();
        write_json_list(&self.root().join(paths::MEMORIES_FILE), &memories)?;
        tracing::info!(key, epoch, "memory forgotten");
        Ok(updated)
    }
}

fn read_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&text).map_err(|e| StoreError::malformed(path, e.to_string()))
}

fn write_json_list<T: serde::Serialize>(path: &Path, list: &[T]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(list)
        .map_err(|e| StoreError::malformed(path, e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
#[path = "memories_tests.rs"]
mod tests;

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Single-writer store for the published inventory snapshot.
//!
//! The refresher builds a complete [`PublishedSnapshot`] off to the side and
//! swaps it in as one `Arc`. Readers hold on to whichever `Arc` they loaded,
//! so a repository list is always paired with the workflow catalog and the
//! per-organization inventory it was published with.

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use tokio::sync::watch;

use crate::{catalog::WorkflowCatalog, inventory::InventorySnapshot};

/// Inventory state shared with sibling pollers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct PublishedSnapshot
{
    /// Monotonic publish counter; `0` is the empty initial snapshot.
    pub generation:    u64,
    /// Repositories to poll, each with at least one workflow.
    pub repositories:  Vec<String,>,
    /// Workflows of every repository in `repositories`.
    pub workflows:     WorkflowCatalog,
    /// Inventory used for each organization in this cycle.
    pub repos_per_org: BTreeMap<String, Arc<InventorySnapshot,>,>,
}

impl PublishedSnapshot
{
    /// Builds an unpublished snapshot; the store assigns the generation.
    pub fn new(
        repositories: Vec<String,>,
        workflows: WorkflowCatalog,
        repos_per_org: BTreeMap<String, Arc<InventorySnapshot,>,>,
    ) -> Self
    {
        Self {
            generation: 0,
            repositories,
            workflows,
            repos_per_org,
        }
    }
}

/// Write side of the snapshot. Exactly one exists per refresher.
#[derive(Debug,)]
pub struct SnapshotStore
{
    sender: watch::Sender<Arc<PublishedSnapshot,>,>,
}

impl Default for SnapshotStore
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl SnapshotStore
{
    /// Creates a store holding the empty generation-0 snapshot.
    pub fn new() -> Self
    {
        let (sender, _receiver,) = watch::channel(Arc::new(PublishedSnapshot::default(),),);
        Self {
            sender,
        }
    }

    /// Returns a new reader handle.
    pub fn reader(&self,) -> SnapshotReader
    {
        SnapshotReader {
            receiver: self.sender.subscribe(),
        }
    }

    /// Currently published snapshot.
    pub fn current(&self,) -> Arc<PublishedSnapshot,>
    {
        self.sender.borrow().clone()
    }

    /// Replaces the published snapshot wholesale and returns its generation.
    pub fn publish(&self, mut snapshot: PublishedSnapshot,) -> u64
    {
        let generation = self.sender.borrow().generation + 1;
        snapshot.generation = generation;
        self.sender.send_replace(Arc::new(snapshot,),);
        generation
    }
}

/// Read side of the snapshot. Cheap to clone.
#[derive(Debug, Clone,)]
pub struct SnapshotReader
{
    receiver: watch::Receiver<Arc<PublishedSnapshot,>,>,
}

impl SnapshotReader
{
    /// Loads the latest published snapshot.
    pub fn load(&self,) -> Arc<PublishedSnapshot,>
    {
        self.receiver.borrow().clone()
    }

    /// Waits for the next publish and returns it.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self,) -> Option<Arc<PublishedSnapshot,>,>
    {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone(),)
    }
}

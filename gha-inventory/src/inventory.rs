// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-organization repository inventory with count-based reuse.
//!
//! A full listing of an organization's repositories is expensive, so the
//! cached [`InventorySnapshot`] is kept as long as a single
//! `GET /orgs/{org}` call reports the same repository count. The count is an
//! approximation: deleting one repository and creating another between two
//! cycles preserves it and the stale snapshot is kept. The heuristic lives
//! behind [`RefreshPolicy`] so it can be replaced without touching the
//! scheduler.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    api::RepositoryRecord,
    client::RateLimitedClient,
    error::Error,
    paginate::drain_pages,
};

/// Classification of a repository for polling purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryClass
{
    /// Polled for workflows.
    Active,
    /// Archived or disabled.
    Inactive,
    /// Fork, whatever its archival state.
    Forked,
}

impl RepositoryClass
{
    /// Classifies a repository by its fork, archived and disabled flags.
    pub fn of(record: &RepositoryRecord,) -> Self
    {
        if record.fork {
            Self::Forked
        } else if record.archived || record.disabled {
            Self::Inactive
        } else {
            Self::Active
        }
    }
}

/// Classified repositories of one organization as of the last full listing.
///
/// `count` always equals `active.len() + inactive.len()`; forks do not
/// contribute to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct InventorySnapshot
{
    /// Repositories eligible for workflow polling.
    pub active:   Vec<String,>,
    /// Archived or disabled repositories.
    pub inactive: Vec<String,>,
    /// Forked repositories.
    pub forks:    Vec<String,>,
    /// Number of active and inactive repositories.
    pub count:    u64,
}

impl InventorySnapshot
{
    /// Builds a snapshot by classifying `records` in listing order.
    pub fn from_records<'a, I,>(records: I,) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryRecord,>,
    {
        let mut snapshot = Self::default();
        for record in records {
            let name = record.full_name.clone();
            match RepositoryClass::of(record,) {
                RepositoryClass::Forked => {
                    debug!("Partitioning out fork repo {}", name);
                    snapshot.forks.push(name,);
                }
                RepositoryClass::Inactive => {
                    debug!("Skipping archived or disabled repo {}", name);
                    snapshot.inactive.push(name,);
                }
                RepositoryClass::Active => snapshot.active.push(name,),
            }
        }
        snapshot.count = (snapshot.active.len() + snapshot.inactive.len()) as u64;
        snapshot
    }
}

/// Decides whether an organization's inventory must be listed again.
pub trait RefreshPolicy: Send + Sync
{
    /// `current_count` is `None` when no probe was made or the probe failed.
    fn should_refresh(
        &self,
        org: &str,
        current_count: Option<u64,>,
        cached: Option<&InventorySnapshot,>,
    ) -> bool;
}

/// Refreshes on a cache miss or when the probed count differs from the
/// cached one. A failed probe keeps the cached snapshot.
#[derive(Debug, Clone, Copy, Default,)]
pub struct CountRefreshPolicy;

impl RefreshPolicy for CountRefreshPolicy
{
    fn should_refresh(
        &self,
        org: &str,
        current_count: Option<u64,>,
        cached: Option<&InventorySnapshot,>,
    ) -> bool
    {
        let Some(cached,) = cached else {
            info!("Cache miss for repo count of org \"{}\"", org);
            return true;
        };

        match current_count {
            Some(count,) if count != cached.count => {
                info!(
                    "Repo count of org \"{}\" went from {} to {}, refreshing inventory",
                    org, cached.count, count
                );
                true
            }
            Some(count,) => {
                debug!("Repo count of org \"{}\" unchanged ({}), reusing inventory", org, count);
                false
            }
            None => {
                warn!("Repo count of org \"{}\" unavailable, reusing inventory", org);
                false
            }
        }
    }
}

/// How a [`ResolvedInventory`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Resolution
{
    /// A complete listing was fetched.
    Fresh,
    /// The cached snapshot was kept because the policy saw no drift.
    Reused,
    /// The listing failed; the cached snapshot was kept.
    Stale,
    /// The listing failed without a cached snapshot; the repositories
    /// gathered before the failure were classified.
    Partial,
}

/// Snapshot selected for an organization in the current cycle.
#[derive(Debug, Clone,)]
pub struct ResolvedInventory
{
    /// Snapshot to publish.
    pub snapshot:   Arc<InventorySnapshot,>,
    /// Origin of the snapshot.
    pub resolution: Resolution,
}

/// Outcome of a full repository listing.
#[derive(Debug,)]
pub struct RefreshedInventory
{
    /// Classification of every repository fetched.
    pub snapshot:    InventorySnapshot,
    /// Error that interrupted the listing, if any.
    pub interrupted: Option<Error,>,
}

/// Repository inventory lookups for organizations.
#[derive(Clone,)]
pub struct InventoryCache
{
    client: RateLimitedClient,
    policy: Arc<dyn RefreshPolicy,>,
}

impl InventoryCache
{
    /// Creates a cache using [`CountRefreshPolicy`].
    pub fn new(client: RateLimitedClient,) -> Self
    {
        Self {
            client, policy: Arc::new(CountRefreshPolicy,),
        }
    }

    /// Replaces the refresh policy.
    pub fn with_policy(mut self, policy: Arc<dyn RefreshPolicy,>,) -> Self
    {
        self.policy = policy;
        self
    }

    /// Probes the repository count of `org` with a single call.
    ///
    /// # Errors
    ///
    /// Returns the transient error reported by the client.
    pub async fn count_repositories(&self, org: &str,) -> Result<u64, Error,>
    {
        let response = self.client.get_organization(org,).await?;
        let counts = response.value;
        debug!(
            "Organization {}: public_repos={} total_private_repos={:?} owned_private_repos={:?}",
            org, counts.public_repos, counts.total_private_repos, counts.owned_private_repos
        );
        Ok(counts.repository_count(),)
    }

    /// Lists and classifies every repository of `org`.
    pub async fn refresh_repositories(&self, org: &str,) -> RefreshedInventory
    {
        let drained = drain_pages("Repositories.ListByOrg", |page| {
            self.client.list_org_repositories(org, page,)
        },)
        .await;

        let snapshot = InventorySnapshot::from_records(&drained.items,);
        info!(
            "Inventory of org \"{}\": {} active, {} inactive, {} forks",
            org,
            snapshot.active.len(),
            snapshot.inactive.len(),
            snapshot.forks.len()
        );

        RefreshedInventory {
            snapshot,
            interrupted: drained.interrupted,
        }
    }

    /// Returns the snapshot to use for `org` this cycle.
    ///
    /// The count is only probed when a cached snapshot exists. Failures never
    /// propagate: a failed probe or listing falls back to `cached`.
    pub async fn resolve(
        &self,
        org: &str,
        cached: Option<Arc<InventorySnapshot,>,>,
    ) -> ResolvedInventory
    {
        let current_count = match cached {
            None => None,
            Some(_,) => match self.count_repositories(org,).await {
                Ok(count,) => Some(count,),
                Err(error,) => {
                    warn!("Get error for {}: {}", org, error);
                    None
                }
            },
        };

        // A policy declining to refresh without a cached snapshot still lists.
        if !self.policy.should_refresh(org, current_count, cached.as_deref(),)
            && let Some(cached,) = cached.as_ref()
        {
            return ResolvedInventory {
                snapshot: cached.clone(), resolution: Resolution::Reused,
            };
        }

        let refreshed = self.refresh_repositories(org,).await;
        match (refreshed.interrupted, cached,) {
            (None, _,) => ResolvedInventory {
                snapshot:   Arc::new(refreshed.snapshot,),
                resolution: Resolution::Fresh,
            },
            (Some(error,), Some(cached,),) => {
                warn!("ListByOrg error for {}: {}; keeping previous inventory", org, error);
                ResolvedInventory {
                    snapshot: cached, resolution: Resolution::Stale,
                }
            }
            (Some(error,), None,) => {
                warn!("ListByOrg error for {}: {}; publishing partial inventory", org, error);
                ResolvedInventory {
                    snapshot:   Arc::new(refreshed.snapshot,),
                    resolution: Resolution::Partial,
                }
            }
        }
    }
}

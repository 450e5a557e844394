// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Periodic inventory and workflow catalog refresher.
//!
//! Each cycle runs strictly in order: resolve the target repositories (static
//! list, or per-organization inventory), rebuild the workflow catalog, publish
//! the complete snapshot in one swap, then sleep for the configured interval
//! times [`CYCLE_MULTIPLIER`]. No per-entity failure ends a cycle and no cycle
//! failure ends the loop.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    catalog::build_catalog,
    client::RateLimitedClient,
    config::ExporterConfig,
    inventory::{InventoryCache, InventorySnapshot, RefreshPolicy, Resolution},
    paginate::drain_pages,
    snapshot::{PublishedSnapshot, SnapshotReader, SnapshotStore},
};

/// Factor applied to the base refresh interval between inventory cycles.
///
/// Finer-grained pollers share the API quota and run at the base interval.
pub const CYCLE_MULTIPLIER: u32 = 5;

/// Summary of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct CycleReport
{
    /// Generation of the snapshot published by the cycle.
    pub generation:    u64,
    /// Repositories considered before workflow filtering.
    pub targets:       usize,
    /// Repositories published, all with at least one workflow.
    pub published:     usize,
    /// How each organization's inventory was obtained.
    pub organizations: Vec<(String, Resolution,),>,
}

/// Drives the inventory refresh cycle and owns the snapshot store.
pub struct RefreshScheduler
{
    client:        RateLimitedClient,
    inventory:     InventoryCache,
    store:         SnapshotStore,
    organizations: Vec<String,>,
    repositories:  Vec<String,>,
    interval:      Duration,
}

impl RefreshScheduler
{
    /// Creates a scheduler for the scope described by `config`.
    pub fn new(client: RateLimitedClient, config: &ExporterConfig,) -> Self
    {
        Self {
            inventory: InventoryCache::new(client.clone(),),
            client,
            store: SnapshotStore::new(),
            organizations: config.github.organizations.clone(),
            repositories: config.github.repositories.clone(),
            interval: config.refresh_interval(),
        }
    }

    /// Replaces the inventory refresh policy.
    pub fn with_refresh_policy(mut self, policy: Arc<dyn RefreshPolicy,>,) -> Self
    {
        self.inventory = self.inventory.with_policy(policy,);
        self
    }

    /// Returns a reader of the published snapshot.
    pub fn reader(&self,) -> SnapshotReader
    {
        self.store.reader()
    }

    /// Sleep between two cycles, saturating at [`Duration::MAX`].
    pub fn cycle_interval(&self,) -> Duration
    {
        self.interval.saturating_mul(CYCLE_MULTIPLIER,)
    }

    /// Runs cycles forever, sleeping [`Self::cycle_interval`] between them.
    pub async fn run(self,)
    {
        info!(
            "Starting inventory refresher: {} organizations, {} static repositories, every {:?}",
            self.organizations.len(),
            self.repositories.len(),
            self.cycle_interval()
        );
        loop {
            self.run_cycle().await;
            self.client.clock().sleep(self.cycle_interval(),).await;
        }
    }

    /// Executes one cycle and publishes its snapshot.
    pub async fn run_cycle(&self,) -> CycleReport
    {
        let previous = self.store.current();
        let mut organizations = Vec::new();

        let (targets, repos_per_org,) = if self.repositories.is_empty() {
            let mut targets = Vec::new();
            let mut repos_per_org = BTreeMap::new();
            for org in self.target_organizations(&previous,).await {
                let cached = previous.repos_per_org.get(&org,).cloned();
                let resolved = self.inventory.resolve(&org, cached,).await;
                targets.extend(resolved.snapshot.active.iter().cloned(),);
                organizations.push((org.clone(), resolved.resolution,),);
                repos_per_org.insert(org, resolved.snapshot,);
            }
            (targets, repos_per_org,)
        } else {
            debug!("Using {} statically configured repositories", self.repositories.len());
            (self.repositories.clone(), BTreeMap::<String, Arc<InventorySnapshot,>,>::new(),)
        };

        let build = build_catalog(&self.client, &targets,).await;
        let published = build.repositories.len();
        let generation =
            self.store.publish(PublishedSnapshot::new(build.repositories, build.workflows, repos_per_org,),);

        info!(
            "Published inventory generation {}: {} of {} repositories have workflows",
            generation,
            published,
            targets.len()
        );

        CycleReport {
            generation,
            targets: targets.len(),
            published,
            organizations,
        }
    }

    /// Organizations to inventory this cycle.
    ///
    /// Without configured organizations the authenticated account's
    /// organizations are listed; if that listing fails the organizations of
    /// the previous snapshot are reused.
    async fn target_organizations(&self, previous: &PublishedSnapshot,) -> Vec<String,>
    {
        if !self.organizations.is_empty() {
            return self.organizations.clone();
        }

        let drained =
            drain_pages("Organizations.List", |page| self.client.list_organizations(page,),).await;
        match drained.interrupted {
            None => {
                let logins: Vec<String,> =
                    drained.items.into_iter().map(|organization| organization.login,).collect();
                debug!("Discovered {} organizations", logins.len());
                logins
            }
            Some(error,) => {
                warn!("Organization discovery failed: {}; reusing previous organizations", error);
                previous.repos_per_org.keys().cloned().collect()
            }
        }
    }
}

impl std::fmt::Debug for RefreshScheduler
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("RefreshScheduler",)
            .field("organizations", &self.organizations,)
            .field("repositories", &self.repositories,)
            .field("interval", &self.interval,)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests
{
    use std::time::UNIX_EPOCH;

    use super::*;
    use crate::{
        config::Overrides,
        error::Error,
        test_support::{RecordingClock, ScriptedApi, repo, workflow},
    };

    fn scheduler(api: &Arc<ScriptedApi,>, overrides: Overrides,) -> RefreshScheduler
    {
        let config = ExporterConfig::default().apply(overrides,);
        let client = RateLimitedClient::new(api.clone(),)
            .with_clock(Arc::new(RecordingClock::at(UNIX_EPOCH,),),)
            .with_per_page(2,);
        RefreshScheduler::new(client, &config,)
    }

    fn organizations(names: &[&str],) -> Overrides
    {
        Overrides {
            organizations: Some(names.iter().map(|name| (*name).to_owned(),).collect(),),
            ..Overrides::default()
        }
    }

    #[tokio::test]
    async fn count_preserving_swap_reuses_first_inventory()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_repositories("acme", vec![
            repo("acme/api", false, false, false,),
            repo("acme/web", false, false, false,),
            repo("acme/cli", false, false, false,),
            repo("acme/legacy", false, true, false,),
        ],);
        for name in ["acme/api", "acme/web", "acme/cli", "acme/mobile"] {
            api.set_workflows(name, vec![workflow(1, "ci",)],);
        }
        let scheduler = scheduler(&api, organizations(&["acme"],),);
        let reader = scheduler.reader();

        let first = scheduler.run_cycle().await;
        let cycle_one = reader.load();
        assert_eq!(first.organizations, vec![("acme".to_owned(), Resolution::Fresh)]);
        assert_eq!(cycle_one.repos_per_org["acme"].count, 4);
        assert_eq!(cycle_one.repositories, vec!["acme/api", "acme/web", "acme/cli"]);

        // acme/cli is deleted and acme/mobile created: the count stays at 4.
        api.set_repositories("acme", vec![
            repo("acme/api", false, false, false,),
            repo("acme/web", false, false, false,),
            repo("acme/mobile", false, false, false,),
            repo("acme/legacy", false, true, false,),
        ],);

        let second = scheduler.run_cycle().await;
        let cycle_two = reader.load();
        assert_eq!(second.organizations, vec![("acme".to_owned(), Resolution::Reused)]);
        assert_eq!(cycle_two.repositories, vec!["acme/api", "acme/web", "acme/cli"]);
        assert!(!cycle_two.repositories.contains(&"acme/mobile".to_owned()));
        assert!(Arc::ptr_eq(&cycle_one.repos_per_org["acme"], &cycle_two.repos_per_org["acme"]));
        assert_eq!(api.calls("orgs/acme/repos"), 2);
        assert_eq!(api.calls("orgs/acme"), 1);
    }

    #[tokio::test]
    async fn repositories_without_workflows_are_not_published()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_repositories("acme", vec![
            repo("acme/api", false, false, false,),
            repo("acme/docs", false, false, false,),
        ],);
        api.set_workflows("acme/api", vec![workflow(1, "ci",)],);
        let scheduler = scheduler(&api, organizations(&["acme"],),);

        let report = scheduler.run_cycle().await;
        let snapshot = scheduler.reader().load();

        assert_eq!(report.targets, 2);
        assert_eq!(report.published, 1);
        assert_eq!(snapshot.repositories, vec!["acme/api"]);
        assert!(!snapshot.workflows.contains_key("acme/docs"));
        assert_eq!(snapshot.repos_per_org["acme"].active, vec!["acme/api", "acme/docs"]);
    }

    #[tokio::test]
    async fn static_repositories_bypass_inventory()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_workflows("acme/api", vec![workflow(1, "ci",)],);
        api.set_workflows("globex/site", vec![workflow(2, "deploy",)],);
        let scheduler = scheduler(&api, Overrides {
            organizations: Some(vec!["acme".to_owned()],),
            repositories: Some(vec!["acme/api".to_owned(), "globex/site".to_owned()],),
            ..Overrides::default()
        },);

        let report = scheduler.run_cycle().await;
        let snapshot = scheduler.reader().load();

        assert!(report.organizations.is_empty());
        assert!(snapshot.repos_per_org.is_empty());
        assert_eq!(snapshot.repositories, vec!["acme/api", "globex/site"]);
        assert_eq!(api.calls("orgs/acme"), 0);
        assert_eq!(api.calls("orgs/acme/repos"), 0);
    }

    #[tokio::test]
    async fn failing_organization_does_not_abort_cycle()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_repositories("acme", vec![repo("acme/api", false, false, false,)],);
        api.set_workflows("acme/api", vec![workflow(1, "ci",)],);
        api.fail_next("orgs/globex/repos", Error::fetch("Repositories.ListByOrg", "HTTP 404",),);
        let scheduler = scheduler(&api, organizations(&["globex", "acme"],),);

        let report = scheduler.run_cycle().await;
        let snapshot = scheduler.reader().load();

        assert_eq!(report.organizations, vec![
            ("globex".to_owned(), Resolution::Partial),
            ("acme".to_owned(), Resolution::Fresh),
        ]);
        assert_eq!(snapshot.repositories, vec!["acme/api"]);
        assert_eq!(snapshot.repos_per_org["globex"].count, 0);
    }

    #[tokio::test]
    async fn organizations_are_discovered_when_none_configured()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_organizations(&["acme", "globex", "initech"],);
        api.set_repositories("globex", vec![repo("globex/site", false, false, false,)],);
        api.set_workflows("globex/site", vec![workflow(5, "pages",)],);
        let scheduler = scheduler(&api, Overrides::default(),);

        let report = scheduler.run_cycle().await;

        assert_eq!(report.organizations.len(), 3);
        assert_eq!(api.calls("user/orgs"), 2);
        assert_eq!(scheduler.reader().load().repositories, vec!["globex/site"]);
    }

    #[tokio::test]
    async fn failed_discovery_reuses_previous_organizations()
    {
        let api = Arc::new(ScriptedApi::new(),);
        api.set_organizations(&["acme"],);
        api.set_repositories("acme", vec![repo("acme/api", false, false, false,)],);
        api.set_workflows("acme/api", vec![workflow(1, "ci",)],);
        let scheduler = scheduler(&api, Overrides::default(),);
        scheduler.run_cycle().await;

        api.fail_next("user/orgs", Error::fetch("Organizations.List", "HTTP 502",),);
        let report = scheduler.run_cycle().await;

        assert_eq!(report.organizations, vec![("acme".to_owned(), Resolution::Reused)]);
        assert_eq!(scheduler.reader().load().repositories, vec!["acme/api"]);
    }

    #[test]
    fn cycle_interval_saturates_instead_of_overflowing()
    {
        let api = Arc::new(ScriptedApi::new(),);
        let scheduler = scheduler(&api, Overrides {
            refresh: Some(u64::MAX / 4,), ..Overrides::default()
        },);

        assert_eq!(scheduler.cycle_interval(), Duration::MAX);
    }

    #[tokio::test]
    async fn run_sleeps_scaled_interval_between_cycles()
    {
        let api = Arc::new(ScriptedApi::new(),);
        let clock = Arc::new(RecordingClock::at(UNIX_EPOCH,),);
        let config = ExporterConfig::default().apply(Overrides {
            repositories: Some(vec!["acme/api".to_owned()],),
            refresh: Some(12,),
            ..Overrides::default()
        },);
        api.set_workflows("acme/api", vec![workflow(1, "ci",)],);
        let scheduler =
            RefreshScheduler::new(RateLimitedClient::new(api.clone(),).with_clock(clock.clone(),), &config,);
        assert_eq!(scheduler.cycle_interval(), Duration::from_secs(60));

        let mut reader = scheduler.reader();
        let handle = tokio::spawn(scheduler.run(),);
        while reader.changed().await.expect("refresher alive",).generation < 3 {}
        handle.abort();

        assert!(clock.sleeps().len() >= 2);
        assert!(clock.sleeps().iter().all(|sleep| *sleep == Duration::from_secs(60)));
    }
}

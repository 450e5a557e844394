// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rate-limit aware wrapper around a [`GithubApi`] implementation.
//!
//! Each method forwards to the underlying API and routes the call through
//! the shared [`RetryPolicy`], so rate-limited requests are repeated verbatim
//! after the prescribed wait. Transient failures are returned untouched.

use std::sync::Arc;

use crate::{
    api::{ApiResponse, GithubApi, OrganizationCounts, OrganizationRecord, RepositoryRecord},
    catalog::Workflow,
    error::Error,
    retry::{Clock, RetryPolicy, SystemClock},
};

/// Page size requested from list endpoints unless configured otherwise.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// GitHub API client with rate-limit retries applied to every call.
#[derive(Clone,)]
pub struct RateLimitedClient
{
    api:      Arc<dyn GithubApi,>,
    clock:    Arc<dyn Clock,>,
    policy:   RetryPolicy,
    per_page: u32,
}

impl RateLimitedClient
{
    /// Wraps `api` with the default unbounded policy and the system clock.
    pub fn new(api: Arc<dyn GithubApi,>,) -> Self
    {
        Self {
            api,
            clock: Arc::new(SystemClock,),
            policy: RetryPolicy::default(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Replaces the time source used for rate-limit waits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock,>,) -> Self
    {
        self.clock = clock;
        self
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy,) -> Self
    {
        self.policy = policy;
        self
    }

    /// Overrides the page size used by list endpoints, clamped to `1..=100`.
    pub fn with_per_page(mut self, per_page: u32,) -> Self
    {
        self.per_page = per_page.clamp(1, DEFAULT_PER_PAGE,);
        self
    }

    /// Page size requested from list endpoints.
    pub fn per_page(&self,) -> u32
    {
        self.per_page
    }

    /// Time source shared with the scheduler.
    pub fn clock(&self,) -> &Arc<dyn Clock,>
    {
        &self.clock
    }

    /// `GET /orgs/{org}`.
    pub async fn get_organization(&self, org: &str,)
    -> Result<ApiResponse<OrganizationCounts,>, Error,>
    {
        self.policy
            .execute(self.clock.as_ref(), "Organizations.Get", || self.api.get_organization(org,),)
            .await
    }

    /// `GET /user/orgs`, one page.
    pub async fn list_organizations(
        &self,
        page: u32,
    ) -> Result<ApiResponse<Vec<OrganizationRecord,>,>, Error,>
    {
        self.policy
            .execute(self.clock.as_ref(), "Organizations.List", || {
                self.api.list_organizations(page, self.per_page,)
            },)
            .await
    }

    /// `GET /orgs/{org}/repos`, one page.
    pub async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
    ) -> Result<ApiResponse<Vec<RepositoryRecord,>,>, Error,>
    {
        self.policy
            .execute(self.clock.as_ref(), "Repositories.ListByOrg", || {
                self.api.list_org_repositories(org, page, self.per_page,)
            },)
            .await
    }

    /// `GET /repos/{owner}/{repo}/actions/workflows`, one page.
    pub async fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<ApiResponse<Vec<Workflow,>,>, Error,>
    {
        self.policy
            .execute(self.clock.as_ref(), "Actions.ListWorkflows", || {
                self.api.list_workflows(owner, repo, page, self.per_page,)
            },)
            .await
    }
}

impl std::fmt::Debug for RateLimitedClient
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("RateLimitedClient",)
            .field("policy", &self.policy,)
            .field("per_page", &self.per_page,)
            .finish_non_exhaustive()
    }
}

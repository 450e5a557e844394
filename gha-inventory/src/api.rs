// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Outbound GitHub API contract consumed by the refresh engine.
//!
//! Every call resolves to either an [`ApiResponse`] carrying the decoded
//! value, the next page number and the rate-limit headers of the response, or
//! an [`Error`] classified as primary rate limit, secondary rate limit, or
//! transient failure. The engine never talks to HTTP directly; it only sees
//! this trait, which keeps the inventory and catalog logic testable against a
//! scripted implementation.

use std::{
    sync::LazyLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{catalog::Workflow, error::Error};

static NEXT_LINK: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r#"<([^>]*)>\s*;\s*rel="next""#,).expect("valid link pattern",)
},);

static PAGE_PARAM: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)",).expect("valid page pattern",),);

/// Rate-limit state reported alongside a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq,)]
pub struct RateInfo
{
    /// Quota size of the current window.
    pub limit:     Option<u64,>,
    /// Calls left in the current window.
    pub remaining: Option<u64,>,
    /// Instant at which the window resets.
    pub reset:     Option<SystemTime,>,
}

impl RateInfo
{
    /// Builds rate information from raw `x-ratelimit-*` header values.
    pub fn from_headers(limit: Option<&str,>, remaining: Option<&str,>, reset: Option<&str,>,) -> Self
    {
        Self {
            limit:     limit.and_then(|value| value.trim().parse().ok(),),
            remaining: remaining.and_then(|value| value.trim().parse().ok(),),
            reset:     reset.and_then(parse_epoch_seconds,),
        }
    }

    /// Returns `true` when the server reported an empty quota.
    pub fn is_exhausted(&self,) -> bool
    {
        self.remaining == Some(0,)
    }
}

/// Decoded API response.
#[derive(Debug, Clone,)]
pub struct ApiResponse<T,>
{
    /// Decoded payload.
    pub value:     T,
    /// Next page to request, `None` once the listing is complete.
    pub next_page: Option<u32,>,
    /// Rate-limit headers observed on the response.
    pub rate:      RateInfo,
}

impl<T,> ApiResponse<T,>
{
    /// Wraps a single-object response that never paginates.
    pub fn single(value: T, rate: RateInfo,) -> Self
    {
        Self {
            value,
            next_page: None,
            rate,
        }
    }
}

/// Repository counters returned by `GET /orgs/{org}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct OrganizationCounts
{
    /// Number of public repositories.
    pub public_repos:        u64,
    /// Private repositories visible to the caller, including forks.
    #[serde(default)]
    pub total_private_repos: Option<u64,>,
    /// Private repositories owned by the organization.
    #[serde(default)]
    pub owned_private_repos: Option<u64,>,
}

impl OrganizationCounts
{
    /// Repository count used for drift detection.
    ///
    /// Private counts are only present for members of the organization;
    /// outsiders observe the public count alone.
    pub fn repository_count(&self,) -> u64
    {
        self.public_repos + self.owned_private_repos.unwrap_or(0,)
    }
}

/// Organization entry returned by `GET /user/orgs`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct OrganizationRecord
{
    /// Organization login.
    pub login: String,
}

/// Repository entry returned by `GET /orgs/{org}/repos`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct RepositoryRecord
{
    /// Identifier in `owner/name` form.
    pub full_name: String,
    /// Whether the repository is a fork.
    pub fork:      bool,
    /// Whether the repository is archived.
    pub archived:  bool,
    /// Whether the repository is disabled.
    pub disabled:  bool,
}

/// Read-only GitHub endpoints required by the engine.
///
/// Implementations report primary rate limits as [`Error::RateLimited`],
/// secondary limits as [`Error::SecondaryRateLimited`], undecodable bodies as
/// [`Error::Malformed`] and everything else as [`Error::Fetch`]. They must not
/// retry on their own; retries belong to
/// [`RateLimitedClient`](crate::client::RateLimitedClient).
#[async_trait]
pub trait GithubApi: Send + Sync
{
    /// Fetches the repository counters of an organization.
    async fn get_organization(&self, org: &str,)
    -> Result<ApiResponse<OrganizationCounts,>, Error,>;

    /// Lists organizations of the authenticated account.
    async fn list_organizations(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<OrganizationRecord,>,>, Error,>;

    /// Lists one page of repositories owned by an organization.
    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<RepositoryRecord,>,>, Error,>;

    /// Lists one page of workflows defined in a repository.
    async fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Workflow,>,>, Error,>;
}

/// Extracts the page number of the `rel="next"` entry of a `Link` header.
///
/// # Example
///
/// ```
/// use gha_inventory::next_page_from_link;
///
/// let header = r#"<https://api.github.com/organizations/1/repos?per_page=100&page=2>; rel="next", <https://api.github.com/organizations/1/repos?per_page=100&page=7>; rel="last""#;
/// assert_eq!(next_page_from_link(header), Some(2));
/// assert_eq!(next_page_from_link(""), None);
/// ```
pub fn next_page_from_link(header: &str,) -> Option<u32,>
{
    header.split(',',).find_map(|entry| {
        let target = NEXT_LINK.captures(entry,)?.get(1,)?.as_str();
        PAGE_PARAM.captures(target,)?.get(1,)?.as_str().parse().ok()
    },)
}

/// Parses a `Retry-After` header holding an integer number of seconds.
///
/// HTTP-date values are not used by GitHub and yield `None`.
pub fn parse_retry_after(value: &str,) -> Option<u64,>
{
    value.trim().parse().ok()
}

fn parse_epoch_seconds(value: &str,) -> Option<SystemTime,>
{
    let seconds: u64 = value.trim().parse().ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(seconds,),)
}

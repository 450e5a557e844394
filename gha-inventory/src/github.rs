// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! [`GithubApi`] implementation backed by Octocrab.
//!
//! Requests go through Octocrab's raw `_get` so the status code and the
//! rate-limit headers remain visible; bodies are decoded with serde_json into
//! the engine's own record types.
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    api::{
        ApiResponse, GithubApi, OrganizationCounts, OrganizationRecord, RateInfo, RepositoryRecord,
        next_page_from_link, parse_retry_after,
    },
    catalog::Workflow,
    error::Error,
};

const FORBIDDEN: u16 = 403;
const TOO_MANY_REQUESTS: u16 = 429;

/// Body of `GET /repos/{owner}/{repo}/actions/workflows`.
#[derive(Debug, Deserialize,)]
struct WorkflowPage
{
    workflows: Vec<Workflow,>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize,)]
struct ErrorBody
{
    message: String,
}

/// GitHub REST client.
#[derive(Debug, Clone,)]
pub struct OctocrabApi
{
    octocrab: Octocrab,
}

impl OctocrabApi
{
    /// Wraps an already configured Octocrab instance.
    pub fn new(octocrab: Octocrab,) -> Self
    {
        Self {
            octocrab,
        }
    }

    /// Builds a client authenticated with a personal access token.
    ///
    /// # Arguments
    ///
    /// * `token` - GitHub token used for every request
    /// * `api_url` - Optional GitHub Enterprise Server API base URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the base URL is invalid or the client
    /// cannot be built.
    pub fn from_token(token: &str, api_url: Option<&str,>,) -> Result<Self, Error,>
    {
        let mut builder = Octocrab::builder().personal_token(token,);
        if let Some(url,) = api_url {
            builder = builder.base_uri(url,).map_err(|e| Error::Client {
                message: format!("invalid API URL {url}: {e}"),
            },)?;
        }
        let octocrab = builder.build().map_err(|e| Error::Client {
            message: e.to_string(),
        },)?;
        Ok(Self::new(octocrab,),)
    }

    async fn fetch<T: DeserializeOwned,>(
        &self,
        operation: &str,
        route: String,
    ) -> Result<ApiResponse<T,>, Error,>
    {
        debug!("{} GET {}", operation, route);
        let response =
            self.octocrab._get(route,).await.map_err(|e| Error::fetch(operation, e.to_string(),),)?;

        let status = response.status().as_u16();
        let (rate, retry_after, next_page,) = {
            let headers = response.headers();
            let header = |name: &str| headers.get(name,).and_then(|value| value.to_str().ok(),);
            (
                RateInfo::from_headers(
                    header("x-ratelimit-limit",),
                    header("x-ratelimit-remaining",),
                    header("x-ratelimit-reset",),
                ),
                header("retry-after",).map(str::to_owned,),
                header("link",).and_then(next_page_from_link,),
            )
        };

        let body = self
            .octocrab
            .body_to_string(response,)
            .await
            .map_err(|e| Error::fetch(operation, e.to_string(),),)?;

        if !(200..300).contains(&status,) {
            return Err(classify_failure(operation, status, retry_after.as_deref(), &rate, &body,),);
        }

        let value =
            serde_json::from_str(&body,).map_err(|e| Error::malformed(operation, e.to_string(),),)?;
        Ok(ApiResponse {
            value,
            next_page,
            rate,
        },)
    }
}

/// Maps a non-success response to the error taxonomy.
///
/// 403 and 429 responses with an exhausted quota and a reset instant are
/// primary rate limits; the remaining 403/429 responses carrying an integer
/// `Retry-After` are secondary limits. Everything else is a transient fetch
/// failure.
pub fn classify_failure(
    operation: &str,
    status: u16,
    retry_after: Option<&str,>,
    rate: &RateInfo,
    body: &str,
) -> Error
{
    if status == FORBIDDEN || status == TOO_MANY_REQUESTS {
        if rate.is_exhausted()
            && let Some(reset,) = rate.reset
        {
            return Error::RateLimited {
                reset,
            };
        }
        if let Some(seconds,) = retry_after.and_then(parse_retry_after,) {
            return Error::SecondaryRateLimited {
                retry_after: seconds,
            };
        }
    }

    let message = serde_json::from_str::<ErrorBody,>(body,)
        .map(|error| error.message,)
        .unwrap_or_else(|_| body.chars().take(200,).collect(),);
    Error::fetch(operation, format!("HTTP {status}: {message}"),)
}

#[async_trait]
impl GithubApi for OctocrabApi
{
    async fn get_organization(&self, org: &str,)
    -> Result<ApiResponse<OrganizationCounts,>, Error,>
    {
        self.fetch("Organizations.Get", format!("/orgs/{org}"),).await
    }

    async fn list_organizations(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<OrganizationRecord,>,>, Error,>
    {
        self.fetch("Organizations.List", format!("/user/orgs?per_page={per_page}&page={page}"),)
            .await
    }

    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<RepositoryRecord,>,>, Error,>
    {
        self.fetch(
            "Repositories.ListByOrg",
            format!("/orgs/{org}/repos?type=all&per_page={per_page}&page={page}"),
        )
        .await
    }

    async fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Workflow,>,>, Error,>
    {
        let response: ApiResponse<WorkflowPage,> = self
            .fetch(
                "Actions.ListWorkflows",
                format!("/repos/{owner}/{repo}/actions/workflows?per_page={per_page}&page={page}"),
            )
            .await?;
        Ok(ApiResponse {
            value:     response.value.workflows,
            next_page: response.next_page,
            rate:      response.rate,
        },)
    }
}

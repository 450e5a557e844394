// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Scripted [`GithubApi`] and recording [`Clock`] shared by unit tests.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;

use crate::{
    api::{ApiResponse, GithubApi, OrganizationCounts, OrganizationRecord, RateInfo, RepositoryRecord},
    catalog::Workflow,
    error::Error,
    retry::Clock,
};

/// Clock whose time only moves when something sleeps on it.
///
/// Sleeping records the duration and yields to the runtime once.
pub struct RecordingClock
{
    now:    Mutex<SystemTime,>,
    sleeps: Mutex<Vec<Duration,>,>,
}

impl RecordingClock
{
    pub fn at(now: SystemTime,) -> Self
    {
        Self {
            now: Mutex::new(now,), sleeps: Mutex::new(Vec::new(),),
        }
    }

    pub fn sleeps(&self,) -> Vec<Duration,>
    {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock
{
    fn now(&self,) -> SystemTime
    {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration,)
    {
        self.sleeps.lock().unwrap().push(duration,);
        *self.now.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}

pub fn repo(full_name: &str, fork: bool, archived: bool, disabled: bool,) -> RepositoryRecord
{
    RepositoryRecord {
        full_name: full_name.to_owned(),
        fork,
        archived,
        disabled,
    }
}

pub fn workflow(id: i64, name: &str,) -> Workflow
{
    Workflow {
        id,
        node_id: format!("W_{id}"),
        name: name.to_owned(),
        path: Some(format!(".github/workflows/{name}.yml"),),
        state: "active".to_owned(),
    }
}

/// In-memory GitHub double.
///
/// Endpoints are keyed as `orgs/{org}`, `orgs/{org}/repos`,
/// `repos/{owner}/{repo}/workflows` and `user/orgs`. Each call increments the
/// counter of its key; errors can be scheduled for a specific call number.
#[derive(Default,)]
pub struct ScriptedApi
{
    organizations: Mutex<Vec<String,>,>,
    repositories:  Mutex<HashMap<String, Vec<RepositoryRecord,>,>,>,
    counts:        Mutex<HashMap<String, u64,>,>,
    workflows:     Mutex<HashMap<String, Vec<Workflow,>,>,>,
    calls:         Mutex<HashMap<String, u32,>,>,
    failures:      Mutex<HashMap<(String, u32,), Error,>,>,
}

impl ScriptedApi
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn set_organizations(&self, logins: &[&str],)
    {
        *self.organizations.lock().unwrap() = logins.iter().map(|login| (*login).to_owned(),).collect();
    }

    pub fn set_repositories(&self, org: &str, repositories: Vec<RepositoryRecord,>,)
    {
        self.repositories.lock().unwrap().insert(org.to_owned(), repositories,);
    }

    /// Overrides the count reported by `GET /orgs/{org}`.
    ///
    /// Without an override the count is the number of listed repositories.
    pub fn set_count(&self, org: &str, count: u64,)
    {
        self.counts.lock().unwrap().insert(org.to_owned(), count,);
    }

    pub fn set_workflows(&self, repository: &str, workflows: Vec<Workflow,>,)
    {
        self.workflows.lock().unwrap().insert(repository.to_owned(), workflows,);
    }

    /// Makes the next call to `key` fail with `error`.
    pub fn fail_next(&self, key: &str, error: Error,)
    {
        let next = self.calls(key,) + 1;
        self.fail_on_call(key, next, error,);
    }

    /// Makes the `call`-th call (1-based, counted over the whole test) to
    /// `key` fail with `error`.
    pub fn fail_on_call(&self, key: &str, call: u32, error: Error,)
    {
        self.failures.lock().unwrap().insert((key.to_owned(), call,), error,);
    }

    pub fn calls(&self, key: &str,) -> u32
    {
        self.calls.lock().unwrap().get(key,).copied().unwrap_or(0,)
    }

    fn record(&self, key: &str,) -> Result<(), Error,>
    {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let counter = calls.entry(key.to_owned(),).or_insert(0,);
            *counter += 1;
            *counter
        };
        match self.failures.lock().unwrap().remove(&(key.to_owned(), call,),) {
            Some(error,) => Err(error,),
            None => Ok((),),
        }
    }
}

fn paged<T: Clone,>(items: &[T], page: u32, per_page: u32,) -> ApiResponse<Vec<T,>,>
{
    let page = page.max(1,) as usize;
    let per_page = per_page.max(1,) as usize;
    let start = ((page - 1) * per_page).min(items.len(),);
    let end = (start + per_page).min(items.len(),);
    let next_page = if end < items.len() { Some(page as u32 + 1,) } else { None };

    ApiResponse {
        value: items[start..end].to_vec(),
        next_page,
        rate: RateInfo::default(),
    }
}

#[async_trait]
impl GithubApi for ScriptedApi
{
    async fn get_organization(&self, org: &str,)
    -> Result<ApiResponse<OrganizationCounts,>, Error,>
    {
        self.record(&format!("orgs/{org}"),)?;
        let count = match self.counts.lock().unwrap().get(org,) {
            Some(count,) => *count,
            None => self.repositories.lock().unwrap().get(org,).map_or(0, |repos| repos.len() as u64,),
        };
        Ok(ApiResponse::single(
            OrganizationCounts {
                public_repos:        count,
                total_private_repos: Some(0,),
                owned_private_repos: Some(0,),
            },
            RateInfo::default(),
        ),)
    }

    async fn list_organizations(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<OrganizationRecord,>,>, Error,>
    {
        self.record("user/orgs",)?;
        let records: Vec<OrganizationRecord,> = self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .map(|login| OrganizationRecord {
                login: login.clone(),
            },)
            .collect();
        Ok(paged(&records, page, per_page,),)
    }

    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<RepositoryRecord,>,>, Error,>
    {
        self.record(&format!("orgs/{org}/repos"),)?;
        let repositories = self.repositories.lock().unwrap().get(org,).cloned().unwrap_or_default();
        Ok(paged(&repositories, page, per_page,),)
    }

    async fn list_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Vec<Workflow,>,>, Error,>
    {
        let full_name = format!("{owner}/{repo}");
        self.record(&format!("repos/{full_name}/workflows"),)?;
        let workflows = self.workflows.lock().unwrap().get(&full_name,).cloned().unwrap_or_default();
        Ok(paged(&workflows, page, per_page,),)
    }
}

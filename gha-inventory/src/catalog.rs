// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-repository workflow catalog rebuilt on every cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{client::RateLimitedClient, paginate::drain_pages};

/// Workflow definition as returned by the Actions API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct Workflow
{
    /// Numeric workflow identifier.
    pub id:      i64,
    /// GraphQL node identifier.
    pub node_id: String,
    /// Display name.
    pub name:    String,
    /// Path of the workflow file inside the repository.
    #[serde(default)]
    pub path:    Option<String,>,
    /// Workflow state, e.g. `active` or `disabled_manually`.
    pub state:   String,
}

/// Workflows of one repository keyed by workflow identifier.
pub type RepositoryWorkflows = BTreeMap<i64, Workflow,>;

/// Mapping from `owner/name` to the repository's workflows.
///
/// Repositories without workflows never appear in the catalog.
pub type WorkflowCatalog = BTreeMap<String, RepositoryWorkflows,>;

/// Result of [`build_catalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct CatalogBuild
{
    /// Input repositories that have at least one workflow, in input order.
    pub repositories: Vec<String,>,
    /// Workflows of every repository in `repositories`.
    pub workflows:    WorkflowCatalog,
}

/// Fetches the workflows of a single repository.
///
/// Returns an empty map when the listing fails; the failure is logged and the
/// repository is treated as having no workflows for this cycle.
pub async fn fetch_repository_workflows(
    client: &RateLimitedClient,
    repository: &str,
) -> RepositoryWorkflows
{
    let Some((owner, name,),) = repository.split_once('/',) else {
        warn!("Skipping repository {} without an owner/name form", repository);
        return RepositoryWorkflows::new();
    };

    let drained =
        drain_pages("Actions.ListWorkflows", |page| client.list_workflows(owner, name, page,),).await;

    if let Some(error,) = drained.interrupted {
        warn!("ListWorkflows error for {}: {}", repository, error);
        return RepositoryWorkflows::new();
    }

    drained.items.into_iter().map(|workflow| (workflow.id, workflow,),).collect()
}

/// Builds the workflow catalog for `repositories`.
///
/// Every distinct repository is queried once; those yielding zero workflows
/// are left out of both the catalog and the returned repository list.
pub async fn build_catalog(client: &RateLimitedClient, repositories: &[String],) -> CatalogBuild
{
    let mut build = CatalogBuild::default();
    let mut visited = BTreeSet::new();

    for repository in repositories {
        if !visited.insert(repository.as_str(),) {
            debug!("Skipping duplicate repository {}", repository);
            continue;
        }

        let workflows = fetch_repository_workflows(client, repository,).await;
        if workflows.is_empty() {
            debug!("Dropping repository {} without workflows", repository);
            continue;
        }

        debug!("Fetched {} workflows for repository {}", workflows.len(), repository);
        build.repositories.push(repository.clone(),);
        build.workflows.insert(repository.clone(), workflows,);
    }

    build
}

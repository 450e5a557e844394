// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Repository and workflow inventory for GitHub Actions exporters.
//!
//! The library keeps an up-to-date list of repositories worth polling and
//! the workflows defined in each of them, while spending as little of the
//! GitHub API quota as possible. Organization inventories are only listed
//! again when a cheap repository count probe reports drift, every call is
//! retried across rate-limit windows, and each refresh cycle publishes one
//! consistent [`PublishedSnapshot`] that sibling pollers read through a
//! [`SnapshotReader`].

#![warn(missing_docs)]

mod api;
mod catalog;
mod client;
mod config;
mod error;
mod fields;
mod github;
mod inventory;
mod paginate;
mod retry;
mod scheduler;
mod snapshot;
#[cfg(test)]
mod test_support;

pub use api::{
    ApiResponse, GithubApi, OrganizationCounts, OrganizationRecord, RateInfo, RepositoryRecord,
    next_page_from_link, parse_retry_after,
};
pub use catalog::{
    CatalogBuild, RepositoryWorkflows, Workflow, WorkflowCatalog, build_catalog,
    fetch_repository_workflows,
};
pub use client::{DEFAULT_PER_PAGE, RateLimitedClient};
pub use config::{
    DEFAULT_REFRESH_SECONDS, ExporterConfig, GithubSettings, MAX_REFRESH_SECONDS, Overrides,
    load_config, parse_config, split_list,
};
pub use error::{Error, io_error};
pub use fields::{
    DEFAULT_WORKFLOW_FIELDS, FieldValue, RunField, WorkflowRun, parse_fields, run_labels,
};
pub use github::{OctocrabApi, classify_failure};
pub use inventory::{
    CountRefreshPolicy, InventoryCache, InventorySnapshot, RefreshPolicy, RefreshedInventory,
    RepositoryClass, Resolution, ResolvedInventory,
};
pub use paginate::{Drained, FIRST_PAGE, drain_pages};
pub use retry::{Clock, RetryPolicy, SystemClock, WaitStrategy};
pub use scheduler::{CYCLE_MULTIPLIER, CycleReport, RefreshScheduler};
pub use snapshot::{PublishedSnapshot, SnapshotReader, SnapshotStore};

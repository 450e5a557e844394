// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Label projection for workflow runs.
//!
//! Run-status pollers label their gauges with a configurable list of run
//! attributes. Each attribute is a [`RunField`] with a single accessor that
//! returns a typed [`FieldValue`]; absent attributes come back as
//! [`FieldValue::Missing`] and are rendered with a per-field placeholder.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{catalog::WorkflowCatalog, error::Error};

/// Default comma separated field list used for run labels.
pub const DEFAULT_WORKFLOW_FIELDS: &str =
    "repo,id,node_id,head_branch,head_sha,run_number,workflow_id,workflow,event,status";

/// Workflow run attributes as returned by the Actions API.
///
/// Every attribute is optional so partially populated runs still project.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq,)]
pub struct WorkflowRun
{
    /// Run identifier.
    #[serde(default)]
    pub id:          Option<i64,>,
    /// GraphQL node identifier of the run.
    #[serde(default)]
    pub node_id:     Option<String,>,
    /// Branch the run was triggered on.
    #[serde(default)]
    pub head_branch: Option<String,>,
    /// Commit the run was triggered for.
    #[serde(default)]
    pub head_sha:    Option<String,>,
    /// Per-workflow run counter.
    #[serde(default)]
    pub run_number:  Option<i64,>,
    /// Identifier of the workflow that owns the run.
    #[serde(default)]
    pub workflow_id: Option<i64,>,
    /// Triggering event, e.g. `push`.
    #[serde(default)]
    pub event:       Option<String,>,
    /// Run status, e.g. `queued` or `completed`.
    #[serde(default)]
    pub status:      Option<String,>,
}

/// Label-able attribute of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub enum RunField
{
    /// Repository in `owner/name` form.
    Repo,
    /// Run identifier.
    Id,
    /// Run node identifier.
    NodeId,
    /// Head branch.
    HeadBranch,
    /// Head commit.
    HeadSha,
    /// Run number.
    RunNumber,
    /// Workflow identifier.
    WorkflowId,
    /// Workflow name resolved through the catalog.
    Workflow,
    /// Triggering event.
    Event,
    /// Run status.
    Status,
}

impl RunField
{
    /// Every field, in declaration order.
    pub const ALL: [RunField; 10] = [
        Self::Repo,
        Self::Id,
        Self::NodeId,
        Self::HeadBranch,
        Self::HeadSha,
        Self::RunNumber,
        Self::WorkflowId,
        Self::Workflow,
        Self::Event,
        Self::Status,
    ];

    /// Configuration and label name of the field.
    pub fn name(self,) -> &'static str
    {
        match self {
            Self::Repo => "repo",
            Self::Id => "id",
            Self::NodeId => "node_id",
            Self::HeadBranch => "head_branch",
            Self::HeadSha => "head_sha",
            Self::RunNumber => "run_number",
            Self::WorkflowId => "workflow_id",
            Self::Workflow => "workflow",
            Self::Event => "event",
            Self::Status => "status",
        }
    }

    /// Placeholder rendered for [`FieldValue::Missing`].
    pub fn missing_label(self,) -> &'static str
    {
        match self {
            Self::Id | Self::RunNumber | Self::WorkflowId => "0",
            Self::Workflow => "unknown",
            Self::Repo | Self::NodeId | Self::HeadBranch | Self::HeadSha | Self::Event | Self::Status => {
                "<empty>"
            }
        }
    }

    /// Extracts the field from `run`.
    ///
    /// The workflow name is resolved through `catalog`, keyed by `repo` and
    /// the run's workflow identifier.
    pub fn value(self, repo: &str, run: &WorkflowRun, catalog: &WorkflowCatalog,) -> FieldValue
    {
        match self {
            Self::Repo => FieldValue::Text(repo.to_owned(),),
            Self::Id => FieldValue::integer(run.id,),
            Self::NodeId => FieldValue::text(run.node_id.as_deref(),),
            Self::HeadBranch => FieldValue::text(run.head_branch.as_deref(),),
            Self::HeadSha => FieldValue::text(run.head_sha.as_deref(),),
            Self::RunNumber => FieldValue::integer(run.run_number,),
            Self::WorkflowId => FieldValue::integer(run.workflow_id,),
            Self::Workflow => workflow_name(repo, run, catalog,),
            Self::Event => FieldValue::text(run.event.as_deref(),),
            Self::Status => FieldValue::text(run.status.as_deref(),),
        }
    }
}

impl fmt::Display for RunField
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.name(),)
    }
}

impl FromStr for RunField
{
    type Err = Error;

    fn from_str(value: &str,) -> Result<Self, Self::Err,>
    {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name() == trimmed,)
            .ok_or_else(|| Error::validation(format!("unknown workflow field '{trimmed}'"),),)
    }
}

/// Typed value of a [`RunField`].
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum FieldValue
{
    /// Textual attribute.
    Text(String,),
    /// Numeric attribute.
    Integer(i64,),
    /// Attribute absent from the run or the catalog.
    Missing,
}

impl FieldValue
{
    fn text(value: Option<&str,>,) -> Self
    {
        value.map_or(Self::Missing, |text| Self::Text(text.to_owned(),),)
    }

    fn integer(value: Option<i64,>,) -> Self
    {
        value.map_or(Self::Missing, Self::Integer,)
    }

    /// Renders the value as a label, substituting the field placeholder.
    pub fn render(&self, field: RunField,) -> String
    {
        match self {
            Self::Text(text,) => text.clone(),
            Self::Integer(number,) => number.to_string(),
            Self::Missing => field.missing_label().to_owned(),
        }
    }
}

fn workflow_name(repo: &str, run: &WorkflowRun, catalog: &WorkflowCatalog,) -> FieldValue
{
    let Some(workflows,) = catalog.get(repo,) else {
        debug!("Couldn't find repo '{}' in workflow cache", repo);
        return FieldValue::Missing;
    };
    let Some(workflow_id,) = run.workflow_id else {
        debug!("Run of repo '{}' has no workflow_id", repo);
        return FieldValue::Missing;
    };
    match workflows.get(&workflow_id,) {
        Some(workflow,) => FieldValue::Text(workflow.name.clone(),),
        None => {
            debug!("Couldn't find workflow {} of repo '{}' in workflow cache", workflow_id, repo);
            FieldValue::Missing
        }
    }
}

/// Parses a comma separated field list such as [`DEFAULT_WORKFLOW_FIELDS`].
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown or empty field list.
///
/// # Example
///
/// ```
/// use gha_inventory::{RunField, parse_fields};
///
/// let fields = parse_fields("repo, status",)?;
/// assert_eq!(fields, vec![RunField::Repo, RunField::Status]);
/// # Ok::<(), gha_inventory::Error>(())
/// ```
pub fn parse_fields(list: &str,) -> Result<Vec<RunField,>, Error,>
{
    let fields = list
        .split(',',)
        .filter(|entry| !entry.trim().is_empty(),)
        .map(str::parse,)
        .collect::<Result<Vec<RunField,>, Error,>>()?;

    if fields.is_empty() {
        return Err(Error::validation("workflow field list must not be empty",),);
    }
    Ok(fields,)
}

/// Renders the labels of `run` for every field in `fields`.
pub fn run_labels(
    fields: &[RunField],
    repo: &str,
    run: &WorkflowRun,
    catalog: &WorkflowCatalog,
) -> Vec<String,>
{
    fields.iter().map(|field| field.value(repo, run, catalog,).render(*field,),).collect()
}

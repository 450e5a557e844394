// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Configuration document consumed by the refresher.
//!
//! The YAML document is optional; every value has a default and command line
//! flags or environment variables can override it through [`Overrides`].
//! Configuration is read once at start-up.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    client::DEFAULT_PER_PAGE,
    error::{Error, io_error},
    fields::{DEFAULT_WORKFLOW_FIELDS, RunField, parse_fields},
};

/// Default base refresh interval in seconds.
pub const DEFAULT_REFRESH_SECONDS: u64 = 30;

/// Largest accepted base refresh interval in seconds (one day).
pub const MAX_REFRESH_SECONDS: u64 = 86_400;

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use gha_inventory::parse_config;
///
/// let yaml = r#"
/// github:
///   organizations: [acme]
///   refresh: 60
/// "#;
/// let config = parse_config(yaml,)?;
/// assert_eq!(config.github.organizations, vec!["acme"]);
/// assert_eq!(config.github.per_page, 100);
/// # Ok::<(), gha_inventory::Error>(())
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct ExporterConfig
{
    /// GitHub access and inventory scope.
    #[serde(default)]
    pub github:          GithubSettings,
    /// Comma separated run fields used as labels by run pollers.
    #[serde(default = "default_workflow_fields", alias = "export_fields")]
    pub workflow_fields: String,
}

impl Default for ExporterConfig
{
    fn default() -> Self
    {
        Self {
            github: GithubSettings::default(), workflow_fields: default_workflow_fields(),
        }
    }
}

/// GitHub section of the configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq,)]
pub struct GithubSettings
{
    /// Organizations whose repositories are discovered dynamically.
    #[serde(default, alias = "orgas")]
    pub organizations:   Vec<String,>,
    /// Static `owner/name` list; when non-empty, organizations are ignored.
    #[serde(default, alias = "repos")]
    pub repositories:    Vec<String,>,
    /// Base refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh:         u64,
    /// Enterprise slug, accepted for sibling pollers.
    #[serde(default)]
    pub enterprise_name: Option<String,>,
    /// Base URL of a GitHub Enterprise Server API.
    #[serde(default)]
    pub api_url:         Option<String,>,
    /// Page size for list endpoints.
    #[serde(default = "default_per_page")]
    pub per_page:        u32,
}

impl Default for GithubSettings
{
    fn default() -> Self
    {
        Self {
            organizations:   Vec::new(),
            repositories:    Vec::new(),
            refresh:         DEFAULT_REFRESH_SECONDS,
            enterprise_name: None,
            api_url:         None,
            per_page:        DEFAULT_PER_PAGE,
        }
    }
}

fn default_workflow_fields() -> String
{
    DEFAULT_WORKFLOW_FIELDS.to_owned()
}

fn default_refresh() -> u64
{
    DEFAULT_REFRESH_SECONDS
}

fn default_per_page() -> u32
{
    DEFAULT_PER_PAGE
}

/// Values supplied on the command line or through the environment.
///
/// `None` keeps the value from the configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct Overrides
{
    /// Replaces `github.organizations`.
    pub organizations:   Option<Vec<String,>,>,
    /// Replaces `github.repositories`.
    pub repositories:    Option<Vec<String,>,>,
    /// Replaces `github.refresh`.
    pub refresh:         Option<u64,>,
    /// Replaces `github.enterprise_name`.
    pub enterprise_name: Option<String,>,
    /// Replaces `github.api_url`.
    pub api_url:         Option<String,>,
    /// Replaces `workflow_fields`.
    pub workflow_fields: Option<String,>,
}

impl ExporterConfig
{
    /// Applies `overrides` and normalizes list entries.
    pub fn apply(mut self, overrides: Overrides,) -> Self
    {
        if let Some(organizations,) = overrides.organizations {
            self.github.organizations = organizations;
        }
        if let Some(repositories,) = overrides.repositories {
            self.github.repositories = repositories;
        }
        if let Some(refresh,) = overrides.refresh {
            self.github.refresh = refresh;
        }
        if let Some(enterprise_name,) = overrides.enterprise_name {
            self.github.enterprise_name = Some(enterprise_name,);
        }
        if let Some(api_url,) = overrides.api_url {
            self.github.api_url = Some(api_url,);
        }
        if let Some(workflow_fields,) = overrides.workflow_fields {
            self.workflow_fields = workflow_fields;
        }

        self.github.organizations = normalize_list(self.github.organizations,);
        self.github.repositories = normalize_list(self.github.repositories,);
        self
    }

    /// Checks the invariants the refresher relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the refresh interval is zero or
    /// longer than [`MAX_REFRESH_SECONDS`], the page size is outside
    /// `1..=100`, a static repository is not in `owner/name` form, or the
    /// workflow field list does not parse.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        if self.github.refresh == 0 {
            return Err(Error::validation("github.refresh must be greater than zero",),);
        }
        if self.github.refresh > MAX_REFRESH_SECONDS {
            return Err(Error::validation(format!(
                "github.refresh must not exceed {MAX_REFRESH_SECONDS} seconds"
            ),),);
        }
        if !(1..=DEFAULT_PER_PAGE).contains(&self.github.per_page,) {
            return Err(Error::validation("github.per_page must be between 1 and 100",),);
        }
        for repository in &self.github.repositories {
            if !is_full_name(repository,) {
                return Err(Error::validation(format!(
                    "repository '{repository}' must use the owner/name form"
                ),),);
            }
        }
        parse_fields(&self.workflow_fields,)?;
        Ok((),)
    }

    /// Base refresh interval before the engine's multiplier.
    pub fn refresh_interval(&self,) -> Duration
    {
        Duration::from_secs(self.github.refresh,)
    }

    /// Parsed run label fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid field list.
    pub fn run_fields(&self,) -> Result<Vec<RunField,>, Error,>
    {
        parse_fields(&self.workflow_fields,)
    }
}

/// Parses a configuration document from YAML.
///
/// # Errors
///
/// Returns [`Error::Parse`] for invalid YAML.
pub fn parse_config(yaml: &str,) -> Result<ExporterConfig, Error,>
{
    if yaml.trim().is_empty() {
        return Ok(ExporterConfig::default(),);
    }
    Ok(serde_yaml::from_str(yaml,)?,)
}

/// Reads and parses the configuration document at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// for invalid YAML.
pub fn load_config(path: &Path,) -> Result<ExporterConfig, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| io_error(path, source,),)?;
    parse_config(&contents,)
}

/// Splits a comma separated list, dropping blank entries.
pub fn split_list(value: &str,) -> Vec<String,>
{
    normalize_list(value.split(',',).map(str::to_owned,),)
}

fn normalize_list<I,>(entries: I,) -> Vec<String,>
where
    I: IntoIterator<Item = String,>,
{
    entries
        .into_iter()
        .map(|entry| entry.trim().to_owned(),)
        .filter(|entry| !entry.is_empty(),)
        .collect()
}

fn is_full_name(repository: &str,) -> bool
{
    repository
        .split_once('/',)
        .is_some_and(|(owner, name,)| !owner.is_empty() && !name.is_empty() && !name.contains('/',),)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_document_yields_defaults()
    {
        let config = parse_config("",).expect("empty config",);
        assert_eq!(config, ExporterConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        config.validate().expect("defaults are valid",);
    }

    #[test]
    fn aliases_match_exporter_environment_names()
    {
        let yaml = r"
github:
  orgas: [acme, globex]
  repos: []
  enterprise_name: initech
export_fields: repo,status
";
        let config = parse_config(yaml,).expect("valid config",);
        assert_eq!(config.github.organizations, vec!["acme", "globex"]);
        assert_eq!(config.github.enterprise_name.as_deref(), Some("initech"));
        assert_eq!(config.run_fields().expect("fields",), vec![RunField::Repo, RunField::Status]);
    }

    #[test]
    fn overrides_replace_document_values()
    {
        let config = parse_config("github:\n  organizations: [acme]\n  refresh: 10\n",)
            .expect("valid config",)
            .apply(Overrides {
                repositories: Some(split_list(" acme/api, ,acme/web ",),),
                refresh: Some(45,),
                ..Overrides::default()
            },);

        assert_eq!(config.github.organizations, vec!["acme"]);
        assert_eq!(config.github.repositories, vec!["acme/api", "acme/web"]);
        assert_eq!(config.github.refresh, 45);
    }

    #[test]
    fn validation_rejects_zero_refresh()
    {
        let config = ExporterConfig::default().apply(Overrides {
            refresh: Some(0,), ..Overrides::default()
        },);
        let error = config.validate().expect_err("zero refresh",);
        assert!(error.to_string().contains("refresh must be greater than zero"));
    }

    #[test]
    fn validation_rejects_refresh_longer_than_a_day()
    {
        for refresh in [MAX_REFRESH_SECONDS + 1, u64::MAX / 4] {
            let config = ExporterConfig::default().apply(Overrides {
                refresh: Some(refresh,), ..Overrides::default()
            },);
            let error = config.validate().expect_err("oversized refresh",);
            assert!(error.to_string().contains("must not exceed 86400 seconds"));
        }

        let config = ExporterConfig::default().apply(Overrides {
            refresh: Some(MAX_REFRESH_SECONDS,), ..Overrides::default()
        },);
        config.validate().expect("one day is accepted",);
    }

    #[test]
    fn validation_rejects_malformed_repositories()
    {
        for repository in ["acme", "/api", "acme/", "acme/api/extra"] {
            let config = ExporterConfig::default().apply(Overrides {
                repositories: Some(vec![repository.to_owned()],),
                ..Overrides::default()
            },);
            assert!(config.validate().is_err(), "{repository} should be rejected");
        }
    }

    #[test]
    fn validation_rejects_page_size_out_of_range()
    {
        let config = parse_config("github:\n  per_page: 250\n",).expect("valid yaml",);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_reads_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("exporter.yaml",);
        fs::write(&path, "github:\n  organizations: [acme]\n",).expect("failed to write config",);

        let config = load_config(&path,).expect("config loads",);
        assert_eq!(config.github.organizations, vec!["acme"]);
    }

    #[test]
    fn load_config_reports_missing_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let error = load_config(&temp.path().join("missing.yaml",),).expect_err("missing file",);
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn invalid_yaml_maps_to_parse_error()
    {
        let error = parse_config("github: [unclosed",).expect_err("invalid yaml",);
        assert!(matches!(error, Error::Parse { .. }));
    }
}

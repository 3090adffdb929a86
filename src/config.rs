use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tokio::fs;

use crate::branch::BranchName;
use crate::defaults;

/// Environment variable that overrides the configured base branch.
pub const BASE_BRANCH_ENV: &str = "BASE_BRANCH";

/// Environment variable pointing at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "GITX_CONFIG_PATH";

/// Raw, optional shape of the YAML config file. Everything is optional;
/// resolution fills in defaults and composes the derived sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub base_branch: Option<String>,
    pub staging_branch: Option<String>,
    pub prototype_branch: Option<String>,
    pub last_known_good_staging_branch: Option<String>,
    #[serde(default)]
    pub aggregate_branches: Vec<String>,
    #[serde(default)]
    pub reserved_branches: Vec<String>,
    pub developer_group: Option<String>,
    pub enforce_staging_before_release: Option<bool>,
    pub use_pr_comments: Option<bool>,
}

/// Branch names and policy flags resolved once per invocation.
///
/// The resolved form is immutable for the duration of a command. The
/// classification predicates over these values live in [`crate::branch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub base_branch: BranchName,
    pub staging_branch: BranchName,
    pub prototype_branch: BranchName,
    pub last_known_good_staging_branch: BranchName,
    /// Configured aggregates plus staging and prototype, deduplicated.
    pub aggregate_branches: Vec<BranchName>,
    /// Explicitly reserved names from the file, plus the file's base branch
    /// even when the environment override picked a different base.
    pub reserved_branches: Vec<BranchName>,
    pub developer_group: String,
    pub enforce_staging_before_release: bool,
    pub use_pr_comments: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::resolve(ConfigFile::default(), None)
    }
}

impl WorkflowConfig {
    /// Load the config file (if present) and resolve it together with the
    /// `BASE_BRANCH` environment override.
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path();
        let file = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            ConfigFile::default()
        };

        let env_base = env::var(BASE_BRANCH_ENV).ok().filter(|v| !v.is_empty());
        Ok(Self::resolve(file, env_base))
    }

    fn config_path() -> PathBuf {
        env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DEFAULT_CONFIG_FILE))
    }

    /// Pure resolution step: precedence is environment > file > default, and
    /// the derived aggregate/reserved sets are composed here so the
    /// classifier never has to consult the file shape again.
    pub fn resolve(file: ConfigFile, env_base: Option<String>) -> Self {
        let file_base = file.base_branch.clone();
        let base_branch = BranchName::new(
            env_base
                .or(file.base_branch)
                .unwrap_or_else(|| defaults::DEFAULT_BASE_BRANCH.to_string()),
        );
        let staging_branch = BranchName::new(
            file.staging_branch
                .unwrap_or_else(|| defaults::DEFAULT_STAGING_BRANCH.to_string()),
        );
        let prototype_branch = BranchName::new(
            file.prototype_branch
                .unwrap_or_else(|| defaults::DEFAULT_PROTOTYPE_BRANCH.to_string()),
        );
        let last_known_good_staging_branch = BranchName::new(
            file.last_known_good_staging_branch
                .unwrap_or_else(|| "last_known_good_staging".to_string()),
        );

        let mut aggregate_branches: Vec<BranchName> = file
            .aggregate_branches
            .into_iter()
            .map(BranchName::new)
            .collect();
        for name in [&staging_branch, &prototype_branch] {
            if !aggregate_branches.contains(name) {
                aggregate_branches.push(name.clone());
            }
        }

        let mut reserved_branches: Vec<BranchName> = file
            .reserved_branches
            .into_iter()
            .map(BranchName::new)
            .collect();
        if let Some(file_base) = file_base {
            let file_base = BranchName::new(file_base);
            if !reserved_branches.contains(&file_base) {
                reserved_branches.push(file_base);
            }
        }

        Self {
            base_branch,
            staging_branch,
            prototype_branch,
            last_known_good_staging_branch,
            aggregate_branches,
            reserved_branches,
            developer_group: file
                .developer_group
                .unwrap_or_else(|| defaults::DEFAULT_DEVELOPER_GROUP.to_string()),
            enforce_staging_before_release: file.enforce_staging_before_release.unwrap_or(false),
            use_pr_comments: file.use_pr_comments.unwrap_or(false),
        }
    }
}

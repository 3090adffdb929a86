//! Branch names and the classification rules over them.
//!
//! Classification is multi-valued: a `last_known_good_*` branch is aggregate
//! by prefix and therefore also reserved. Everything here is a pure function
//! of the name and the resolved [`WorkflowConfig`]; nothing touches git.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::WorkflowConfig;
use crate::error::{GitxError, Result};

/// Prefix that classifies a branch as aggregate (reset-target mirrors).
pub const LAST_KNOWN_GOOD_PREFIX: &str = "last_known_good";

/// Prefix for branches kept as a historical record after a backport.
pub const RETAINED_PREFIX: &str = "backport_";

/// A git branch name.
///
/// Construction is unchecked; names arriving from the user go through
/// [`BranchName::validated`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Accepts only names safe to splice into git invocations: non-empty,
    /// alphanumeric plus hyphen and underscore.
    pub fn validated(name: &str) -> Result<Self> {
        if is_valid_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(GitxError::InvalidBranchName {
                name: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `last_known_good_<name>` shadow of this branch.
    pub fn last_known_good(&self) -> BranchName {
        BranchName(format!("{}_{}", LAST_KNOWN_GOOD_PREFIX, self.0))
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

pub fn is_valid_name(name: &str) -> bool {
    regex::Regex::new(r"^[A-Za-z0-9_-]+$")
        .ok()
        .map_or(false, |re| re.is_match(name))
}

impl WorkflowConfig {
    /// Aggregate branches are the shared integration targets: staging,
    /// prototype, anything configured as aggregate, and every
    /// `last_known_good*` mirror.
    pub fn is_aggregate(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        self.aggregate_branches.iter().any(|b| b.as_str() == name)
            || name.starts_with(LAST_KNOWN_GOOD_PREFIX)
    }

    /// Reserved branches are never treated as disposable feature branches.
    pub fn is_reserved(&self, name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        matches!(name, "HEAD" | "master" | "next_release")
            || name == self.base_branch.as_str()
            || self.reserved_branches.iter().any(|b| b.as_str() == name)
            || self.is_aggregate(name)
    }

    /// Branches preserved as a historical record (backports), exempt from
    /// cleanup but not reserved in the listing sense.
    pub fn is_retained(&self, name: impl AsRef<str>) -> bool {
        name.as_ref().starts_with(RETAINED_PREFIX)
    }

    pub fn protected_for(&self, name: impl AsRef<str>) -> bool {
        self.is_reserved(name.as_ref()) || self.is_retained(name.as_ref())
    }

    /// Guard used before destructive operations (release, integrate into
    /// base). `action` names the refused operation in the error.
    pub fn assert_not_protected(&self, name: &BranchName, action: &str) -> Result<()> {
        if self.protected_for(name) {
            Err(GitxError::ProtectedBranch {
                branch: name.to_string(),
                action: action.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn aggregate_branch_names(&self) -> Vec<String> {
        self.aggregate_branches
            .iter()
            .map(|b| b.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    fn config_with(aggregate: &[&str], reserved: &[&str]) -> WorkflowConfig {
        WorkflowConfig::resolve(
            ConfigFile {
                aggregate_branches: aggregate.iter().map(|s| s.to_string()).collect(),
                reserved_branches: reserved.iter().map(|s| s.to_string()).collect(),
                ..ConfigFile::default()
            },
            None,
        )
    }

    #[test]
    fn test_aggregate_implies_reserved() {
        let config = config_with(&["ops"], &[]);
        for name in [
            "staging",
            "prototype",
            "ops",
            "last_known_good_staging",
            "last_known_good_anything-at-all",
        ] {
            assert!(config.is_aggregate(name), "{name} should be aggregate");
            assert!(
                config.is_reserved(name),
                "{name} is aggregate so it must be reserved"
            );
        }
    }

    #[test]
    fn test_builtin_reserved_names() {
        let config = config_with(&[], &[]);
        for name in ["HEAD", "master", "next_release"] {
            assert!(config.is_reserved(name), "{name} should always be reserved");
        }
        let trunk = WorkflowConfig::resolve(
            ConfigFile {
                base_branch: Some("trunk".to_string()),
                ..ConfigFile::default()
            },
            None,
        );
        assert!(trunk.is_reserved("trunk"));
        // master stays reserved even when it is no longer the base.
        assert!(trunk.is_reserved("master"));
    }

    #[test]
    fn test_configured_reserved_names() {
        let config = config_with(&[], &["next_gen", "dont-touch"]);
        assert!(config.is_reserved("next_gen"));
        assert!(config.is_reserved("dont-touch"));
        assert!(!config.is_aggregate("next_gen"));
    }

    #[test]
    fn test_last_known_good_prefix_for_any_suffix() {
        let config = config_with(&[], &[]);
        assert!(config.is_aggregate("last_known_good_X"));
        assert!(config.is_aggregate("last_known_good_prototype"));
        assert!(!config.is_aggregate("known_good_X"));
    }

    #[test]
    fn test_ordinary_branch_is_unclassified() {
        let config = config_with(&["ops"], &["frozen"]);
        for name in ["FOO", "dev-bar", "feature_1"] {
            assert!(!config.is_aggregate(name));
            assert!(!config.is_reserved(name));
            assert!(!config.is_retained(name));
            assert!(!config.protected_for(name));
        }
    }

    #[test]
    fn test_retained_branches_are_protected_but_not_reserved() {
        let config = config_with(&[], &[]);
        assert!(config.is_retained("backport_59_to_v1"));
        assert!(config.protected_for("backport_59_to_v1"));
        assert!(!config.is_reserved("backport_59_to_v1"));
    }

    #[test]
    fn test_assert_not_protected_matches_protected_for() {
        let config = config_with(&["ops"], &["frozen"]);
        for name in ["staging", "master", "frozen", "ops", "backport_1_to_v2"] {
            let branch = BranchName::new(name);
            assert!(
                config.assert_not_protected(&branch, "release").is_err(),
                "{name} should be refused"
            );
        }
        let branch = BranchName::new("FOO");
        assert!(config.assert_not_protected(&branch, "release").is_ok());
    }

    #[test]
    fn test_protected_branch_error_names_the_action() {
        let config = config_with(&[], &[]);
        let err = config
            .assert_not_protected(&BranchName::new("staging"), "release")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("release"));
        assert!(message.contains("staging"));
    }

    #[test]
    fn test_branch_name_validation() {
        for name in ["FOO", "dev-bar", "feature_1", "A1-b2_c3"] {
            assert!(BranchName::validated(name).is_ok(), "{name} should pass");
        }
        for name in ["", "bad name", "semi;colon", "slash/y", "dot.", "tick`"] {
            assert!(BranchName::validated(name).is_err(), "{name} should fail");
        }
    }

    #[test]
    fn test_last_known_good_transform() {
        assert_eq!(
            BranchName::new("staging").last_known_good().as_str(),
            "last_known_good_staging"
        );
    }
}

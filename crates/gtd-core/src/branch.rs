//! Branch-to-registry mapping and image tag derivation.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Number of commit id characters kept in derived tags.
pub const SHORT_COMMIT_LEN: usize = 8;

/// Branch reported for a repository without commits.
pub const UNBORN_BRANCH: &str = "master";

/// Commit id reported for a repository without commits.
pub const UNBORN_COMMIT: &str = "0000000000000000000000000000000000000000";

/// Tag used when the work dir is not under version control.
pub const LATEST_TAG: &str = "latest";

/// Branch and shortened commit of a version-controlled work dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub branch: String,
    pub commit: String,
}

impl Revision {
    /// Build a revision, truncating `commit` to [`SHORT_COMMIT_LEN`] characters.
    pub fn new(branch: impl Into<String>, commit: &str) -> Self {
        Self {
            branch: branch.into(),
            commit: commit.chars().take(SHORT_COMMIT_LEN).collect(),
        }
    }
}

/// Registry target for a single branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchTag {
    pub server: String,
    pub username: String,
    pub password: String,
    pub organization: String,
    pub tags: Vec<String>,
}

/// Branch name → registry target, loaded from a JSON object.
///
/// ```
/// use gtd_core::BranchTagsConfig;
///
/// let config = BranchTagsConfig::from_json(
///     r#"{"main": {"server": "registry.example.com", "organization": "acme", "tags": ["stable"]}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.get("main").unwrap().tags, vec!["stable"]);
/// assert!(config.get("develop").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BranchTagsConfig {
    branches: HashMap<String, BranchTag>,
}

impl BranchTagsConfig {
    /// Load the mapping from a JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::BranchTagsLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| crate::Error::BranchTagsParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(
            path = %path.display(),
            branches = config.branches.len(),
            "branch tags config loaded"
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn get(&self, branch: &str) -> Option<&BranchTag> {
        self.branches.get(branch)
    }

    pub fn insert(&mut self, branch: impl Into<String>, tag: BranchTag) {
        self.branches.insert(branch.into(), tag);
    }
}

/// Compute the final tag set for an image.
///
/// Explicit tags always come first. Under version control, the branch
/// entry's tags are appended when it has any; otherwise `branch` and
/// `branch-commit` are. Outside version control an empty tag set becomes
/// `["latest"]`. Duplicates are dropped, keeping the first occurrence.
pub fn derive_tags(
    explicit: &[String],
    revision: Option<&Revision>,
    entry: Option<&BranchTag>,
) -> Vec<String> {
    let mut tags: Vec<String> = explicit.to_vec();

    match revision {
        Some(rev) => match entry.filter(|e| !e.tags.is_empty()) {
            Some(entry) => tags.extend(entry.tags.iter().cloned()),
            None => {
                let branch = sanitize_tag(&rev.branch);
                let with_commit = format!("{branch}-{}", rev.commit);
                tags.push(branch);
                tags.push(with_commit);
            }
        },
        None if tags.is_empty() => tags.push(LATEST_TAG.to_owned()),
        None => {}
    }

    let mut seen = std::collections::HashSet::new();
    tags.retain(|t| seen.insert(t.clone()));
    tags
}

/// Replace characters that are not allowed in an image tag with `-`.
fn sanitize_tag(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

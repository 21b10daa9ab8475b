//! Step catalog model: latest-version selection and organization filtering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Project;
use crate::error::{AggregatorError, AggregatorResult};

/// Host whose organizations the catalog is filtered by.
pub const DEFAULT_SOURCE_HOST: &str = "github.com";

/// The step library document (`spec.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub steps: BTreeMap<String, StepGroup>,
}

/// All published versions of one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepGroup {
    #[serde(default)]
    pub latest_version_number: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, StepVersion>,
}

/// A single published step version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepVersion {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<StepSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSource {
    #[serde(default)]
    pub git: String,
}

impl Catalog {
    pub fn from_json(bytes: &[u8]) -> AggregatorResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AggregatorError::Catalog(format!("deserializing spec.json: {e}")))
    }

    /// One project per step group, built from its latest version.
    ///
    /// Groups without versions are dropped. Output is ordered by step id.
    pub fn latest_projects(&self) -> Vec<Project> {
        self.steps
            .iter()
            .filter_map(|(id, group)| {
                let (version, step) = group.latest()?;
                let title = step.title.clone().unwrap_or_else(|| id.clone());
                let source_url = step
                    .source
                    .as_ref()
                    .map(|s| s.git.clone())
                    .unwrap_or_default();
                Some(Project::new(id.clone(), title, version.clone(), source_url))
            })
            .collect()
    }
}

impl StepGroup {
    /// The declared latest version when it exists in `versions`, otherwise
    /// the highest version number.
    pub fn latest(&self) -> Option<(&String, &StepVersion)> {
        if let Some(declared) = &self.latest_version_number {
            if let Some(found) = self.versions.get_key_value(declared) {
                return Some(found);
            }
        }
        self.versions
            .iter()
            .max_by(|(a, _), (b, _)| compare_versions(a, b))
    }
}

/// Compare dotted version strings segment by segment, numerically where both
/// segments are numbers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Keep projects whose source URL contains `<host>/<org>/` for any org.
pub fn filter_by_org(projects: Vec<Project>, orgs: &[String], host: &str) -> Vec<Project> {
    let needles: Vec<String> = orgs
        .iter()
        .map(|org| org.trim())
        .filter(|org| !org.is_empty())
        .map(|org| format!("{host}/{org}/"))
        .collect();

    projects
        .into_iter()
        .filter(|p| needles.iter().any(|n| p.source_url.contains(n.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"{
        "format_version": "1.0.0",
        "steps": {
            "git-clone": {
                "latest_version_number": "4.0.14",
                "versions": {
                    "4.0.13": {"title": "Git Clone old", "source": {"git": "https://github.com/bitrise-steplib/steps-git-clone.git"}},
                    "4.0.14": {"title": "Git Clone Repository", "source": {"git": "https://github.com/bitrise-steplib/steps-git-clone.git"}}
                }
            },
            "script": {
                "versions": {
                    "1.1.9": {"title": "Script", "source": {"git": "https://github.com/bitrise-io/steps-script.git"}},
                    "1.1.10": {"title": "Script", "source": {"git": "https://github.com/bitrise-io/steps-script.git"}}
                }
            },
            "slack": {
                "versions": {
                    "3.1.0": {"source": {"git": "https://github.com/someone-else/steps-slack.git"}}
                }
            },
            "empty": {"versions": {}}
        }
    }"#;

    #[test]
    fn test_latest_projects_picks_one_version_per_group() {
        let catalog = Catalog::from_json(SPEC.as_bytes()).unwrap();
        let projects = catalog.latest_projects();
        assert_eq!(projects.len(), 3);

        assert_eq!(projects[0].id, "git-clone");
        assert_eq!(projects[0].version, "4.0.14");
        assert_eq!(projects[0].title, "Git Clone Repository");

        assert_eq!(projects[1].id, "script");
        assert_eq!(projects[1].version, "1.1.10");

        assert_eq!(projects[2].title, "slack");
    }

    #[test]
    fn test_declared_latest_missing_falls_back_to_highest() {
        let mut group = StepGroup {
            latest_version_number: Some("9.9.9".to_string()),
            versions: BTreeMap::new(),
        };
        group.versions.insert("2.0.0".to_string(), StepVersion::default());
        group.versions.insert("10.0.0".to_string(), StepVersion::default());
        assert_eq!(group.latest().unwrap().0, "10.0.0");
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2.10", "1.2.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0-alpha"), Ordering::Greater);
    }

    #[test]
    fn test_filter_by_org_matches_host_and_org_prefix() {
        let catalog = Catalog::from_json(SPEC.as_bytes()).unwrap();
        let orgs = vec!["bitrise-io".to_string(), " bitrise-steplib ".to_string()];
        let filtered = filter_by_org(catalog.latest_projects(), &orgs, DEFAULT_SOURCE_HOST);
        let ids: Vec<&str> = filtered.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["git-clone", "script"]);
    }

    #[test]
    fn test_filter_by_org_requires_full_segment() {
        let projects = vec![Project::new(
            "x",
            "x",
            "1.0.0",
            "https://github.com/bitrise-io-fork/steps-x.git",
        )];
        let filtered = filter_by_org(projects, &["bitrise-io".to_string()], DEFAULT_SOURCE_HOST);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_invalid_catalog_is_catalog_error() {
        let err = Catalog::from_json(b"not json").unwrap_err();
        assert!(matches!(err, AggregatorError::Catalog(_)));
    }
}

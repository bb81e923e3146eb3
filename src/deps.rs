use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::crev::CargoCrev;
use crate::error::Result;

/// Guide to filling in a crev review
pub const REVIEW_GUIDE_URL: &str =
    "https://github.com/crev-dev/cargo-crev/blob/master/crev-lib/rc/doc/editing-package-review.md";

/// Template repository to fork for publishing proofs
pub const PROOFS_TEMPLATE_URL: &str = "https://github.com/crev-dev/crev-proofs/fork";

/// A dependency of the current project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrateListItem {
    pub name: String,
    pub version: String,
}

impl CrateListItem {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn crates_io_url(&self) -> String {
        format!("https://crates.io/crates/{}/{}", self.name, self.version)
    }

    pub fn deps_rs_url(&self) -> String {
        format!("https://deps.rs/crate/{}/{}", self.name, self.version)
    }

    /// Everyone's crev reviews of this crate
    pub fn crev_reviews_url(&self) -> String {
        format!("https://lib.rs/crates/{}/crev", self.name)
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<MetadataPackage>,
    #[serde(default)]
    workspace_members: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataPackage {
    id: String,
    name: String,
    version: String,
}

/// Non-workspace packages from `cargo metadata` JSON, sorted and de-duplicated
pub fn parse_metadata(json: &str) -> Result<Vec<CrateListItem>> {
    let metadata: Metadata = serde_json::from_str(json)?;
    let members: BTreeSet<&str> = metadata
        .workspace_members
        .iter()
        .map(String::as_str)
        .collect();

    let items: BTreeSet<CrateListItem> = metadata
        .packages
        .into_iter()
        .filter(|p| !members.contains(p.id.as_str()))
        .map(|p| CrateListItem::new(p.name, p.version))
        .collect();

    Ok(items.into_iter().collect())
}

/// Keep the items whose name matches `pattern`; an invalid pattern keeps everything
pub fn filter_by_name(items: Vec<CrateListItem>, pattern: &str) -> Vec<CrateListItem> {
    match glob::Pattern::new(pattern) {
        Ok(pattern) => items
            .into_iter()
            .filter(|item| pattern.matches(&item.name))
            .collect(),
        Err(e) => {
            warn!(pattern, error = %e, "Ignoring invalid name filter");
            items
        }
    }
}

impl CargoCrev {
    /// Dependencies of the project at `manifest_path` (or the current directory)
    pub async fn list_dependencies(
        &self,
        manifest_path: Option<&Path>,
    ) -> Result<Vec<CrateListItem>> {
        let mut invocation = self.cargo(["metadata", "--format-version", "1"]);
        if let Some(path) = manifest_path {
            invocation = invocation.arg("--manifest-path").arg(path);
        }

        let output = invocation.output().await?;
        let items = parse_metadata(&output.stdout)?;

        info!(count = items.len(), "Listed dependencies");

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "packages": [
            {"id": "app 0.1.0 (path+file:///work/app)", "name": "app", "version": "0.1.0", "source": null},
            {"id": "serde 1.0.200 (registry+https://github.com/rust-lang/crates.io-index)", "name": "serde", "version": "1.0.200", "source": "registry+https://github.com/rust-lang/crates.io-index"},
            {"id": "anyhow 1.0.80 (registry+https://github.com/rust-lang/crates.io-index)", "name": "anyhow", "version": "1.0.80"},
            {"id": "syn 1.0.109 (registry+https://github.com/rust-lang/crates.io-index)", "name": "syn", "version": "1.0.109"},
            {"id": "syn 2.0.60 (registry+https://github.com/rust-lang/crates.io-index)", "name": "syn", "version": "2.0.60"}
        ],
        "workspace_members": ["app 0.1.0 (path+file:///work/app)"],
        "version": 1
    }"#;

    #[test]
    fn test_parse_metadata_skips_workspace_members() {
        let items = parse_metadata(METADATA).unwrap();
        let names: Vec<_> = items
            .iter()
            .map(|i| format!("{} {}", i.name, i.version))
            .collect();
        assert_eq!(
            names,
            vec!["anyhow 1.0.80", "serde 1.0.200", "syn 1.0.109", "syn 2.0.60"]
        );
    }

    #[test]
    fn test_parse_metadata_rejects_garbage() {
        assert!(parse_metadata("not json").is_err());
    }

    #[test]
    fn test_filter_by_name() {
        let items = parse_metadata(METADATA).unwrap();
        let filtered = filter_by_name(items.clone(), "s*");
        assert_eq!(filtered.len(), 3);
        assert_eq!(filter_by_name(items.clone(), "[").len(), items.len());
    }

    #[test]
    fn test_links() {
        let item = CrateListItem::new("serde", "1.0.200");
        assert_eq!(item.crates_io_url(), "https://crates.io/crates/serde/1.0.200");
        assert_eq!(item.deps_rs_url(), "https://deps.rs/crate/serde/1.0.200");
        assert_eq!(item.crev_reviews_url(), "https://lib.rs/crates/serde/crev");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_dependencies_runs_cargo_metadata() {
        use crate::config::CrevConfig;
        use crate::crev::tests::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().display();
        std::fs::write(dir.path().join("metadata.json"), METADATA).unwrap();
        let cargo = fake_tool(
            dir.path(),
            &format!("printf '%s\\n' \"$*\" > '{d}/argv'\ncat '{d}/metadata.json'\n"),
        );
        let crev = CargoCrev::new(CrevConfig {
            cargo,
            ..CrevConfig::default()
        });

        let items = crev
            .list_dependencies(Some(Path::new("/work/app/Cargo.toml")))
            .await
            .unwrap();
        assert_eq!(items.len(), 4);

        let argv = std::fs::read_to_string(dir.path().join("argv")).unwrap();
        assert_eq!(
            argv.trim(),
            "metadata --format-version 1 --manifest-path /work/app/Cargo.toml"
        );
    }
}

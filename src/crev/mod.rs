//! Driving `cargo crev` as a child process.
//!
//! Every operation spawns one child and waits for it. Callers must not run
//! two submissions at once against the same [`CargoCrev`]: they share the
//! draft file. Nothing here times out or can be cancelled; a hung child
//! keeps the future pending.

pub mod process;
pub mod shim;

use std::ffi::OsStr;

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::config::CrevConfig;
use crate::draft::serialize_draft;
use crate::error::{CrevError, Result};
use crate::models::{ReviewDraft, ReviewRecord};
use crate::proofs::parse_review_records;

pub use process::{Invocation, ToolOutput};

/// Wrapper around the `cargo crev` command line
pub struct CargoCrev {
    config: CrevConfig,
    prepared: OnceCell<()>,
}

impl CargoCrev {
    pub fn new(config: CrevConfig) -> Self {
        Self {
            config,
            prepared: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CrevConfig {
        &self.config
    }

    /// `cargo <args>`
    pub fn cargo<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Invocation::new(&self.config.cargo).args(args)
    }

    /// `cargo crev <args>`
    pub fn crev<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.cargo(["crev"]).args(args)
    }

    /// Run `cargo <args>`, failing on a non-zero exit
    pub async fn run_tool_command<I, S>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.cargo(args).output().await
    }

    /// Create the scratch project unless its manifest already exists
    #[instrument(skip(self))]
    pub async fn ensure_scratch_project(&self) -> Result<()> {
        let project = self.config.scratch_project();
        let manifest = project.join("Cargo.toml");

        if tokio::fs::try_exists(&manifest)
            .await
            .map_err(|e| CrevError::io(&manifest, e))?
        {
            debug!(path = %project.display(), "Scratch project present");
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(|e| CrevError::io(&self.config.scratch_dir, e))?;

        info!(path = %project.display(), "Creating scratch project");

        self.cargo(["new", "--bin"])
            .arg(&project)
            .output()
            .await?;

        Ok(())
    }

    /// Scratch project and editor shim, set up once per instance
    async fn prepare(&self) -> Result<()> {
        self.prepared
            .get_or_try_init(|| async {
                self.ensure_scratch_project().await?;
                shim::install_shim(
                    &self.config.shim_path(),
                    &self.config.draft_path(),
                    self.config.editor_delay_secs,
                )
                .await
            })
            .await?;
        Ok(())
    }

    /// Whether `cargo` itself can be run
    pub async fn check_cargo_available(&self) -> bool {
        self.cargo(["--version"]).probe().await.is_some()
    }

    /// Whether `cargo crev` is installed
    pub async fn check_tool_available(&self) -> bool {
        self.crev(["--version"]).probe().await.is_some()
    }

    /// The current crev identity, or `None` if there is none
    pub async fn current_identity(&self) -> Option<String> {
        let output = self.crev(["id", "current"]).probe().await?;
        // Only the first id is used when several are listed.
        let id = output.stdout.split_whitespace().next()?.to_string();
        debug!(%id, "Current crev identity");
        Some(id)
    }

    /// `cargo crev id new --url <url>`, accepting both prompts with their defaults
    #[instrument(skip(self))]
    pub async fn create_identity(&self, url: &str) -> Result<()> {
        info!("Creating crev identity");
        self.crev(["id", "new", "--url", url])
            .output_with_input(b"\n\n")
            .await?;
        Ok(())
    }

    /// Submit a review of `name` `version` with the content of `draft`
    #[instrument(skip(self, draft))]
    pub async fn submit_review(
        &self,
        name: &str,
        version: &str,
        draft: &ReviewDraft,
    ) -> Result<ToolOutput> {
        self.prepare().await?;

        let draft_path = self.config.draft_path();
        tokio::fs::write(&draft_path, serialize_draft(draft))
            .await
            .map_err(|e| CrevError::io(&draft_path, e))?;

        info!("Submitting review");

        let output = self
            .review_invocation(name, version)
            .output()
            .await?;

        info!("Review recorded");

        Ok(output)
    }

    fn review_invocation(&self, name: &str, version: &str) -> Invocation {
        self.crev([
            "review",
            "--skip-activity-check",
            "--unrelated",
            "--manifest-path",
        ])
        .arg(self.config.scratch_project())
        .args([name, version])
        .env("EDITOR", self.config.shim_path())
    }

    /// `cargo crev repo publish`
    pub async fn publish_repo(&self) -> Result<ToolOutput> {
        info!("Publishing proof repository");
        self.crev(["repo", "publish"]).output().await
    }

    /// Reviews authored by the current identity, in the order crev lists them
    pub async fn query_own_reviews(&self) -> Result<Vec<ReviewRecord>> {
        let Some(id) = self.current_identity().await else {
            info!("No crev identity, no reviews to list");
            return Ok(Vec::new());
        };

        let output = self
            .crev(["proof", "find", "--author"])
            .arg(&id)
            .output()
            .await?;

        let records = parse_review_records(&output.stdout)?;
        info!(count = records.len(), "Loaded own reviews");

        Ok(records)
    }

    /// `cargo install cargo-crev`, reporting each progress line
    pub async fn install_tool<F>(&self, on_line: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        info!("Installing cargo-crev");
        self.cargo(["install", "cargo-crev"])
            .output_streaming(on_line)
            .await?;
        Ok(())
    }
}

//! Front-end state without any UI toolkit: which page is showing and what
//! it holds. Renderers read [`Session::page`] and call the transitions.

use tracing::debug;

use crate::crev::CargoCrev;
use crate::deps::CrateListItem;
use crate::models::{Level, Rating, ReviewDraft, ReviewScore};

/// Outcome of the first-run checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStatus {
    NoToolchain,
    CrevMissing,
    IdentityMissing,
    Ready { id: String },
}

impl SetupStatus {
    /// Check, in order, for cargo, cargo-crev and a crev identity
    pub async fn probe(crev: &CargoCrev) -> Self {
        if !crev.check_cargo_available().await {
            return SetupStatus::NoToolchain;
        }
        if !crev.check_tool_available().await {
            return SetupStatus::CrevMissing;
        }
        match crev.current_identity().await {
            Some(id) => SetupStatus::Ready { id },
            None => SetupStatus::IdentityMissing,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SetupStatus::Ready { .. })
    }
}

/// Dependency list with an optional selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateList {
    pub items: Vec<CrateListItem>,
    selected: Option<usize>,
}

impl CrateList {
    pub fn new(items: Vec<CrateListItem>) -> Self {
        Self {
            items,
            selected: None,
        }
    }

    /// Select the item at `index`; out of range clears the selection
    pub fn select(&mut self, index: usize) {
        self.selected = (index < self.items.len()).then_some(index);
    }

    pub fn selected(&self) -> Option<&CrateListItem> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// Review form for one crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewForm {
    pub krate: CrateListItem,
    pub thoroughness: Level,
    pub understanding: Level,
    pub rating: Rating,
    /// Comma-separated crate names, as typed
    pub alternatives: String,
    pub comment: String,
}

impl ReviewForm {
    pub fn new(krate: CrateListItem) -> Self {
        let score = ReviewScore::default();
        Self {
            krate,
            thoroughness: score.thoroughness,
            understanding: score.understanding,
            rating: score.rating,
            alternatives: String::new(),
            comment: String::new(),
        }
    }

    pub fn score(&self) -> ReviewScore {
        ReviewScore {
            thoroughness: self.thoroughness,
            understanding: self.understanding,
            rating: self.rating,
        }
    }

    pub fn to_draft(&self) -> ReviewDraft {
        ReviewDraft::new(self.score())
            .with_alternatives(split_alternatives(&self.alternatives))
            .with_comment(self.comment.clone())
    }
}

/// Split "a, b,,c" into ["a", "b", "c"]
pub fn split_alternatives(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Setup(SetupStatus),
    CrateList(CrateList),
    Review(ReviewForm),
}

/// A review submission handed back by [`Session::submit_review`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub version: String,
    pub draft: ReviewDraft,
}

/// Page navigation. The crate list survives a trip through the review form.
#[derive(Debug, Clone)]
pub struct Session {
    page: Page,
    crates: CrateList,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            page: Page::Setup(SetupStatus::NoToolchain),
            crates: CrateList::default(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Show setup; a ready setup goes straight on to the crate list
    pub fn show_setup(&mut self, status: SetupStatus) {
        debug!(?status, "Setup page");
        if status.is_ready() {
            self.show_crate_list();
        } else {
            self.page = Page::Setup(status);
        }
    }

    pub fn set_crates(&mut self, items: Vec<CrateListItem>) {
        self.crates = CrateList::new(items);
        if let Page::CrateList(list) = &mut self.page {
            *list = self.crates.clone();
        }
    }

    pub fn show_crate_list(&mut self) {
        self.page = Page::CrateList(self.crates.clone());
    }

    /// Select a crate on the list page; ignored elsewhere
    pub fn select(&mut self, index: usize) {
        if let Page::CrateList(list) = &mut self.page {
            list.select(index);
            self.crates.selected = list.selected;
        }
    }

    /// Open a fresh review form for `krate`
    pub fn show_review(&mut self, krate: CrateListItem) {
        debug!(name = %krate.name, version = %krate.version, "Review page");
        self.page = Page::Review(ReviewForm::new(krate));
    }

    /// Open a review form for the selected crate, if any
    pub fn review_selected(&mut self) -> bool {
        let selected = match &self.page {
            Page::CrateList(list) => list.selected().cloned(),
            _ => None,
        };
        match selected {
            Some(krate) => {
                self.show_review(krate);
                true
            }
            None => false,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut ReviewForm> {
        match &mut self.page {
            Page::Review(form) => Some(form),
            _ => None,
        }
    }

    pub fn cancel_review(&mut self) {
        if matches!(self.page, Page::Review(_)) {
            self.show_crate_list();
        }
    }

    /// Take the form's content and return to the crate list
    pub fn submit_review(&mut self) -> Option<Submission> {
        let Page::Review(form) = &self.page else {
            return None;
        };
        let submission = Submission {
            name: form.krate.name.clone(),
            version: form.krate.version.clone(),
            draft: form.to_draft(),
        };
        self.show_crate_list();
        Some(submission)
    }

    /// Submit the form through `crev`, then publish
    pub async fn publish_review(&mut self, crev: &CargoCrev) -> crate::error::Result<bool> {
        let Some(submission) = self.submit_review() else {
            return Ok(false);
        };
        crev.submit_review(&submission.name, &submission.version, &submission.draft)
            .await?;
        crev.publish_repo().await?;
        Ok(true)
    }
}

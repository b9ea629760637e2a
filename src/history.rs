//! A paper's yearly citation record and the training windows it is fitted on.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timeline::{Timeline, TimelineBuilder};

/// How much of a citation history to train on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingWindow {
    /// The first `n` years after publication.
    Years(usize),
    /// Every available year.
    All,
}

impl TrainingWindow {
    /// The 5-year, 10-year and full-history windows fitted for every paper.
    pub const STANDARD: [TrainingWindow; 3] = [
        TrainingWindow::Years(5),
        TrainingWindow::Years(10),
        TrainingWindow::All,
    ];

    /// Row limit understood by [`TimelineBuilder::row_limit`] (0 reads everything).
    pub fn row_limit(self) -> usize {
        match self {
            TrainingWindow::Years(years) => years,
            TrainingWindow::All => 0,
        }
    }
}

/// One paper's citation counts, year by year from publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationHistory {
    paper_id: String,
    publication_year: Option<i32>,
    yearly_counts: Vec<u64>,
}

impl CitationHistory {
    pub fn new<S: Into<String>>(
        paper_id: S,
        publication_year: Option<i32>,
        yearly_counts: Vec<u64>,
    ) -> Self {
        Self {
            paper_id: paper_id.into(),
            publication_year,
            yearly_counts,
        }
    }

    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }

    pub fn publication_year(&self) -> Option<i32> {
        self.publication_year
    }

    /// Citations received in each year since publication.
    pub fn yearly_counts(&self) -> &[u64] {
        &self.yearly_counts
    }

    /// Citations received within `window`.
    pub fn total_citations(&self, window: TrainingWindow) -> u64 {
        let rows = match window.row_limit() {
            0 => self.yearly_counts.len(),
            limit => limit.min(self.yearly_counts.len()),
        };
        self.yearly_counts[..rows].iter().sum()
    }

    /// Builds the per-citation timeline for `window`.
    pub fn timeline(&self, window: TrainingWindow) -> Result<Timeline> {
        TimelineBuilder::from_counts(&self.yearly_counts)
            .row_limit(window.row_limit())
            .build()
    }
}

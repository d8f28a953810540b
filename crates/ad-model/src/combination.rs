//! Ordered segment tuples.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::{Category, Segment};

/// One ad to render: a segment per active category, in join order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    segments: Vec<Segment>,
}

impl Combination {
    /// Build a combination, sorting segments into `Category::ORDER`.
    ///
    /// Returns `None` when a category appears twice or the list is empty.
    pub fn new(mut segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        segments.sort_by_key(|s| s.category);
        if segments.windows(2).any(|w| w[0].category == w[1].category) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Input file paths, in join order.
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.segments.iter().map(|s| s.path.clone()).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.label.as_str()).collect()
    }

    /// Output file name: `AD<sequence>-<label1>-...-<labelN>.<ext>`.
    pub fn output_name(&self, sequence: usize, extension: &str) -> String {
        format!(
            "AD{sequence}-{}.{}",
            self.labels().join("-"),
            extension.trim_start_matches('.')
        )
    }
}

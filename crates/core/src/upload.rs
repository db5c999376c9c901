//! Per-file outcomes and the batch report of an upload run.
//!
//! An upload is best-effort: a file that cannot be read or stored is
//! recorded here with its reason instead of aborting the whole batch.

use crate::frame::FrameNumber;
use serde::Serialize;
use std::fmt;

/// Step at which a frame file failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// The file could not be read from disk.
    Read,
    /// The frame could not be written to the store.
    Store,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing a single frame file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameStatus {
    Uploaded,
    Failed { stage: FailureStage, reason: String },
}

/// Outcome for one matching frame file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameOutcome {
    pub frame_number: FrameNumber,
    pub file_name: String,
    #[serde(flatten)]
    pub status: FrameStatus,
}

impl FrameOutcome {
    pub fn uploaded(frame_number: FrameNumber, file_name: impl Into<String>) -> Self {
        Self {
            frame_number,
            file_name: file_name.into(),
            status: FrameStatus::Uploaded,
        }
    }

    pub fn failed(
        frame_number: FrameNumber,
        file_name: impl Into<String>,
        stage: FailureStage,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            frame_number,
            file_name: file_name.into(),
            status: FrameStatus::Failed {
                stage,
                reason: reason.into(),
            },
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self.status, FrameStatus::Uploaded)
    }
}

/// Report of one upload run over a frames directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    /// One entry per file whose name matched the frame pattern,
    /// ordered by frame number.
    pub outcomes: Vec<FrameOutcome>,
    /// Directory entries ignored because their name did not match.
    pub skipped: usize,
}

impl UploadReport {
    pub fn new(mut outcomes: Vec<FrameOutcome>, skipped: usize) -> Self {
        outcomes.sort_by(|a, b| {
            a.frame_number
                .cmp(&b.frame_number)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Self { outcomes, skipped }
    }

    pub fn uploaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_uploaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.uploaded_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FrameOutcome> {
        self.outcomes.iter().filter(|o| !o.is_uploaded())
    }

    /// One-line summary suitable for logs and plain-text responses.
    pub fn summary(&self) -> String {
        format!(
            "{} uploaded, {} failed, {} skipped",
            self.uploaded_count(),
            self.failed_count(),
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_orders_outcomes_and_counts() {
        let report = UploadReport::new(
            vec![
                FrameOutcome::failed(
                    FrameNumber::new(3),
                    "frame_3.txt",
                    FailureStage::Read,
                    "permission denied",
                ),
                FrameOutcome::uploaded(FrameNumber::new(1), "frame_1.txt"),
                FrameOutcome::uploaded(FrameNumber::new(2), "frame_2.txt"),
            ],
            4,
        );

        let numbers: Vec<u32> = report.outcomes.iter().map(|o| o.frame_number.get()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(report.uploaded_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.summary(), "2 uploaded, 1 failed, 4 skipped");

        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file_name, "frame_3.txt");
    }

    #[test]
    fn empty_report_summary() {
        let report = UploadReport::default();
        assert_eq!(report.summary(), "0 uploaded, 0 failed, 0 skipped");
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = FrameOutcome::failed(
            FrameNumber::new(9),
            "frame_9.txt",
            FailureStage::Store,
            "database is locked",
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["frame_number"], 9);
        assert_eq!(value["status"], "failed");
        assert_eq!(value["stage"], "store");
        assert_eq!(value["reason"], "database is locked");
    }
}

//! Outcome of an ingestion call, per view.

use std::time::Duration;

use logfanout_core::RecordError;

use crate::error::{Result, StorageError, WriterError};
use crate::view::View;

/// What one pass (one view) did with the input lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub view: View,
    pub lines: usize,
    /// Rows in batches the store accepted
    pub rows_written: usize,
    /// Rows in batches the store rejected
    pub rows_failed: usize,
    pub parse_skipped: usize,
    pub time_skipped: usize,
    pub batches_submitted: usize,
    pub batches_failed: usize,
    /// First storage error of the pass, kept for diagnosis
    pub first_error: Option<StorageError>,
    /// Status of the last submitted batch (what the single legacy status code held)
    pub final_status: std::result::Result<(), StorageError>,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn new(view: View, lines: usize) -> Self {
        Self {
            view,
            lines,
            rows_written: 0,
            rows_failed: 0,
            parse_skipped: 0,
            time_skipped: 0,
            batches_submitted: 0,
            batches_failed: 0,
            first_error: None,
            final_status: Ok(()),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.batches_failed == 0
    }

    pub fn records_skipped(&self) -> usize {
        self.parse_skipped + self.time_skipped
    }

    pub(crate) fn record_skip(&mut self, err: &RecordError) {
        match err {
            RecordError::Parse(_) => self.parse_skipped += 1,
            RecordError::TimeFormat(_) => self.time_skipped += 1,
        }
    }

    pub(crate) fn record_batch(
        &mut self,
        rows: usize,
        status: std::result::Result<(), StorageError>,
    ) {
        self.batches_submitted += 1;
        match &status {
            Ok(()) => self.rows_written += rows,
            Err(e) => {
                self.batches_failed += 1;
                self.rows_failed += rows;
                if self.first_error.is_none() {
                    self.first_error = Some(e.clone());
                }
            }
        }
        self.final_status = status;
    }

    /// Fold a later pass over the same view into this one.
    pub fn absorb(&mut self, other: &PassReport) {
        self.lines += other.lines;
        self.rows_written += other.rows_written;
        self.rows_failed += other.rows_failed;
        self.parse_skipped += other.parse_skipped;
        self.time_skipped += other.time_skipped;
        self.batches_submitted += other.batches_submitted;
        self.batches_failed += other.batches_failed;
        if self.first_error.is_none() {
            self.first_error = other.first_error.clone();
        }
        if other.batches_submitted > 0 {
            self.final_status = other.final_status.clone();
        }
        self.elapsed += other.elapsed;
    }
}

/// Combined result of both views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Complete,
    ByIdFailed,
    ByDayFailed,
    BothFailed,
}

impl IngestOutcome {
    pub fn is_complete(self) -> bool {
        self == IngestOutcome::Complete
    }
}

/// Result of one `insert_log_batch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub by_id: PassReport,
    pub by_day: PassReport,
}

impl IngestReport {
    pub fn empty() -> Self {
        Self {
            by_id: PassReport::new(View::ById, 0),
            by_day: PassReport::new(View::ByDay, 0),
        }
    }

    pub fn outcome(&self) -> IngestOutcome {
        match (self.by_id.is_success(), self.by_day.is_success()) {
            (true, true) => IngestOutcome::Complete,
            (false, true) => IngestOutcome::ByIdFailed,
            (true, false) => IngestOutcome::ByDayFailed,
            (false, false) => IngestOutcome::BothFailed,
        }
    }

    /// The single status older callers received: whatever the by-day pass
    /// left behind, regardless of how the by-id pass went.
    pub fn legacy_status(&self) -> std::result::Result<(), StorageError> {
        self.by_day.final_status.clone()
    }

    pub fn batches_submitted(&self) -> usize {
        self.by_id.batches_submitted + self.by_day.batches_submitted
    }

    pub fn batches_failed(&self) -> usize {
        self.by_id.batches_failed + self.by_day.batches_failed
    }

    pub fn absorb(&mut self, other: &IngestReport) {
        self.by_id.absorb(&other.by_id);
        self.by_day.absorb(&other.by_day);
    }

    /// Turn any failed view into a `PartialWrite` error.
    pub fn into_result(self) -> Result<IngestReport> {
        let failures: Vec<(View, StorageError)> = [&self.by_id, &self.by_day]
            .into_iter()
            .filter(|pass| !pass.is_success())
            .map(|pass| {
                let err = pass
                    .first_error
                    .clone()
                    .unwrap_or_else(|| StorageError::Batch("unknown failure".to_string()));
                (pass.view, err)
            })
            .collect();

        if failures.is_empty() {
            Ok(self)
        } else {
            Err(WriterError::partial_write(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_pass(view: View) -> PassReport {
        let mut pass = PassReport::new(view, 10);
        pass.record_batch(5, Err(StorageError::Batch("boom".to_string())));
        pass.record_batch(5, Ok(()));
        pass
    }

    #[test]
    fn outcome_tags_each_view() {
        let ok = IngestReport::empty();
        assert_eq!(ok.outcome(), IngestOutcome::Complete);

        let by_id = IngestReport {
            by_id: failed_pass(View::ById),
            by_day: PassReport::new(View::ByDay, 10),
        };
        assert_eq!(by_id.outcome(), IngestOutcome::ByIdFailed);

        let both = IngestReport {
            by_id: failed_pass(View::ById),
            by_day: failed_pass(View::ByDay),
        };
        assert_eq!(both.outcome(), IngestOutcome::BothFailed);
    }

    #[test]
    fn legacy_status_hides_by_id_failures() {
        let report = IngestReport {
            by_id: failed_pass(View::ById),
            by_day: PassReport::new(View::ByDay, 10),
        };
        assert!(report.legacy_status().is_ok());
        assert!(report.clone().into_result().is_err());
    }

    #[test]
    fn final_status_is_last_batch() {
        let pass = failed_pass(View::ByDay);
        // failure then success: the last batch wins
        assert!(pass.final_status.is_ok());
        assert_eq!(pass.batches_failed, 1);
        assert_eq!(pass.rows_written, 5);
        assert_eq!(pass.rows_failed, 5);
        assert_eq!(pass.first_error, Some(StorageError::Batch("boom".to_string())));
    }

    #[test]
    fn absorb_accumulates() {
        let mut total = IngestReport::empty();
        let call = IngestReport {
            by_id: failed_pass(View::ById),
            by_day: failed_pass(View::ByDay),
        };
        total.absorb(&call);
        total.absorb(&call);
        assert_eq!(total.batches_submitted(), 8);
        assert_eq!(total.batches_failed(), 4);
        assert_eq!(total.by_id.lines, 20);
    }
}

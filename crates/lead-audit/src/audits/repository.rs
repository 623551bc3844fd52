use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::{AuditId, AuditRecord, AuditSubmission, UpdateCode};
use super::report::ReportReference;
use super::scoring::ScoreSet;

/// Persistence boundary for audit records. Implementations own id assignment.
pub trait AuditStore: Send + Sync {
    /// Fails with [`StoreError::UpdateCodeTaken`] when another record already holds the code.
    fn create(
        &self,
        submission: AuditSubmission,
        update_code: UpdateCode,
        created_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError>;
    fn find_by_id(&self, id: AuditId) -> Result<Option<AuditRecord>, StoreError>;
    /// Newest first; the email comparison ignores ASCII case.
    fn find_by_email(&self, email: &str) -> Result<Vec<AuditRecord>, StoreError>;
    /// Matches only when both the code and the email belong to the same record.
    fn find_by_update_code(
        &self,
        code: &UpdateCode,
        email: &str,
    ) -> Result<Option<AuditRecord>, StoreError>;
    fn update_code_in_use(&self, code: &UpdateCode) -> Result<bool, StoreError>;
    fn update(
        &self,
        id: AuditId,
        submission: AuditSubmission,
        updated_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError>;
    fn update_scores(&self, id: AuditId, scores: ScoreSet) -> Result<(), StoreError>;
    fn update_report_reference(
        &self,
        id: AuditId,
        reference: ReportReference,
    ) -> Result<(), StoreError>;
    /// Newest first.
    fn list_recent(&self, limit: usize, offset: usize) -> Result<Vec<AuditRecord>, StoreError>;
    fn stats(&self, now: DateTime<Utc>) -> Result<AuditStats, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("audit {0} not found")]
    NotFound(AuditId),
    #[error("update code {0} is already assigned")]
    UpdateCodeTaken(UpdateCode),
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub average_score: u8,
}

impl AuditStats {
    /// `today` shares the UTC calendar date with `now`; `this_week` is the trailing seven days.
    /// Unscored audits (overall 0) are left out of the average.
    pub fn from_records<'a, I>(records: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a AuditRecord>,
    {
        let week_start = now - Duration::days(7);
        let mut stats = Self::default();
        let mut scored = 0u64;
        let mut score_sum = 0u64;

        for record in records {
            stats.total += 1;
            if record.created_at.date_naive() == now.date_naive() {
                stats.today += 1;
            }
            if record.created_at >= week_start {
                stats.this_week += 1;
            }
            if record.scores.overall_score > 0 {
                scored += 1;
                score_sum += u64::from(record.scores.overall_score);
            }
        }

        if scored > 0 {
            // round half up
            stats.average_score = ((score_sum * 2 + scored) / (scored * 2)) as u8;
        }
        stats
    }
}

/// Paging window echoed back with dashboard listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 100;
}

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    AuditId, AuditRecord, AuditSubmission, AuditView, SubmissionError, UpdateCode,
};
use super::notifications::{EmailMessage, EmailTemplates, Notifier};
use super::report::{ReportError, ReportReference, ReportRenderer};
use super::repository::{AuditStats, AuditStore, Pagination, StoreError};
use super::scoring::{compute_scores, ScoreSet};
use super::update_code::{
    allocate_update_code, UpdateCodeError, MAX_ATTEMPTS as UPDATE_CODE_ATTEMPTS,
};
use crate::config::ReportConfig;

/// Service composing the audit store, report renderer, and e-mail notifier.
pub struct AuditService<S, N, R> {
    store: Arc<S>,
    notifier: Arc<N>,
    renderer: Arc<R>,
    templates: EmailTemplates,
    reports: ReportConfig,
}

/// What the submitter needs to come back later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub audit_id: AuditId,
    pub update_code: UpdateCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    pub audit_id: AuditId,
    pub report_url: String,
    pub scores: ScoreSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionOutcome {
    pub audit_id: AuditId,
    pub scores: ScoreSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub audits: Vec<AuditView>,
    pub stats: AuditStats,
    pub pagination: Pagination,
}

impl<S, N, R> AuditService<S, N, R>
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        renderer: Arc<R>,
        reports: ReportConfig,
        templates: EmailTemplates,
    ) -> Self {
        Self {
            store,
            notifier,
            renderer,
            templates,
            reports,
        }
    }

    /// Validate and store a questionnaire, then announce it to the submitter and admin.
    pub fn submit(
        &self,
        submission: AuditSubmission,
    ) -> Result<SubmissionReceipt, AuditServiceError> {
        let submission = submission.normalize()?;
        let mut attempt = 1;
        let record = loop {
            let update_code = self.allocate_code()?;
            match self.store.create(submission.clone(), update_code, Utc::now()) {
                Err(StoreError::UpdateCodeTaken(code)) if attempt < UPDATE_CODE_ATTEMPTS => {
                    warn!(%code, attempt, "update code claimed concurrently; drawing again");
                    attempt += 1;
                }
                created => break created?,
            }
        };

        info!(audit_id = %record.id, business = %record.submission.business_name, "audit created");
        self.dispatch(self.templates.audit_started(&record));

        Ok(SubmissionReceipt {
            audit_id: record.id,
            update_code: record.update_code,
        })
    }

    /// Score the stored answers, render a fresh report, and send the download link.
    pub async fn generate_report(&self, id: AuditId) -> Result<ReportOutcome, AuditServiceError> {
        let mut record = self.get(id)?;
        let scores = compute_scores(&record.submission);
        self.store.update_scores(id, scores)?;
        record.scores = scores;

        let reference = self.render(&record, scores).await?;
        let report_url = self.reports.report_url(&reference.file_name);
        self.store.update_report_reference(id, reference)?;

        info!(audit_id = %id, overall = scores.overall_score, %report_url, "report generated");
        self.dispatch(self.templates.report_ready(&record, &report_url));

        Ok(ReportOutcome {
            audit_id: id,
            report_url,
            scores,
        })
    }

    pub fn get(&self, id: AuditId) -> Result<AuditRecord, AuditServiceError> {
        self.store
            .find_by_id(id)?
            .ok_or(AuditServiceError::NotFound(id))
    }

    pub fn by_email(&self, email: &str) -> Result<Vec<AuditRecord>, AuditServiceError> {
        Ok(self.store.find_by_email(email.trim())?)
    }

    /// Both the code and the email must match one record; failures never say which one was wrong.
    pub fn verify_update_code(
        &self,
        code: &str,
        email: &str,
    ) -> Result<AuditRecord, AuditServiceError> {
        let code = UpdateCode::parse(code).ok_or(AuditServiceError::InvalidCredentials)?;
        self.store
            .find_by_update_code(&code, email.trim())?
            .ok_or(AuditServiceError::InvalidCredentials)
    }

    /// Replace the answers behind an update code. The stored email is kept as-is, and a
    /// report is only regenerated when one already existed.
    pub async fn revise(
        &self,
        code: &str,
        email: &str,
        submission: AuditSubmission,
    ) -> Result<RevisionOutcome, AuditServiceError> {
        let existing = self.verify_update_code(code, email)?;
        let mut submission = submission.normalize()?;
        submission.email = existing.submission.email.clone();

        let mut record = self.store.update(existing.id, submission, Utc::now())?;
        let scores = compute_scores(&record.submission);
        self.store.update_scores(record.id, scores)?;
        record.scores = scores;

        let report_url = if existing.report_generated() {
            let reference = self.render(&record, scores).await?;
            let url = self.reports.report_url(&reference.file_name);
            self.store.update_report_reference(record.id, reference)?;
            self.dispatch(self.templates.report_updated(&record, &url));
            Some(url)
        } else {
            None
        };

        info!(audit_id = %record.id, overall = scores.overall_score, "audit revised");
        Ok(RevisionOutcome {
            audit_id: record.id,
            scores,
            report_url,
        })
    }

    pub fn recent(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRecord>, AuditServiceError> {
        Ok(self.store.list_recent(limit, offset)?)
    }

    pub fn dashboard(&self, limit: usize, offset: usize) -> Result<Dashboard, AuditServiceError> {
        let audits = self
            .recent(limit, offset)?
            .iter()
            .map(AuditRecord::view)
            .collect();
        let stats = self.stats()?;

        Ok(Dashboard {
            audits,
            stats,
            pagination: Pagination {
                limit,
                offset,
                total: stats.total,
            },
        })
    }

    pub fn stats(&self) -> Result<AuditStats, AuditServiceError> {
        Ok(self.store.stats(Utc::now())?)
    }

    pub fn report_config(&self) -> &ReportConfig {
        &self.reports
    }

    fn allocate_code(&self) -> Result<UpdateCode, AuditServiceError> {
        let mut rng = rand::rng();
        allocate_update_code(&mut rng, |code| self.store.update_code_in_use(code))
            .map_err(AuditServiceError::from)
    }

    async fn render(
        &self,
        record: &AuditRecord,
        scores: ScoreSet,
    ) -> Result<ReportReference, AuditServiceError> {
        let renderer = Arc::clone(&self.renderer);
        let record = record.clone();
        let reference = tokio::task::spawn_blocking(move || {
            renderer.render(&record, &scores, Utc::now())
        })
        .await??;
        Ok(reference)
    }

    /// Fire-and-forget: messages go out in order on a spawned task, failures are only logged.
    fn dispatch(&self, messages: [EmailMessage; 2]) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            for message in messages {
                let to = message.to.clone();
                if let Err(err) = notifier.send(message).await {
                    warn!(%to, error = %err, "failed to send notification");
                }
            }
        });
    }
}

/// Error raised by the audit service.
#[derive(Debug, thiserror::Error)]
pub enum AuditServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("audit {0} not found")]
    NotFound(AuditId),
    #[error("invalid update code or email")]
    InvalidCredentials,
    #[error(transparent)]
    Store(StoreError),
    #[error("unable to allocate update code")]
    UpdateCodeExhausted,
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("report rendering task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<StoreError> for AuditServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::UpdateCodeTaken(_) => Self::UpdateCodeExhausted,
            other => Self::Store(other),
        }
    }
}

impl From<UpdateCodeError> for AuditServiceError {
    fn from(err: UpdateCodeError) -> Self {
        match err {
            UpdateCodeError::Exhausted(_) => Self::UpdateCodeExhausted,
            UpdateCodeError::Store(store) => store.into(),
        }
    }
}

//! Digital marketing audit intake, scoring, report rendering, and follow-up e-mails.

pub mod domain;
pub mod notifications;
pub mod recommendations;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub(crate) mod update_code;

#[cfg(test)]
mod tests;

pub use domain::{
    AuditId, AuditRecord, AuditSubmission, AuditView, BusinessSize, Capabilities, Industry,
    MonthlyBudget, SubmissionError, UpdateCode,
};
pub use notifications::{
    EmailApiNotifier, EmailAttachment, EmailMessage, EmailTemplates, LogNotifier,
    NotificationError, Notifier,
};
pub use recommendations::{select_recommendations, Priority, Recommendation};
pub use report::{
    PdfReportRenderer, ReportBranding, ReportDocument, ReportError, ReportPage, ReportReference,
    ReportRenderer,
};
pub use repository::{AuditStats, AuditStore, Pagination, StoreError};
pub use router::audit_router;
pub use scoring::{compute_scores, ScoreCategory, ScoreLevel, ScoreSet};
pub use service::{
    AuditService, AuditServiceError, Dashboard, ReportOutcome, RevisionOutcome, SubmissionReceipt,
};
pub use update_code::{UpdateCodeError, MAX_ATTEMPTS as UPDATE_CODE_ATTEMPTS};

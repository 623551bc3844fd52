mod document;
mod pdf;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AuditId, AuditRecord};
use super::scoring::ScoreSet;

pub use document::{
    wrap_text, CategoryBar, ChecklistItem, ReportBranding, ReportDocument, ReportPage, NEXT_STEPS,
};
pub use pdf::PdfReportRenderer;

/// Pointer to a rendered artifact. `file_name` is what the public URL is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReference {
    pub file_name: String,
    pub path: PathBuf,
}

/// Produces a durable report artifact for an audit.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        record: &AuditRecord,
        scores: &ScoreSet,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportReference, ReportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unable to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pdf encoding failed: {0}")]
    Encoding(String),
    #[error("no free report file name for audit {0}")]
    NameExhausted(AuditId),
}

/// `audit-{id}-{unix_millis}.pdf`
pub fn report_file_name(id: AuditId, generated_at: DateTime<Utc>) -> String {
    format!("audit-{}-{}.pdf", id, generated_at.timestamp_millis())
}

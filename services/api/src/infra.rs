use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lead_audit::audits::{
    AuditId, AuditRecord, AuditStats, AuditStore, AuditSubmission, EmailApiNotifier,
    EmailMessage, EmailTemplates, LogNotifier, NotificationError, Notifier, ReportReference,
    ScoreSet, StoreError, UpdateCode,
};
use lead_audit::config::{AppConfig, NotificationConfig};
use lead_audit::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) report_dir: Arc<PathBuf>,
}

#[derive(Default)]
struct AuditTable {
    last_id: u64,
    records: BTreeMap<AuditId, AuditRecord>,
}

/// Process-local audit store; ids start at 1 and records live until shutdown.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditStore {
    table: Arc<Mutex<AuditTable>>,
}

impl InMemoryAuditStore {
    fn newest_first<'a>(records: impl Iterator<Item = &'a AuditRecord>) -> Vec<AuditRecord> {
        let mut records: Vec<AuditRecord> = records.cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }

    fn with_record<T>(
        &self,
        id: AuditId,
        apply: impl FnOnce(&mut AuditRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.table.lock().expect("audit store mutex poisoned");
        let record = guard.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(apply(record))
    }
}

impl AuditStore for InMemoryAuditStore {
    fn create(
        &self,
        submission: AuditSubmission,
        update_code: UpdateCode,
        created_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        let mut guard = self.table.lock().expect("audit store mutex poisoned");
        if guard
            .records
            .values()
            .any(|record| record.update_code == update_code)
        {
            return Err(StoreError::UpdateCodeTaken(update_code));
        }
        guard.last_id += 1;
        let record = AuditRecord {
            id: AuditId(guard.last_id),
            submission,
            scores: ScoreSet::default(),
            report: None,
            update_code,
            created_at,
            updated_at: created_at,
        };
        guard.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn find_by_id(&self, id: AuditId) -> Result<Option<AuditRecord>, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        Ok(guard.records.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Vec<AuditRecord>, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        Ok(Self::newest_first(
            guard
                .records
                .values()
                .filter(|record| record.email_matches(email)),
        ))
    }

    fn find_by_update_code(
        &self,
        code: &UpdateCode,
        email: &str,
    ) -> Result<Option<AuditRecord>, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        Ok(guard
            .records
            .values()
            .find(|record| &record.update_code == code && record.email_matches(email))
            .cloned())
    }

    fn update_code_in_use(&self, code: &UpdateCode) -> Result<bool, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        Ok(guard
            .records
            .values()
            .any(|record| &record.update_code == code))
    }

    fn update(
        &self,
        id: AuditId,
        submission: AuditSubmission,
        updated_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        self.with_record(id, |record| {
            record.submission = submission;
            record.updated_at = updated_at;
            record.clone()
        })
    }

    fn update_scores(&self, id: AuditId, scores: ScoreSet) -> Result<(), StoreError> {
        self.with_record(id, |record| record.scores = scores)
    }

    fn update_report_reference(
        &self,
        id: AuditId,
        reference: ReportReference,
    ) -> Result<(), StoreError> {
        self.with_record(id, |record| record.report = Some(reference))
    }

    fn list_recent(&self, limit: usize, offset: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        let mut records = Self::newest_first(guard.records.values());
        Ok(records.drain(..).skip(offset).take(limit).collect())
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<AuditStats, StoreError> {
        let guard = self.table.lock().expect("audit store mutex poisoned");
        Ok(AuditStats::from_records(guard.records.values(), now))
    }
}

/// Delivery backend picked at startup from the notification settings.
pub(crate) enum ConfiguredNotifier {
    Api(EmailApiNotifier),
    Log(LogNotifier),
}

impl ConfiguredNotifier {
    pub(crate) fn from_config(config: &NotificationConfig) -> Self {
        if config.api_key.is_none() {
            return Self::Log(LogNotifier);
        }
        match EmailApiNotifier::new(config) {
            Ok(notifier) => Self::Api(notifier),
            Err(err) => {
                warn!(error = %err, "email API unavailable; falling back to log-only delivery");
                Self::Log(LogNotifier)
            }
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Api(_) => "email-api",
            Self::Log(_) => "log-only",
        }
    }
}

#[async_trait]
impl Notifier for ConfiguredNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        match self {
            Self::Api(notifier) => notifier.send(message).await,
            Self::Log(notifier) => notifier.send(message).await,
        }
    }
}

/// Keeps every message in memory; used by the CLI demo to show what would be sent.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
}

impl InMemoryNotifier {
    pub(crate) fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let mut guard = self.messages.lock().expect("notifier mutex poisoned");
        guard.push(message);
        Ok(())
    }
}

pub(crate) fn email_templates(config: &AppConfig) -> EmailTemplates {
    EmailTemplates::new(
        config.reports.brand_name.clone(),
        config.notifications.admin_email.clone(),
        config.reports.booking_url.clone(),
    )
}

/// Read a questionnaire JSON file and apply the same validation as the HTTP intake.
pub(crate) fn load_submission(path: &Path) -> Result<AuditSubmission, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let submission: AuditSubmission = serde_json::from_str(&raw)?;
    Ok(submission.normalize()?)
}

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::audits::domain::{AuditId, AuditRecord, AuditSubmission, Capabilities, UpdateCode};
use crate::audits::notifications::{EmailMessage, EmailTemplates, NotificationError, Notifier};
use crate::audits::report::{report_file_name, ReportError, ReportReference, ReportRenderer};
use crate::audits::repository::{AuditStats, AuditStore, StoreError};
use crate::audits::scoring::ScoreSet;
use crate::audits::{audit_router, AuditService};
use crate::config::{AdminConfig, ReportConfig};

pub(super) const ADMIN_TOKEN: &str = "s3cret-admin";
pub(super) const BASE_URL: &str = "https://audit.test";

/// Website 70, social 70, marketing 35, automation 25, overall 50.
pub(super) fn submission() -> AuditSubmission {
    AuditSubmission {
        business_name: "Harbor Bakery".to_string(),
        contact_name: "Sam Ortiz".to_string(),
        email: "sam@harborbakery.com".to_string(),
        phone: Some("555-0100".to_string()),
        website: Some("https://harborbakery.com".to_string()),
        location: Some("Portland, ME".to_string()),
        industry: None,
        business_size: None,
        target_audience: None,
        marketing_goals: None,
        monthly_budget: None,
        biggest_challenges: None,
        social_media_platforms: ["facebook", "instagram"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        current_marketing_tools: BTreeSet::new(),
        capabilities: Capabilities {
            has_website: true,
            has_seo: true,
            has_social_media: true,
            has_email_marketing: true,
            ..Capabilities::default()
        },
    }
}

pub(super) fn submission_json() -> Value {
    json!({
        "business_name": "Harbor Bakery",
        "contact_name": "Sam Ortiz",
        "email": "sam@harborbakery.com",
        "industry": "retail",
        "social_media_platforms": ["facebook", "instagram"],
        "has_website": true,
        "has_seo": true,
        "has_social_media": true,
        "has_email_marketing": true
    })
}

pub(super) fn report_config() -> ReportConfig {
    ReportConfig {
        output_dir: PathBuf::from("unused"),
        public_base_url: BASE_URL.to_string(),
        brand_name: "Lead Audit".to_string(),
        booking_url: Some("https://audit.test/book".to_string()),
        website_url: None,
    }
}

pub(super) fn templates() -> EmailTemplates {
    EmailTemplates::new("Lead Audit", "ops@audit.test", None)
}

pub(super) type TestService = AuditService<MemoryStore, RecordingNotifier, StubRenderer>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
    Arc<StubRenderer>,
) {
    build_service_with_store(MemoryStore::default())
}

pub(super) fn build_service_with_store(
    store: MemoryStore,
) -> (
    TestService,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
    Arc<StubRenderer>,
) {
    let store = Arc::new(store);
    let notifier = Arc::new(RecordingNotifier::default());
    let renderer = Arc::new(StubRenderer::default());
    let service = AuditService::new(
        store.clone(),
        notifier.clone(),
        renderer.clone(),
        report_config(),
        templates(),
    );
    (service, store, notifier, renderer)
}

pub(super) fn router_with_service<S, N, R>(
    service: AuditService<S, N, R>,
    admin_token: Option<&str>,
) -> axum::Router
where
    S: AuditStore + 'static,
    N: Notifier + 'static,
    R: ReportRenderer + 'static,
{
    audit_router(
        Arc::new(service),
        AdminConfig {
            api_token: admin_token.map(str::to_string),
        },
    )
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    records: BTreeMap<AuditId, AuditRecord>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    saturated: bool,
    races_to_lose: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Reports every update code as taken.
    pub(super) fn saturated() -> Self {
        Self {
            saturated: true,
            ..Self::default()
        }
    }

    /// The next `count` creates find their code claimed by a concurrent submission.
    pub(super) fn losing_races(count: usize) -> Self {
        Self {
            races_to_lose: Arc::new(AtomicUsize::new(count)),
            ..Self::default()
        }
    }

    pub(super) fn len(&self) -> usize {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .records
            .len()
    }

    pub(super) fn record(&self, id: AuditId) -> AuditRecord {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .records
            .get(&id)
            .cloned()
            .expect("record present")
    }

    fn newest_first(records: impl Iterator<Item = AuditRecord>) -> Vec<AuditRecord> {
        let mut records: Vec<_> = records.collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }

    fn modify(
        &self,
        id: AuditId,
        change: impl FnOnce(&mut AuditRecord),
    ) -> Result<AuditRecord, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        change(record);
        Ok(record.clone())
    }
}

impl AuditStore for MemoryStore {
    fn create(
        &self,
        submission: AuditSubmission,
        update_code: UpdateCode,
        created_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let lost_race = self
            .races_to_lose
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if lost_race
            || state
                .records
                .values()
                .any(|record| record.update_code == update_code)
        {
            return Err(StoreError::UpdateCodeTaken(update_code));
        }
        state.next_id += 1;
        let record = AuditRecord {
            id: AuditId(state.next_id),
            submission,
            scores: ScoreSet::default(),
            report: None,
            update_code,
            created_at,
            updated_at: created_at,
        };
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn find_by_id(&self, id: AuditId) -> Result<Option<AuditRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.records.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Vec<AuditRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(Self::newest_first(
            state
                .records
                .values()
                .filter(|record| record.email_matches(email))
                .cloned(),
        ))
    }

    fn find_by_update_code(
        &self,
        code: &UpdateCode,
        email: &str,
    ) -> Result<Option<AuditRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .records
            .values()
            .find(|record| &record.update_code == code && record.email_matches(email))
            .cloned())
    }

    fn update_code_in_use(&self, code: &UpdateCode) -> Result<bool, StoreError> {
        if self.saturated {
            return Ok(true);
        }
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
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
        self.modify(id, |record| {
            record.submission = submission;
            record.updated_at = updated_at;
        })
    }

    fn update_scores(&self, id: AuditId, scores: ScoreSet) -> Result<(), StoreError> {
        self.modify(id, |record| record.scores = scores).map(|_| ())
    }

    fn update_report_reference(
        &self,
        id: AuditId,
        reference: ReportReference,
    ) -> Result<(), StoreError> {
        self.modify(id, |record| record.report = Some(reference))
            .map(|_| ())
    }

    fn list_recent(&self, limit: usize, offset: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(Self::newest_first(state.records.values().cloned())
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<AuditStats, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(AuditStats::from_records(state.records.values(), now))
    }
}

pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn offline<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl AuditStore for UnavailableStore {
    fn create(
        &self,
        _submission: AuditSubmission,
        _update_code: UpdateCode,
        _created_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        Self::offline()
    }

    fn find_by_id(&self, _id: AuditId) -> Result<Option<AuditRecord>, StoreError> {
        Self::offline()
    }

    fn find_by_email(&self, _email: &str) -> Result<Vec<AuditRecord>, StoreError> {
        Self::offline()
    }

    fn find_by_update_code(
        &self,
        _code: &UpdateCode,
        _email: &str,
    ) -> Result<Option<AuditRecord>, StoreError> {
        Self::offline()
    }

    fn update_code_in_use(&self, _code: &UpdateCode) -> Result<bool, StoreError> {
        Self::offline()
    }

    fn update(
        &self,
        _id: AuditId,
        _submission: AuditSubmission,
        _updated_at: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        Self::offline()
    }

    fn update_scores(&self, _id: AuditId, _scores: ScoreSet) -> Result<(), StoreError> {
        Self::offline()
    }

    fn update_report_reference(
        &self,
        _id: AuditId,
        _reference: ReportReference,
    ) -> Result<(), StoreError> {
        Self::offline()
    }

    fn list_recent(&self, _limit: usize, _offset: usize) -> Result<Vec<AuditRecord>, StoreError> {
        Self::offline()
    }

    fn stats(&self, _now: DateTime<Utc>) -> Result<AuditStats, StoreError> {
        Self::offline()
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
}

impl RecordingNotifier {
    pub(super) fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }

    /// Dispatch happens on spawned tasks; poll until `count` messages arrived.
    pub(super) async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..200 {
            let messages = self.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {count} notifications, saw {}",
            self.messages().len()
        );
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct FailingNotifier {
    pub(super) attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: EmailMessage) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::HttpStatus(503))
    }
}

/// Hands out unique references without touching the filesystem.
#[derive(Default)]
pub(super) struct StubRenderer {
    renders: AtomicUsize,
}

impl StubRenderer {
    pub(super) fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl ReportRenderer for StubRenderer {
    fn render(
        &self,
        record: &AuditRecord,
        _scores: &ScoreSet,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportReference, ReportError> {
        let sequence = self.renders.fetch_add(1, Ordering::SeqCst) as i64;
        let file_name = report_file_name(
            record.id,
            generated_at + chrono::Duration::milliseconds(sequence),
        );
        Ok(ReportReference {
            path: PathBuf::from("unused").join(&file_name),
            file_name,
        })
    }
}

pub(super) struct FailingRenderer;

impl ReportRenderer for FailingRenderer {
    fn render(
        &self,
        _record: &AuditRecord,
        _scores: &ScoreSet,
        _generated_at: DateTime<Utc>,
    ) -> Result<ReportReference, ReportError> {
        Err(ReportError::Encoding("font table missing".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

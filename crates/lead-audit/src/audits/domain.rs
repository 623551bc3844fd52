use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IntoDeserializer};
use serde::{Deserialize, Serialize};

use super::report::ReportReference;
use super::scoring::ScoreSet;

/// Identifier assigned by the store when an audit is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub u64);

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four digit token the submitter uses to come back and revise their answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateCode(String);

impl UpdateCode {
    pub const MIN: u16 = 1000;
    pub const MAX: u16 = 9999;

    pub fn from_number(value: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value.to_string()))
    }

    /// Accepts the raw form field; anything but exactly four digits is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 4 || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        trimmed.parse::<u16>().ok().and_then(Self::from_number)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpdateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Industry {
    Technology,
    Healthcare,
    Retail,
    ProfessionalServices,
    Finance,
    RealEstate,
    Education,
    Hospitality,
    Manufacturing,
    Nonprofit,
    Other,
}

impl Industry {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Healthcare => "Healthcare",
            Self::Retail => "Retail & E-commerce",
            Self::ProfessionalServices => "Professional Services",
            Self::Finance => "Finance & Banking",
            Self::RealEstate => "Real Estate",
            Self::Education => "Education",
            Self::Hospitality => "Hospitality & Tourism",
            Self::Manufacturing => "Manufacturing",
            Self::Nonprofit => "Non-Profit",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessSize {
    Solo,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl BusinessSize {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solo => "Solo/Freelancer (1)",
            Self::Small => "Small (2-10 employees)",
            Self::Medium => "Medium (11-50 employees)",
            Self::Large => "Large (51-200 employees)",
            Self::Enterprise => "Enterprise (200+ employees)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonthlyBudget {
    #[serde(rename = "0-500")]
    UpTo500,
    #[serde(rename = "500-1000")]
    UpTo1000,
    #[serde(rename = "1000-2500")]
    UpTo2500,
    #[serde(rename = "2500-5000")]
    UpTo5000,
    #[serde(rename = "5000-10000")]
    UpTo10000,
    #[serde(rename = "10000+")]
    Over10000,
    #[serde(rename = "not-sure")]
    NotSure,
}

impl MonthlyBudget {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpTo500 => "$0 - $500",
            Self::UpTo1000 => "$500 - $1,000",
            Self::UpTo2500 => "$1,000 - $2,500",
            Self::UpTo5000 => "$2,500 - $5,000",
            Self::UpTo10000 => "$5,000 - $10,000",
            Self::Over10000 => "$10,000+",
            Self::NotSure => "Not sure yet",
        }
    }
}

/// The eight yes/no answers from the "current marketing" step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub has_website: bool,
    pub has_social_media: bool,
    pub has_email_marketing: bool,
    pub has_seo: bool,
    pub has_paid_ads: bool,
    pub has_analytics: bool,
    pub has_crm: bool,
    pub has_automation: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            has_website: true,
            has_social_media: true,
            has_email_marketing: true,
            has_seo: true,
            has_paid_ads: true,
            has_analytics: true,
            has_crm: true,
            has_automation: true,
        }
    }

    /// Checklist order used by the report, paired with display labels.
    pub fn checklist(&self) -> [(&'static str, bool); 8] {
        [
            ("Website", self.has_website),
            ("Social Media", self.has_social_media),
            ("Email Marketing", self.has_email_marketing),
            ("SEO", self.has_seo),
            ("Paid Advertising", self.has_paid_ads),
            ("Analytics", self.has_analytics),
            ("CRM System", self.has_crm),
            ("Marketing Automation", self.has_automation),
        ]
    }
}

/// Flat questionnaire payload as posted by the multi-step form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSubmission {
    pub business_name: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub industry: Option<Industry>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub business_size: Option<BusinessSize>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub marketing_goals: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub monthly_budget: Option<MonthlyBudget>,
    #[serde(default)]
    pub biggest_challenges: Option<String>,
    #[serde(default)]
    pub social_media_platforms: BTreeSet<String>,
    #[serde(default)]
    pub current_marketing_tools: BTreeSet<String>,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

impl AuditSubmission {
    /// Trim free text, drop blank optionals, and enforce the required identity fields.
    pub fn normalize(mut self) -> Result<Self, SubmissionError> {
        self.business_name = required(self.business_name, "business_name")?;
        self.contact_name = required(self.contact_name, "contact_name")?;
        self.email = required(self.email, "email")?;
        if !looks_like_email(&self.email) {
            return Err(SubmissionError::InvalidEmail(self.email));
        }

        for field in [
            &mut self.phone,
            &mut self.website,
            &mut self.location,
            &mut self.target_audience,
            &mut self.marketing_goals,
            &mut self.biggest_challenges,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }

        self.social_media_platforms = normalize_ids(self.social_media_platforms);
        self.current_marketing_tools = normalize_ids(self.current_marketing_tools);
        Ok(self)
    }

    pub fn platform_count(&self) -> usize {
        self.social_media_platforms.len()
    }
}

/// Unselected dropdowns post `""`; treat that like an absent field.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => T::deserialize(value.to_string().into_deserializer()).map(Some),
    }
}

fn required(value: String, field: &'static str) -> Result<String, SubmissionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SubmissionError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn normalize_ids(ids: BTreeSet<String>) -> BTreeSet<String> {
    ids.into_iter()
        .map(|id| id.trim().to_ascii_lowercase())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Rejection raised before anything touches the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

/// One stored questionnaire with its computed scores and report status.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub id: AuditId,
    pub submission: AuditSubmission,
    pub scores: ScoreSet,
    pub report: Option<ReportReference>,
    pub update_code: UpdateCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn report_generated(&self) -> bool {
        self.report.is_some()
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.submission.email.eq_ignore_ascii_case(email.trim())
    }

    /// Public projection; never exposes the update code.
    pub fn view(&self) -> AuditView {
        AuditView {
            id: self.id,
            submission: self.submission.clone(),
            scores: self.scores,
            report_generated: self.report_generated(),
            report_file: self.report.as_ref().map(|report| report.file_name.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditView {
    pub id: AuditId,
    #[serde(flatten)]
    pub submission: AuditSubmission,
    #[serde(flatten)]
    pub scores: ScoreSet,
    pub report_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use std::time::Duration;

use async_trait::async_trait;
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use tracing::info;

use super::domain::AuditRecord;
use crate::config::NotificationConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One outbound e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// File carried inline with a message; `content` is already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Plain-text alternative: the HTML body with every tag removed.
    pub fn text(&self) -> String {
        strip_tags(&self.html)
    }
}

/// Outbound e-mail hook.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email API returned HTTP {0}")]
    HttpStatus(u16),
    #[error("email API key is not configured")]
    MissingApiKey,
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: String,
    to: &'a str,
    reply_to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: String,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    attachments: &'a [EmailAttachment],
}

/// Sends through a transactional e-mail HTTP API (`POST {api_url}/emails`, bearer auth).
pub struct EmailApiNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    reply_to: String,
}

impl EmailApiNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(NotificationError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", config.api_url),
            api_key,
            from: format!("{} <{}>", config.from_name, config.admin_email),
            reply_to: config.admin_email.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for EmailApiNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let payload = EmailPayload {
            from: self.from.clone(),
            to: &message.to,
            reply_to: &self.reply_to,
            subject: &message.subject,
            html: &message.html,
            text: message.text(),
            attachments: &message.attachments,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotificationError::HttpStatus(response.status().as_u16()));
        }

        info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Stand-in used when no API key is configured; records the message in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "email delivery disabled; message logged only"
        );
        Ok(())
    }
}

/// Builds the submitter and admin messages for each audit milestone.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    brand_name: String,
    admin_email: String,
    booking_url: Option<String>,
}

impl EmailTemplates {
    pub fn new(
        brand_name: impl Into<String>,
        admin_email: impl Into<String>,
        booking_url: Option<String>,
    ) -> Self {
        Self {
            brand_name: brand_name.into(),
            admin_email: admin_email.into(),
            booking_url,
        }
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    /// Submitter confirmation plus the admin heads-up.
    pub fn audit_started(&self, record: &AuditRecord) -> [EmailMessage; 2] {
        let business = encode_text(&record.submission.business_name);
        let body = format!(
            "<h2>Hello {business}!</h2>\
             <p>Thank you for starting your digital marketing audit with {brand}.</p>\
             <p><strong>What happens next?</strong></p>\
             <ul>\
             <li>We're analyzing your digital presence</li>\
             <li>Evaluating your marketing strategies</li>\
             <li>Assessing your automation capabilities</li>\
             <li>Preparing personalized recommendations</li>\
             </ul>\
             <p>Your audit report will be ready shortly and sent to your email.</p>{cta}",
            brand = encode_text(&self.brand_name),
            cta = self.booking_block("In the meantime, you can book a strategy call:"),
        );

        [
            EmailMessage::new(
                record.submission.email.clone(),
                "Your Digital Audit Has Started!",
                self.layout("Audit Started!", &body),
            ),
            self.admin_copy("New Audit Started", record, None),
        ]
    }

    pub fn report_ready(&self, record: &AuditRecord, report_url: &str) -> [EmailMessage; 2] {
        let body = format!(
            "<h2>Hello {business}!</h2>\
             <p>Great news! Your digital marketing audit is complete.</p>\
             <p>Your report covers website and SEO, social media, marketing strategy, \
             automation, and a prioritized list of recommendations.</p>\
             <p><a href=\"{url}\">Download PDF Report</a></p>{cta}",
            business = encode_text(&record.submission.business_name),
            url = encode_double_quoted_attribute(report_url),
            cta = self.booking_block("Want to discuss your results and create an action plan?"),
        );

        [
            EmailMessage::new(
                record.submission.email.clone(),
                "Your Digital Audit Report is Ready!",
                self.layout("Your Report is Ready!", &body),
            ),
            self.admin_copy("Audit Completed", record, Some(report_url)),
        ]
    }

    pub fn report_updated(&self, record: &AuditRecord, report_url: &str) -> [EmailMessage; 2] {
        let body = format!(
            "<h2>Hello {business}!</h2>\
             <p>We regenerated your audit report with the answers you just updated.</p>\
             <p><a href=\"{url}\">Download Updated PDF Report</a></p>",
            business = encode_text(&record.submission.business_name),
            url = encode_double_quoted_attribute(report_url),
        );

        [
            EmailMessage::new(
                record.submission.email.clone(),
                "Your Digital Audit Report Has Been Updated",
                self.layout("Report Updated", &body),
            ),
            self.admin_copy("Audit Updated", record, Some(report_url)),
        ]
    }

    fn admin_copy(
        &self,
        heading: &str,
        record: &AuditRecord,
        report_url: Option<&str>,
    ) -> EmailMessage {
        let business = encode_text(&record.submission.business_name);
        let mut html = format!(
            "<h2>{heading}</h2>\
             <p><strong>Business:</strong> {business}</p>\
             <p><strong>Email:</strong> {email}</p>\
             <p><strong>Audit ID:</strong> {id}</p>",
            email = encode_text(&record.submission.email),
            id = record.id,
        );
        if let Some(url) = report_url {
            html.push_str(&format!(
                "<p><strong>Report:</strong> <a href=\"{0}\">{0}</a></p>",
                encode_double_quoted_attribute(url)
            ));
        }

        EmailMessage::new(
            self.admin_email.clone(),
            format!("{heading} - {}", record.submission.business_name),
            html,
        )
    }

    fn booking_block(&self, lead: &str) -> String {
        match &self.booking_url {
            Some(url) => format!(
                "<p>{lead}</p><p><a href=\"{}\">Book a Strategy Call</a></p>",
                encode_double_quoted_attribute(url)
            ),
            None => String::new(),
        }
    }

    fn layout(&self, title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
             <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\
             <div style=\"background: #667eea; color: white; padding: 30px; text-align: center;\">\
             <h1>{title}</h1></div>\
             <div style=\"background: #f9f9f9; padding: 30px;\">{body}</div>\
             <p style=\"text-align: center; color: #666; font-size: 12px;\">\
             Questions? Contact us at {admin}</p>\
             </div></body></html>",
            admin = encode_text(&self.admin_email),
        )
    }
}

/// Drop everything between `<` and `>` inclusive, then decode entities in what is left.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    decode_html_entities(&text).into_owned()
}

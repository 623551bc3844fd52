use chrono::{DateTime, Utc};

use super::super::domain::AuditRecord;
use super::super::recommendations::{select_recommendations, Recommendation};
use super::super::scoring::{ScoreLevel, ScoreSet};

pub const NEXT_STEPS: [&str; 5] = [
    "Review this report carefully and identify your top priorities",
    "Book a strategy call to discuss implementation plans",
    "Start with quick wins that can deliver immediate results",
    "Develop a 90-day action plan for major improvements",
    "Set up tracking and analytics to measure progress",
];

/// Names and links printed on the report.
#[derive(Debug, Clone)]
pub struct ReportBranding {
    pub brand_name: String,
    pub booking_url: Option<String>,
    pub website_url: Option<String>,
}

impl Default for ReportBranding {
    fn default() -> Self {
        Self {
            brand_name: "Lead Audit".to_string(),
            booking_url: None,
            website_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBar {
    pub label: &'static str,
    pub score: u8,
    pub level: ScoreLevel,
}

impl CategoryBar {
    /// Fraction of the bar to fill, `0.0..=1.0`.
    pub fn fill_ratio(&self) -> f32 {
        f32::from(self.score.min(100)) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub label: &'static str,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportPage {
    Title {
        heading: &'static str,
        subheading: &'static str,
        generated_on: String,
        business_lines: Vec<String>,
    },
    Overall {
        score: u8,
        level: ScoreLevel,
    },
    Breakdown {
        bars: Vec<CategoryBar>,
    },
    Checklist {
        items: Vec<ChecklistItem>,
    },
    Recommendations {
        items: Vec<Recommendation>,
    },
    NextSteps {
        steps: Vec<&'static str>,
        call_to_action: Option<String>,
        footer: Vec<String>,
    },
}

/// Renderer-independent content of one audit report, one entry per page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    pub fn build(
        record: &AuditRecord,
        scores: &ScoreSet,
        generated_at: DateTime<Utc>,
        branding: &ReportBranding,
    ) -> Self {
        let submission = &record.submission;
        let not_specified = || "Not specified".to_string();

        let business_lines = vec![
            format!("Business Name: {}", submission.business_name),
            format!("Contact: {}", submission.contact_name),
            format!("Email: {}", submission.email),
            format!(
                "Industry: {}",
                submission
                    .industry
                    .map(|industry| industry.label().to_string())
                    .unwrap_or_else(not_specified)
            ),
            format!(
                "Location: {}",
                submission.location.clone().unwrap_or_else(not_specified)
            ),
        ];

        let bars = scores
            .categories()
            .into_iter()
            .map(|(category, score)| CategoryBar {
                label: category.label(),
                score,
                level: ScoreLevel::for_score(score),
            })
            .collect();

        let items = submission
            .capabilities
            .checklist()
            .into_iter()
            .map(|(label, present)| ChecklistItem { label, present })
            .collect();

        let footer = std::iter::once(format!(
            "(c) {} {}. All rights reserved.",
            generated_at.format("%Y"),
            branding.brand_name
        ))
        .chain(branding.website_url.clone())
        .collect();

        Self {
            title: format!("Digital Marketing Audit - {}", submission.business_name),
            pages: vec![
                ReportPage::Title {
                    heading: "DIGITAL MARKETING AUDIT",
                    subheading: "Comprehensive Analysis & Recommendations",
                    generated_on: format!("Generated: {}", generated_at.format("%B %-d, %Y")),
                    business_lines,
                },
                ReportPage::Overall {
                    score: scores.overall_score,
                    level: ScoreLevel::for_score(scores.overall_score),
                },
                ReportPage::Breakdown { bars },
                ReportPage::Checklist { items },
                ReportPage::Recommendations {
                    items: select_recommendations(submission, scores),
                },
                ReportPage::NextSteps {
                    steps: NEXT_STEPS.to_vec(),
                    call_to_action: branding
                        .booking_url
                        .as_ref()
                        .map(|url| format!("Book a Strategy Call: {url}")),
                    footer,
                },
            ],
        }
    }
}

/// Greedy word wrap on character count; long words are kept whole.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

use serde::{Deserialize, Serialize};

use super::domain::{AuditSubmission, Capabilities};

const PLATFORM_POINTS: usize = 10;
const PLATFORM_CAP: usize = 50;

/// Category and overall scores, each in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub website_score: u8,
    pub social_score: u8,
    pub marketing_score: u8,
    pub automation_score: u8,
    pub overall_score: u8,
}

impl ScoreSet {
    /// Categories in report order with their display names.
    pub fn categories(&self) -> [(ScoreCategory, u8); 4] {
        [
            (ScoreCategory::Website, self.website_score),
            (ScoreCategory::Social, self.social_score),
            (ScoreCategory::Marketing, self.marketing_score),
            (ScoreCategory::Automation, self.automation_score),
        ]
    }

    pub fn category(&self, category: ScoreCategory) -> u8 {
        match category {
            ScoreCategory::Website => self.website_score,
            ScoreCategory::Social => self.social_score,
            ScoreCategory::Marketing => self.marketing_score,
            ScoreCategory::Automation => self.automation_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Website,
    Social,
    Marketing,
    Automation,
}

impl ScoreCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Website => "Website & SEO",
            Self::Social => "Social Media",
            Self::Marketing => "Marketing Strategy",
            Self::Automation => "Automation & Tech",
        }
    }
}

/// Qualitative band shown next to a score in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl ScoreLevel {
    pub const fn for_score(score: u8) -> Self {
        if score >= 80 {
            Self::Excellent
        } else if score >= 60 {
            Self::Good
        } else if score >= 40 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }

    /// RGB display color.
    pub const fn color(self) -> (u8, u8, u8) {
        match self {
            Self::Excellent => (0x10, 0xb9, 0x81),
            Self::Good => (0x3b, 0x82, 0xf6),
            Self::Fair => (0xf5, 0x9e, 0x0b),
            Self::NeedsImprovement => (0xef, 0x44, 0x44),
        }
    }
}

/// Fixed-weight scoring over the capability flags and the number of social platforms.
pub fn compute_scores(submission: &AuditSubmission) -> ScoreSet {
    score_capabilities(&submission.capabilities, submission.platform_count())
}

pub fn score_capabilities(flags: &Capabilities, platform_count: usize) -> ScoreSet {
    let website = points(flags.has_website, 40)
        + points(flags.has_seo, 30)
        + points(flags.has_analytics, 30);

    let platform_points = (platform_count * PLATFORM_POINTS).min(PLATFORM_CAP) as u16;
    let social = points(flags.has_social_media, 50) + platform_points;

    let marketing = points(flags.has_email_marketing, 35)
        + points(flags.has_paid_ads, 35)
        + points(flags.has_crm, 30);

    let automation = points(flags.has_automation, 50)
        + points(flags.has_email_marketing, 25)
        + points(flags.has_crm, 25);

    ScoreSet {
        website_score: website as u8,
        social_score: social as u8,
        marketing_score: marketing as u8,
        automation_score: automation as u8,
        overall_score: rounded_mean([website, social, marketing, automation]),
    }
}

fn points(flag: bool, weight: u16) -> u16 {
    if flag {
        weight
    } else {
        0
    }
}

/// Integer round-half-up of the mean of four non-negative scores.
fn rounded_mean(scores: [u16; 4]) -> u8 {
    let total: u16 = scores.iter().sum();
    ((total + 2) / 4) as u8
}

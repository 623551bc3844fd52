use serde::Serialize;

use super::domain::AuditSubmission;
use super::scoring::{ScoreCategory, ScoreSet};

/// A category only produces advice while its score sits below this mark.
pub const RECOMMENDATION_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// RGB annotation color used by the report.
    pub const fn color(self) -> (u8, u8, u8) {
        match self {
            Self::High => (0xef, 0x44, 0x44),
            Self::Medium => (0xf5, 0x9e, 0x0b),
            Self::Low => (0x10, 0xb9, 0x81),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub category: &'static str,
    pub priority: Priority,
    pub title: &'static str,
    pub description: &'static str,
}

/// Capability a rule checks for; the rule fires when it is missing.
#[derive(Debug, Clone, Copy)]
enum Capability {
    Website,
    Seo,
    Analytics,
    SocialReach,
    EmailMarketing,
    Crm,
    Automation,
}

impl Capability {
    fn present(self, submission: &AuditSubmission, scores: &ScoreSet) -> bool {
        let flags = &submission.capabilities;
        match self {
            Self::Website => flags.has_website,
            Self::Seo => flags.has_seo,
            Self::Analytics => flags.has_analytics,
            // Reach is the category score itself, so a gated category always lacks it.
            Self::SocialReach => scores.social_score >= RECOMMENDATION_THRESHOLD,
            Self::EmailMarketing => flags.has_email_marketing,
            Self::Crm => flags.has_crm,
            Self::Automation => flags.has_automation,
        }
    }
}

struct Rule {
    gate: ScoreCategory,
    requires: Capability,
    recommendation: Recommendation,
}

static RULES: [Rule; 7] = [
    Rule {
        gate: ScoreCategory::Website,
        requires: Capability::Website,
        recommendation: Recommendation {
            category: "Website",
            priority: Priority::High,
            title: "Establish Professional Web Presence",
            description: "Create a modern, mobile-responsive website that showcases your brand and converts visitors into customers.",
        },
    },
    Rule {
        gate: ScoreCategory::Website,
        requires: Capability::Seo,
        recommendation: Recommendation {
            category: "SEO",
            priority: Priority::High,
            title: "Implement SEO Strategy",
            description: "Optimize your website for search engines to increase organic traffic and visibility.",
        },
    },
    Rule {
        gate: ScoreCategory::Website,
        requires: Capability::Analytics,
        recommendation: Recommendation {
            category: "Analytics",
            priority: Priority::Medium,
            title: "Set Up Analytics Tracking",
            description: "Install Google Analytics or similar tools to track visitor behavior and make data-driven decisions.",
        },
    },
    Rule {
        gate: ScoreCategory::Social,
        requires: Capability::SocialReach,
        recommendation: Recommendation {
            category: "Social Media",
            priority: Priority::High,
            title: "Expand Social Media Presence",
            description: "Develop a consistent social media strategy across platforms where your target audience is active.",
        },
    },
    Rule {
        gate: ScoreCategory::Marketing,
        requires: Capability::EmailMarketing,
        recommendation: Recommendation {
            category: "Email Marketing",
            priority: Priority::High,
            title: "Launch Email Marketing Campaigns",
            description: "Build an email list and create nurture campaigns to stay connected with your audience.",
        },
    },
    Rule {
        gate: ScoreCategory::Marketing,
        requires: Capability::Crm,
        recommendation: Recommendation {
            category: "CRM",
            priority: Priority::Medium,
            title: "Implement CRM System",
            description: "Use a CRM to manage customer relationships, track leads, and improve sales processes.",
        },
    },
    Rule {
        gate: ScoreCategory::Automation,
        requires: Capability::Automation,
        recommendation: Recommendation {
            category: "Automation",
            priority: Priority::High,
            title: "Automate Marketing Processes",
            description: "Implement marketing automation to save time, nurture leads, and increase efficiency.",
        },
    },
];

/// Walk the rule table in order (website, social, marketing, automation).
pub fn select_recommendations(
    submission: &AuditSubmission,
    scores: &ScoreSet,
) -> Vec<Recommendation> {
    RULES
        .iter()
        .filter(|rule| scores.category(rule.gate) < RECOMMENDATION_THRESHOLD)
        .filter(|rule| !rule.requires.present(submission, scores))
        .map(|rule| rule.recommendation.clone())
        .collect()
}

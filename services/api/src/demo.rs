use crate::infra::{email_templates, load_submission, InMemoryAuditStore, InMemoryNotifier};
use clap::Args;
use lead_audit::audits::{
    compute_scores, select_recommendations, AuditService, AuditSubmission, BusinessSize,
    Capabilities, Industry, MonthlyBudget, PdfReportRenderer, ScoreLevel, ScoreSet,
};
use lead_audit::config::AppConfig;
use lead_audit::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

type DemoService = AuditService<InMemoryAuditStore, InMemoryNotifier, PdfReportRenderer>;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Questionnaire JSON file, same shape as the POST /api/audits body
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the scores as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Questionnaire JSON file, same shape as the POST /api/audits body
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Directory for the PDF (defaults to REPORT_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory for the demo reports (defaults to a folder under the system temp dir)
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let submission = load_submission(&args.input)?;
    let scores = compute_scores(&submission);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    println!("Audit scores for {}", submission.business_name);
    render_scores(&scores);
    render_recommendations(&submission, &scores);
    Ok(())
}

pub(crate) async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(dir) = args.output_dir {
        config.reports.output_dir = dir;
    }

    let submission = load_submission(&args.input)?;
    let (service, _) = demo_service(&config);
    let receipt = service.submit(submission)?;
    let outcome = service.generate_report(receipt.audit_id).await?;
    let record = service.get(receipt.audit_id)?;

    println!(
        "Rendered report for {} (overall {}/100)",
        record.submission.business_name, outcome.scores.overall_score
    );
    if let Some(report) = &record.report {
        println!("- File: {}", report.path.display());
    }
    println!("- Public URL: {}", outcome.report_url);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    config.reports.output_dir = args
        .output_dir
        .unwrap_or_else(|| std::env::temp_dir().join("lead-audit-demo"));

    println!("Lead audit pipeline demo");
    let (service, notifier) = demo_service(&config);

    let receipt = service.submit(demo_submission())?;
    println!(
        "- Received audit {} -> update code {}",
        receipt.audit_id, receipt.update_code
    );

    let outcome = service.generate_report(receipt.audit_id).await?;
    println!("\nInitial assessment");
    render_scores(&outcome.scores);
    let record = service.get(receipt.audit_id)?;
    render_recommendations(&record.submission, &outcome.scores);
    println!("  Report: {}", outcome.report_url);

    println!("\nRevision with the update code (CRM and automation adopted)");
    let mut revised = record.submission.clone();
    revised.capabilities.has_crm = true;
    revised.capabilities.has_automation = true;
    revised.current_marketing_tools.insert("hubspot".to_string());
    let revision = service
        .revise(
            receipt.update_code.as_str(),
            &record.submission.email,
            revised,
        )
        .await?;
    render_scores(&revision.scores);
    if let Some(url) = &revision.report_url {
        println!("  Updated report: {url}");
    }

    let stats = service.stats()?;
    println!(
        "\nDashboard: {} total | {} today | {} this week | average {}/100",
        stats.total, stats.today, stats.this_week, stats.average_score
    );

    // deliveries run on spawned tasks
    tokio::time::sleep(Duration::from_millis(100)).await;
    let messages = notifier.messages();
    if messages.is_empty() {
        println!("E-mails: none dispatched");
    } else {
        println!("E-mails:");
        for message in messages {
            println!("  - to={} subject={}", message.to, message.subject);
        }
    }

    Ok(())
}

fn demo_service(config: &AppConfig) -> (DemoService, Arc<InMemoryNotifier>) {
    let notifier = Arc::new(InMemoryNotifier::default());
    let service = AuditService::new(
        Arc::new(InMemoryAuditStore::default()),
        notifier.clone(),
        Arc::new(PdfReportRenderer::from_config(&config.reports)),
        config.reports.clone(),
        email_templates(config),
    );
    (service, notifier)
}

fn render_scores(scores: &ScoreSet) {
    for (category, score) in scores.categories() {
        println!(
            "  - {}: {}/100 ({})",
            category.label(),
            score,
            ScoreLevel::for_score(score).label()
        );
    }
    println!(
        "  Overall: {}/100 ({})",
        scores.overall_score,
        ScoreLevel::for_score(scores.overall_score).label()
    );
}

fn render_recommendations(submission: &AuditSubmission, scores: &ScoreSet) {
    let recommendations = select_recommendations(submission, scores);
    if recommendations.is_empty() {
        println!("  Recommendations: none, every area is in good shape");
        return;
    }
    println!("  Recommendations:");
    for rec in recommendations {
        println!(
            "    - [{}] {}: {}",
            rec.priority.label(),
            rec.category,
            rec.title
        );
    }
}

fn demo_submission() -> AuditSubmission {
    AuditSubmission {
        business_name: "Harbor Bakery".to_string(),
        contact_name: "Sam Ortiz".to_string(),
        email: "sam@harborbakery.example".to_string(),
        phone: Some("555-0142".to_string()),
        website: Some("https://harborbakery.example".to_string()),
        location: Some("Portland, ME".to_string()),
        industry: Some(Industry::Retail),
        business_size: Some(BusinessSize::Small),
        target_audience: Some("Local families and office caterers".to_string()),
        marketing_goals: Some("Grow weekday catering orders".to_string()),
        monthly_budget: Some(MonthlyBudget::UpTo1000),
        biggest_challenges: Some("Following up with catering inquiries".to_string()),
        social_media_platforms: ["facebook", "instagram"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        current_marketing_tools: ["mailchimp"].into_iter().map(str::to_string).collect(),
        capabilities: Capabilities {
            has_website: true,
            has_social_media: true,
            has_email_marketing: true,
            has_seo: true,
            ..Capabilities::default()
        },
    }
}

use crate::demo::{run_demo, run_render, run_score, DemoArgs, RenderArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_audit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Audit",
    about = "Run the digital marketing audit service or score questionnaires from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a questionnaire file and list the recommendations
    Score(ScoreArgs),
    /// Render the PDF report for a questionnaire file
    Render(RenderArgs),
    /// Walk through intake, report, and revision against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Render(args) => run_render(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

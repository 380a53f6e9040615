use crate::report::{run_schemas, run_score, SchemasArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use schema_insight::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Schema Insight",
    about = "Score schema assessments and serve coach-facing profiles",
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
    /// Score an assessment CSV export and print the profile
    Score(ScoreArgs),
    /// List the canonical schema table grouped by domain
    Schemas(SchemasArgs),
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
        Command::Schemas(args) => run_schemas(args),
    }
}

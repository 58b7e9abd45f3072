use crate::demo::{run_demo, DemoArgs};
use crate::infra::parse_session;
use crate::server;
use clap::{Args, Parser, Subcommand};
use volunteer_hub::error::AppError;
use volunteer_hub::identity::UserId;

#[derive(Parser, Debug)]
#[command(
    name = "Volunteer Hub",
    about = "Run the volunteer opportunity and quest service from the command line",
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
    /// Walk through FCFS intake, hours verification, and quest claims in memory
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
    /// Register a bearer session as TOKEN=USER_ID (repeatable)
    #[arg(long = "session", value_parser = parse_session)]
    pub(crate) sessions: Vec<(String, UserId)>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

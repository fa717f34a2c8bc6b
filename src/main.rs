use clap::Parser;
use hsa_planner::api::{self, Cli, Command};
use hsa_planner::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    match cli.command {
        Command::Serve { port } => api::run_http_server(port).await?,
        Command::Calculate(args) => {
            let response = api::calculate_from_args(&args)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Solve(args) => {
            let response = api::solve_from_args(&args)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

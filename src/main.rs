use anyhow::Result;
use clap::Parser;
use log::info;
use svcgate::health::OverallStatus;
use svcgate::integrations::ServiceKind;

/// svcgate - probe and call authenticated external APIs
///
/// Credentials and endpoints come from the environment, e.g. GITHUB_TOKEN,
/// SLACK_BOT_TOKEN, SENDGRID_API_KEY, JOBBER_ACCESS_TOKEN, GOOGLE_ACCESS_TOKEN,
/// and optional <SERVICE>_BASE_URL / <SERVICE>_TIMEOUT_MS overrides.
///
/// Examples:
///   svcgate health                  # Check every built-in service
///   svcgate request github GET /user
#[derive(Parser, Debug)]
#[command(author, version = env!("SVCGATE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check service health and print the result as JSON
    Health(HealthArgs),

    /// Perform one authenticated call and print the JSON response
    Request(RequestArgs),
}

#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Services to check (default: all)
    #[arg(value_enum, value_name = "SERVICE")]
    pub services: Vec<ServiceKind>,
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    #[arg(value_enum, value_name = "SERVICE")]
    pub service: ServiceKind,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS)
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// Path relative to the service base URL
    #[arg(value_name = "PATH")]
    pub path: String,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    pub data: Option<String>,

    /// Reuse an existing correlation ID instead of generating one
    #[arg(long = "request-id", env = "SVCGATE_REQUEST_ID", value_name = "ID")]
    pub request_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = svcgate::runtime::RealRuntime;

    match cli.command {
        Commands::Health(args) => {
            let health = svcgate::commands::health(&runtime, &args.services).await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if health.status != OverallStatus::Healthy {
                std::process::exit(1);
            }
        }
        Commands::Request(args) => {
            let response = svcgate::commands::request(
                &runtime,
                args.service,
                &args.method,
                &args.path,
                args.data.as_deref(),
                args.request_id.as_deref(),
            )
            .await?;
            info!("request id: {}", response.correlation_id);
            println!("{}", serde_json::to_string_pretty(&response.data)?);
        }
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use tagon_router::security::{JwtAuthority, TokenSubject};

#[derive(Parser)]
#[command(name = "tagon-cli")]
#[command(about = "Operator CLI for the Tagon page server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Operator API key, if the server requires one.
    #[arg(short, long, env = "TAGON_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status,
    /// Liveness probe
    Health,
    /// List registered routes
    Routes,
    /// Show middleware execution order and state
    Middlewares,
    /// List registered guards
    Guards,
    /// Show typed route parameters
    Params,
    /// Per-endpoint timing from the logging middleware
    Performance,
    /// Enable a middleware at runtime
    Enable { name: String },
    /// Disable a middleware at runtime
    Disable { name: String },
    /// Mint a bearer token for testing protected pages
    Token {
        /// Signing secret, matching `middleware.auth.secret`.
        #[arg(long, env = "TAGON_AUTH_SECRET")]
        secret: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Repeat for several roles.
        #[arg(long = "role")]
        roles: Vec<String>,
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Token {
        secret,
        user,
        email,
        name,
        roles,
        ttl_hours,
    } = &cli.command
    {
        let subject = TokenSubject {
            id: user.clone(),
            email: email.clone(),
            name: name.clone(),
            roles: roles.clone(),
        };
        let token = JwtAuthority::new(secret).issue(&subject, chrono::Duration::hours(*ttl_hours))?;
        println!("{token}");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))?,
        );
    }

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/api/status", cli.url)),
        Commands::Health => client.get(format!("{}/api/health", cli.url)),
        Commands::Routes => client.get(format!("{}/api/routes", cli.url)),
        Commands::Middlewares => client.get(format!("{}/api/middlewares", cli.url)),
        Commands::Guards => client.get(format!("{}/api/guards", cli.url)),
        Commands::Params => client.get(format!("{}/api/params", cli.url)),
        Commands::Performance => client.get(format!("{}/api/performance", cli.url)),
        Commands::Enable { name } => {
            client.post(format!("{}/api/middlewares/{name}/enable", cli.url))
        }
        Commands::Disable { name } => {
            client.post(format!("{}/api/middlewares/{name}/disable", cli.url))
        }
        Commands::Token { .. } => return Ok(()),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: operator API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

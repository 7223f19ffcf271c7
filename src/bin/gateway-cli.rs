use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;
use clap::{Parser, Subcommand};

use edge_gateway::auth::token::{issue_token, now_secs};
use edge_gateway::auth::{AuthFilter, BypassList, Claims, Secret};
use edge_gateway::config::load_config;
use edge_gateway::routing::{RewriteOutcome, RouteTable};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator tooling for the edge gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a bearer token with the gateway secret
    Token {
        /// Value of the `id` claim
        #[arg(long)]
        id: String,
        /// Value of the `name` claim
        #[arg(long)]
        name: Option<String>,
        /// Lifetime in seconds; 0 issues a token without `exp`
        #[arg(long, default_value_t = 900)]
        ttl_secs: u64,
        /// Environment variable holding the secret
        #[arg(long, default_value = "JWT_SECRET")]
        secret_env: String,
    },
    /// List the route table in precedence order
    Routes {
        #[arg(short, long, default_value = "gateway.toml")]
        config: PathBuf,
    },
    /// Show which route a request would take
    Explain {
        #[arg(short, long, default_value = "gateway.toml")]
        config: PathBuf,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Request path, optionally with a query string
        #[arg(short, long)]
        path: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Token {
            id,
            name,
            ttl_secs,
            secret_env,
        } => {
            let secret = Secret::from_env(&secret_env)?;
            let claims = Claims {
                id: Some(id),
                name,
                exp: (ttl_secs > 0).then(|| now_secs() + ttl_secs),
            };
            println!("{}", issue_token(&secret, &claims)?);
        }
        Commands::Routes { config } => {
            let table = load_table(&config)?;
            for (i, route) in table.routes().iter().enumerate() {
                let filters: Vec<_> = route.filters.names().collect();
                let rewrite = route
                    .rewrite
                    .as_ref()
                    .map(|r| format!(" rewrite {} => {}", r.prefix(), r.replacement()))
                    .unwrap_or_default();
                println!(
                    "{:>2}. {:<24} {} -> {} [{}]{}",
                    i + 1,
                    route.id,
                    route.predicate,
                    route.backend,
                    filters.join(", "),
                    rewrite
                );
            }
        }
        Commands::Explain {
            config,
            method,
            path,
        } => {
            let table = load_table(&config)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let path_only = path.split('?').next().unwrap_or(&path);

            let Some(route) = table.match_route(path_only, &method) else {
                println!("{} {} -> no route (404)", method, path);
                return Ok(());
            };

            let forwarded = match route.rewrite.as_ref().map(|r| r.apply_to_path_and_query(&path)) {
                Some(RewriteOutcome::Rewritten(p)) => p,
                _ => path.clone(),
            };

            println!("route:    {}", route.id);
            println!("matches:  {}", route.predicate);
            println!("backend:  {}", route.backend);
            println!("auth:     {}", if route.requires_auth() { "required" } else { "none" });
            println!("forward:  {} {}", method, forwarded);
        }
    }

    Ok(())
}

/// Compile the route table without a real secret; nothing is verified here.
fn load_table(path: &Path) -> Result<RouteTable, Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let placeholder = Secret::new(vec![0u8; edge_gateway::auth::token::MIN_SECRET_LEN])?;
    let auth = Arc::new(AuthFilter::new(
        &placeholder,
        config.auth.leeway_secs,
        BypassList::new(config.auth.bypass_paths.clone()),
    ));
    Ok(RouteTable::build(&config.routes, &auth)?)
}

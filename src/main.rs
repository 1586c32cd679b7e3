//! seed-router CLI.
//!
//! Decodes browser locations into routes, encodes routes back into paths, and
//! loads routes from their seeds.
//!
//! ```text
//! seed-router decode /seeds/seed.radicle.garden/rad:z3gq.../tree/main/README.md --branch main=<oid>
//! seed-router encode '{"resource":"home"}'
//! seed-router resolve release/v1/src/lib.rs --branch release/v1=<oid>
//! seed-router browse /seeds/seed.radicle.garden/rad:z3gq.../issues
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use seed_router::config::{load_config, RouterConfig};
use seed_router::history::{MemoryHistory, NavigationHistory};
use seed_router::loader::{HttpSeedApi, SeedLoader};
use seed_router::navigator::Navigator;
use seed_router::observability::logging::init_logging;
use seed_router::observability::metrics::init_metrics;
use seed_router::routing::{
    detect_revision, resolve_location, route_to_path, BranchMap, Route, RouteContext,
};

/// Origin used for locations given as bare paths.
const LOCAL_ORIGIN: &str = "http://localhost";

#[derive(Parser)]
#[command(name = "seed-router")]
#[command(about = "Route codec and loader for browsing seed nodes", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print recorded metrics (Prometheus text) to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a path or URL into a route
    Decode {
        location: String,
        /// Known branch, as `name=oid` (repeatable)
        #[arg(long = "branch", value_parser = parse_branch)]
        branches: Vec<(String, String)>,
    },
    /// Encode a route (JSON) into its canonical path
    Encode { route: String },
    /// Split `<revision>/<path>` against known branches
    Resolve {
        input: String,
        #[arg(long = "branch", value_parser = parse_branch)]
        branches: Vec<(String, String)>,
    },
    /// Load a location from its seed and print the loaded route
    Browse { location: String },
}

fn parse_branch(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, oid)) if !name.is_empty() && !oid.is_empty() => {
            Ok((name.to_string(), oid.to_string()))
        }
        _ => Err(format!("expected `name=oid`, got `{value}`")),
    }
}

fn absolute(location: &str) -> String {
    if location.contains("://") {
        location.to_string()
    } else {
        format!("{LOCAL_ORIGIN}/{}", location.trim_start_matches('/'))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    init_logging(&config.observability);
    let metrics = init_metrics(&config.observability);
    tracing::debug!(config = ?cli.config, "seed-router starting");

    match cli.command {
        Command::Decode { location, branches } => {
            let branches: BranchMap = branches.into_iter().collect();
            let mut ctx = RouteContext::new(&config.nodes);
            if !branches.is_empty() {
                ctx = ctx.with_branches(&branches);
            }
            let route = resolve_location(&location, &ctx);
            println!("{}", serde_json::to_string_pretty(&route)?);
        }
        Command::Encode { route } => {
            let route: Route = serde_json::from_str(&route)?;
            match route_to_path(&route, &config.nodes) {
                Some(path) => println!("{path}"),
                None => return Err(format!("{} routes have no path", route.resource()).into()),
            }
        }
        Command::Resolve { input, branches } => {
            let branches: BranchMap = branches.into_iter().collect();
            let detected = detect_revision(&input, &branches);
            println!("{}", serde_json::to_string_pretty(&detected)?);
        }
        Command::Browse { location } => {
            let provider = MemoryHistory::new(&absolute(&location))?;
            let history = NavigationHistory::new(provider, &config);
            let api = HttpSeedApi::new(&config.loader)?;
            let navigator = Navigator::new(history, SeedLoader::new(api, config.clone()));

            navigator.initialize().await?;
            let loaded = navigator.active();
            tracing::info!(resource = loaded.resource(), "Browse complete");
            println!("{}", navigator.document_title());
            println!("{}", serde_json::to_string_pretty(&*loaded)?);
        }
    }

    if let Some(handle) = metrics.filter(|_| cli.metrics) {
        eprint!("{}", handle.render());
    }

    Ok(())
}

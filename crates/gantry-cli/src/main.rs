//! gantry — deployment orchestrator CLI.
//!
//! Wires the Redis-backed registry and the per-host Docker clients to
//! the rollout orchestrator. Each subcommand is one synchronous
//! operation: `deploy` blocks until the rollout completes or fails.
//!
//! # Usage
//!
//! ```text
//! gantry hosts add 10.0.0.5
//! gantry apps add web
//! gantry deploy web registry.local/web:v7 -c 4
//! gantry describe
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use gantry_orchestrator::Orchestrator;
use gantry_registry::{RedisStore, Registry};
use gantry_runtime::DockerFactory;

mod config;

use config::GantryConfig;

#[derive(Parser)]
#[command(name = "gantry", about = "Multi-host container deployment orchestrator", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "gantry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Snapshot of all apps: instances, env, running image.
    Describe,

    /// Roll out `count` instances of `image` for `app`, replacing the
    /// previous generation on success.
    Deploy {
        app: String,
        image: String,
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Manage the set of deployable apps.
    Apps {
        #[command(subcommand)]
        action: SetAction,
    },

    /// Manage the scheduling pool of container hosts.
    Hosts {
        #[command(subcommand)]
        action: SetAction,
    },

    /// Manage an app's environment variables.
    Env {
        app: String,
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Live instances registered for an app.
    Instances { app: String },

    /// Deployment history for an app, newest first.
    Deployments {
        app: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Container logs for each live instance of an app.
    Logs { app: String },

    /// Stop and deregister every instance of an app.
    Kill { app: String },
}

#[derive(Subcommand)]
enum SetAction {
    List,
    Add { name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
enum EnvAction {
    List,
    /// Add a KEY=VALUE entry.
    Set { entry: String },
    /// Remove every value stored for KEY.
    Unset { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gantry=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = GantryConfig::load_or_default(&cli.config)?;

    let store = RedisStore::connect(&config.store_url()).await?;
    let registry = Registry::new(Arc::new(store));
    let runtime = Arc::new(DockerFactory::new(config.docker_port())?);
    let health = Arc::new(config.health_checker());
    let orchestrator =
        Orchestrator::new(registry.clone(), runtime, health).with_port_range(config.port_range());

    match cli.command {
        Command::Describe => {
            let snapshot = orchestrator.describe().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Deploy { app, image, count } => {
            orchestrator.deploy(&app, &image, count).await?;
            info!(%app, %image, count, "deployment succeeded");
        }
        Command::Apps { action } => match action {
            SetAction::List => print_lines(&registry.list_apps().await?),
            SetAction::Add { name } => {
                registry.add_app(&name).await?;
            }
            SetAction::Remove { name } => {
                registry.remove_app(&name).await?;
            }
        },
        Command::Hosts { action } => match action {
            SetAction::List => print_lines(&registry.list_hosts().await?),
            SetAction::Add { name } => {
                registry.add_host(&name).await?;
            }
            SetAction::Remove { name } => {
                registry.remove_host(&name).await?;
            }
        },
        Command::Env { app, action } => match action {
            EnvAction::List => print_lines(&registry.list_env(&app).await?),
            EnvAction::Set { entry } => {
                anyhow::ensure!(entry.contains('='), "env entry must be KEY=VALUE");
                registry.add_env(&app, &entry).await?;
            }
            EnvAction::Unset { key } => {
                let removed = registry.remove_env(&app, &key).await?;
                info!(%app, %key, removed, "env entries removed");
            }
        },
        Command::Instances { app } => print_lines(&registry.list_instances(&app).await?),
        Command::Deployments { app, limit } => {
            let records = registry.list_deployments(&app, limit).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Logs { app } => {
            let logs = orchestrator.load_app_logs(&app).await?;
            for entry in logs {
                println!("=== {} ===", entry.instance);
                println!("{}", entry.logs);
            }
        }
        Command::Kill { app } => {
            orchestrator.kill_app_instances(&app).await?;
            info!(%app, "all instances killed");
        }
    }

    Ok(())
}

fn print_lines(items: &[String]) {
    for item in items {
        println!("{item}");
    }
}

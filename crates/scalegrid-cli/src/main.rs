//! scalegrid: drive scaling groups, instance groups and policies from a
//! TOML config, with membership and cooldowns persisted in a redb file.
//!
//! ```text
//! scalegrid init web
//! scalegrid create
//! scalegrid alarm web-scale-up
//! scalegrid adjust web --type exact --value 3
//! scalegrid status --format json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use scalegrid_autoscale::AdjustmentType;

mod commands;
mod deployment;
mod local;

use deployment::Deployment;

#[derive(Parser)]
#[command(
    name = "scalegrid",
    about = "ScaleGrid: capacity controller for scaling groups",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Config file describing templates, groups and policies.
    #[arg(short, long, global = true, default_value = "scalegrid.toml")]
    config: PathBuf,

    /// State file holding membership and cooldown records.
    #[arg(short, long, global = true, default_value = "scalegrid.redb")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config with one scaling group and two policies
    Init {
        /// Name of the scaling group to scaffold
        #[arg(default_value = "web")]
        group: String,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Bring a group (or every group) up to its initial size
    Create {
        group: Option<String>,
    },
    /// Apply an adjustment to a scaling group
    Adjust {
        group: String,
        /// exact, delta or percent (AWS names are accepted too)
        #[arg(short = 't', long = "type", default_value = "delta")]
        kind: AdjustmentType,
        #[arg(short, long, allow_hyphen_values = true)]
        value: i64,
        /// Abort on the first failed member creation
        #[arg(long)]
        fail_fast: bool,
    },
    /// Fire a scaling policy
    Alarm {
        policy: String,
    },
    /// Show persisted membership and cooldowns
    Status {
        group: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Destroy every member of a group and drop its state
    Delete {
        group: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,scalegrid=debug"))?,
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { group, force } => commands::init::init(&cli.config, &group, force),
        Commands::Create { group } => {
            let deployment = Deployment::load(&cli.config, &cli.state)?;
            commands::lifecycle::create(&deployment, group.as_deref()).await
        }
        Commands::Adjust {
            group,
            kind,
            value,
            fail_fast,
        } => {
            let deployment = Deployment::load(&cli.config, &cli.state)?;
            commands::scale::adjust(&deployment, &group, kind, value, fail_fast).await?;
            Ok(())
        }
        Commands::Alarm { policy } => {
            let deployment = Deployment::load(&cli.config, &cli.state)?;
            commands::scale::alarm(&deployment, &policy).await?;
            Ok(())
        }
        Commands::Status { group, format } => {
            let deployment = Deployment::load(&cli.config, &cli.state)?;
            commands::status::status(&deployment, group.as_deref(), &format)
        }
        Commands::Delete { group } => {
            let deployment = Deployment::load(&cli.config, &cli.state)?;
            commands::lifecycle::delete(&deployment, &group).await
        }
    }
}

//! opsreport - Operational reporting CLI for AWS accounts
//!
//! Each subcommand is one independent report:
//! - resource inventories (tags, principals, snapshots, gp2 storage)
//! - health and utilization checks (target groups, idle RDS, rightsizing)
//! - cost trend comparisons

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;

use commands::{compute, cost, iam, lb, rds, tags};
use opsreport_core::AppConfig;

#[derive(Parser)]
#[command(name = "opsreport")]
#[command(author = "CloudOps Team")]
#[command(version)]
#[command(about = "Operational reports across AWS profiles and regions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Credential profiles to report on (default: all configured)
    #[arg(long, global = true, value_delimiter = ',')]
    profiles: Option<Vec<String>>,

    /// Regions to fan out over (default: config file or built-in list)
    #[arg(long, global = true, value_delimiter = ',')]
    regions: Option<Vec<String>>,

    /// Directory reports are written to (default: Downloads)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Output terminal summaries as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List API gateways with their tags (CSV)
    ApiTags(tags::ApiTagsCommand),

    /// EC2 instance tag matrix, one sheet per profile
    Ec2Tags(tags::Ec2TagsCommand),

    /// EBS snapshots older than a cutoff
    Snapshots(compute::SnapshotsCommand),

    /// Karpenter instances needing rightsizing
    Rightsizing(compute::RightsizingCommand),

    /// RDS instances with no recent activity
    IdleRds(rds::IdleRdsCommand),

    /// RDS instances still on gp2 storage
    RdsStorage(rds::RdsStorageCommand),

    /// IAM users and roles inventory
    IamPrincipals(iam::IamPrincipalsCommand),

    /// Days since each service was last used per IAM role
    IamAccess(iam::IamAccessCommand),

    /// Unhealthy and empty load-balancer target groups
    LbTargets(lb::LbTargetsCommand),

    /// Cost Explorer period comparisons
    CostTrends(cost::CostTrendsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; per-task progress from the core crate is visible
    // by default.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "opsreport_core=info,opsreport=info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} failed to load configuration: {}", "✗".red(), e);
            std::process::exit(1);
        }
    };
    config.override_profiles(cli.profiles);
    config.override_regions(cli.regions);
    config.override_output_dir(cli.output_dir);

    match cli.command {
        Commands::ApiTags(cmd) => cmd.execute(&config).await,
        Commands::Ec2Tags(cmd) => cmd.execute(&config).await,
        Commands::Snapshots(cmd) => cmd.execute(&config).await,
        Commands::Rightsizing(cmd) => cmd.execute(&config).await,
        Commands::IdleRds(cmd) => cmd.execute(&config).await,
        Commands::RdsStorage(cmd) => cmd.execute(&config).await,
        Commands::IamPrincipals(cmd) => cmd.execute(&config).await,
        Commands::IamAccess(cmd) => cmd.execute(&config, cli.json).await,
        Commands::LbTargets(cmd) => cmd.execute(&config).await,
        Commands::CostTrends(cmd) => cmd.execute(&config).await,
    }
}

//! Database reports - idle instances and gp2 storage

use anyhow::Result;
use clap::Args;
use colored::*;
use opsreport_core::reports::{idle_rds, rds_storage};
use opsreport_core::AppConfig;

#[derive(Args)]
pub struct IdleRdsCommand {
    /// Lookback window for activity metrics
    #[arg(long, default_value_t = 30)]
    days: i64,
}

impl IdleRdsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let profiles = config.resolve_profiles()?;
        let regions = config.regions();

        let opts = idle_rds::IdleRdsOptions {
            lookback_days: self.days,
        };
        let (written, outcome) = idle_rds::run(config, &opts).await?;

        println!("Processed profiles: {}", profiles.join(", "));
        println!("Processed regions: {}", regions.join(", "));
        println!(
            "Total idle RDS instances found: {}",
            written.row_count.to_string().bold()
        );
        if !outcome.failures.is_empty() {
            println!(
                "{} {} profile/region pairs skipped",
                "⚠".yellow(),
                outcome.failures.len()
            );
        }
        println!("{} Data saved to {}", "✓".green(), written.path.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct RdsStorageCommand;

impl RdsStorageCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let written = rds_storage::run(config).await?;

        if written.row_count == 0 {
            println!("{}", "No RDS gp2 instances found.".yellow());
        } else {
            println!(
                "{} RDS gp2 instances saved to {}",
                "✓".green(),
                written.path.display()
            );
        }
        println!("Total RDS gp2 instances found: {}", written.row_count);
        Ok(())
    }
}

//! Compute reports - aged snapshots and rightsizing

use anyhow::Result;
use clap::Args;
use colored::*;
use opsreport_core::reports::{rightsizing, snapshots};
use opsreport_core::AppConfig;

#[derive(Args)]
pub struct SnapshotsCommand {
    /// Report snapshots older than this many days
    #[arg(long, default_value_t = 80)]
    days: i64,
}

impl SnapshotsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let opts = snapshots::SnapshotOptions {
            older_than_days: self.days,
        };

        let written = snapshots::run(config, &opts).await?;

        println!(
            "{} Data saved to {}",
            "✓".green(),
            written.path.display()
        );
        println!(
            "  {} snapshots older than {} days",
            written.row_count, self.days
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct RightsizingCommand;

impl RightsizingCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let opts = rightsizing::RightsizingOptions::default();

        match rightsizing::run(config, &opts).await? {
            Some(written) => {
                println!(
                    "{} Excel report saved to: {}",
                    "✓".green(),
                    written.path.display()
                );
                println!("  {} instances need rightsizing", written.row_count);
            }
            None => {
                println!("{}", "No rightsizing recommendations found.".yellow());
            }
        }

        println!("Rightsizing checks completed.");
        Ok(())
    }
}

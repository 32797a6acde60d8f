//! Load balancer health command

use anyhow::Result;
use clap::Args;
use colored::*;
use opsreport_core::reports::lb_targets;
use opsreport_core::AppConfig;

#[derive(Args)]
pub struct LbTargetsCommand {
    /// Region to check (default: first configured region)
    #[arg(short, long)]
    region: Option<String>,
}

impl LbTargetsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let region = self
            .region
            .clone()
            .unwrap_or_else(|| config.primary_region());
        let opts = lb_targets::LbTargetOptions::new(region);

        let (written, outcome) = lb_targets::run(config, &opts).await?;

        for failure in &outcome.failures {
            println!(
                "{} {}: {}",
                "✗".red(),
                failure.key,
                failure.error
            );
        }
        println!(
            "{} Excel report saved to: {}",
            "✓".green(),
            written.path.display()
        );
        println!(
            "  {} findings across {} profiles",
            written.row_count, outcome.completed
        );
        println!("All checks completed.");
        Ok(())
    }
}

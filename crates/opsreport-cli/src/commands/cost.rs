//! Cost trend command

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::*;
use opsreport_core::reports::cost_trends::{self, TrendWindow};
use opsreport_core::AppConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Granularity {
    Daily,
    Weekly,
    Monthly,
    All,
}

impl From<Granularity> for TrendWindow {
    fn from(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => TrendWindow::Daily,
            Granularity::Weekly => TrendWindow::Weekly,
            Granularity::Monthly => TrendWindow::Monthly,
            Granularity::All => TrendWindow::All,
        }
    }
}

#[derive(Args)]
pub struct CostTrendsCommand {
    /// Which comparison to include
    #[arg(long, value_enum, default_value = "all")]
    granularity: Granularity,
}

impl CostTrendsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let opts = cost_trends::CostTrendOptions {
            window: self.granularity.into(),
        };

        let written = cost_trends::run(config, &opts).await?;

        println!(
            "{} Cost comparison has been saved to {}",
            "✓".green(),
            written.path.display()
        );
        Ok(())
    }
}

//! Tag inventory commands - API gateways and EC2 instances

use anyhow::Result;
use clap::Args;
use colored::*;
use opsreport_core::reports::{api_gateways, instance_tags};
use opsreport_core::AppConfig;

#[derive(Args)]
pub struct ApiTagsCommand {
    /// Credential profile to inventory
    #[arg(short, long)]
    profile: String,

    /// Region the gateways live in (default: first configured region)
    #[arg(short, long)]
    region: Option<String>,
}

impl ApiTagsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let opts = api_gateways::ApiGatewayOptions {
            profile: self.profile.clone(),
            region: self
                .region
                .clone()
                .unwrap_or_else(|| config.primary_region()),
        };

        let written = api_gateways::run(config, &opts).await?;

        println!(
            "{} API gateways and their tags saved to {}",
            "✓".green(),
            written.path.display()
        );
        println!("  {} gateways written", written.row_count);
        Ok(())
    }
}

#[derive(Args)]
pub struct Ec2TagsCommand {
    /// Region to list instances in (default: first configured region)
    #[arg(short, long)]
    region: Option<String>,
}

impl Ec2TagsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let opts = instance_tags::InstanceTagOptions {
            region: self
                .region
                .clone()
                .unwrap_or_else(|| config.primary_region()),
        };

        let written = instance_tags::run(config, &opts).await?;

        println!(
            "{} EC2 instances and tags saved to {}",
            "✓".green(),
            written.path.display()
        );
        println!("  {} instances written", written.row_count);
        Ok(())
    }
}

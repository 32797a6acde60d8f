//! Identity reports - principal inventory and service access

use anyhow::Result;
use clap::Args;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};
use opsreport_core::reports::{iam_access, iam_principals};
use opsreport_core::AppConfig;

#[derive(Args)]
pub struct IamPrincipalsCommand;

impl IamPrincipalsCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        let written = iam_principals::run(config).await?;

        println!("{} Data saved to {}", "✓".green(), written.path.display());
        println!("  {} principals written", written.row_count);
        Ok(())
    }
}

#[derive(Args)]
pub struct IamAccessCommand {
    /// Credential profile to inspect
    #[arg(short, long)]
    profile: String,

    /// How many roles to sample
    #[arg(long, default_value_t = 3)]
    max_roles: i32,
}

impl IamAccessCommand {
    pub async fn execute(&self, config: &AppConfig, json: bool) -> Result<()> {
        let opts = iam_access::IamAccessOptions {
            max_roles: self.max_roles,
            ..iam_access::IamAccessOptions::new(&self.profile)
        };

        let (records, written) = iam_access::run(config, &opts).await?;

        if json {
            let json_records: Vec<_> = records
                .iter()
                .map(|record| {
                    serde_json::json!({
                        "role": record.role_name,
                        "service": record.service_name,
                        "last_accessed": record.last_accessed_label(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json_records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("{}", "No service access records found.".yellow());
        } else {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Role", "Service", "Last Accessed"]);
            for record in &records {
                table.add_row(vec![
                    record.role_name.clone(),
                    record.service_name.clone(),
                    record.last_accessed_label(),
                ]);
            }
            println!("{table}");
        }

        println!("{} Data saved to {}", "✓".green(), written.path.display());
        Ok(())
    }
}

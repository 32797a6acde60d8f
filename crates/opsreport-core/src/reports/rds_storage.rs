//! gp2 storage inventory
//!
//! Lists every RDS instance still on gp2 storage, one workbook sheet per
//! profile/region combination. This report overwrites its previous output
//! instead of timestamping, so there is always exactly one current copy.

use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::{ReportError, Result};
use crate::export::{overwrite_path, write_workbook, WrittenReport};
use crate::rows::Row;

const FILE_NAME: &str = "rds_gp2_instances.xlsx";

const BASE_COLUMNS: &[&str] = &[
    "AccountNumber",
    "DBInstanceIdentifier",
    "Engine",
    "AllocatedStorage",
    "DBInstanceClass",
    "StorageType",
    "Region",
];

const STORAGE_TYPE: &str = "gp2";

pub async fn run(config: &AppConfig) -> Result<WrittenReport> {
    let profiles = config.resolve_profiles()?;
    let regions = config.regions();

    let mut rows = Vec::new();
    for profile in &profiles {
        for region in &regions {
            info!(%profile, %region, "fetching RDS instances");
            match fetch_region(profile, region).await {
                Ok(region_rows) => {
                    if region_rows.is_empty() {
                        info!(%profile, %region, "no gp2 instances found");
                    }
                    rows.extend(region_rows);
                }
                Err(err @ ReportError::Credentials(_)) => {
                    warn!(%profile, %region, error = %err, "skipping region, credentials rejected");
                }
                Err(err) => {
                    warn!(%profile, %region, error = %err, "failed to describe instances");
                }
            }
        }
    }

    let path = overwrite_path(&config.output_dir(), FILE_NAME)?;
    write_workbook(&path, BASE_COLUMNS, &rows)
}

async fn fetch_region(profile: &str, region: &str) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, Some(region)).await;
    let client = aws_sdk_rds::Client::new(&sdk);

    let mut rows = Vec::new();
    let mut instances = client.describe_db_instances().into_paginator().items().send();
    while let Some(instance) = instances.next().await {
        let instance = instance.map_err(|e| aws::sdk_error("describe db instances", e))?;
        if instance.storage_type() != Some(STORAGE_TYPE) {
            continue;
        }

        rows.push(
            Row::on_sheet(format!("{profile}_{region}"))
                .with("AccountNumber", account_number(profile))
                .with(
                    "DBInstanceIdentifier",
                    instance.db_instance_identifier().unwrap_or_default(),
                )
                .with("Engine", instance.engine().unwrap_or_default())
                .with(
                    "AllocatedStorage",
                    instance.allocated_storage().unwrap_or_default().to_string(),
                )
                .with(
                    "DBInstanceClass",
                    instance.db_instance_class().unwrap_or_default(),
                )
                .with("StorageType", STORAGE_TYPE)
                .with("Region", region),
        );
    }

    Ok(rows)
}

/// Profiles are named `<account number>.<alias>`; the sheet column carries
/// just the number part.
fn account_number(profile: &str) -> &str {
    profile.split('.').next().unwrap_or(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_from_profile() {
        assert_eq!(account_number("123456789012.admin"), "123456789012");
        assert_eq!(account_number("plain-profile"), "plain-profile");
    }

    #[test]
    fn test_sheet_label_per_profile_region() {
        let row = Row::on_sheet(format!("{}_{}", "prod", "us-east-1")).with("Region", "us-east-1");
        assert_eq!(row.sheet(), Some("prod_us-east-1"));
    }
}

//! EC2 instance tag matrix
//!
//! One workbook sheet per profile, listing instance IDs with one column per
//! tag key discovered in that profile. Profiles whose listing fails are
//! logged and skipped.

use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::rows::Row;

const BASE_COLUMNS: &[&str] = &["InstanceId"];

#[derive(Debug, Clone)]
pub struct InstanceTagOptions {
    pub region: String,
}

pub async fn run(config: &AppConfig, opts: &InstanceTagOptions) -> Result<WrittenReport> {
    let profiles = config.resolve_profiles()?;

    let mut rows = Vec::new();
    for profile in &profiles {
        info!(%profile, region = %opts.region, "fetching EC2 instances");
        match fetch_profile(profile, &opts.region).await {
            Ok(mut profile_rows) => rows.append(&mut profile_rows),
            Err(err) => {
                warn!(%profile, error = %err, "failed to describe instances, skipping profile");
            }
        }
    }

    let path = timestamped_path(&config.output_dir(), "ec2_instance_tags", "xlsx");
    write_workbook(&path, BASE_COLUMNS, &rows)
}

async fn fetch_profile(profile: &str, region: &str) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, Some(region)).await;
    let client = aws_sdk_ec2::Client::new(&sdk);

    let resp = client
        .describe_instances()
        .send()
        .await
        .map_err(|e| aws::sdk_error("describe instances", e))?;

    let mut rows = Vec::new();
    for reservation in resp.reservations() {
        for instance in reservation.instances() {
            let mut row = Row::on_sheet(profile).with(
                "InstanceId",
                instance.instance_id().unwrap_or_default(),
            );
            for tag in instance.tags() {
                if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
                    row.set(key, value);
                }
            }
            rows.push(row);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{resolve_columns, MISSING};

    #[test]
    fn test_per_profile_sheets_have_independent_tag_columns() {
        let rows_a = vec![
            Row::on_sheet("prod")
                .with("InstanceId", "i-1")
                .with("Name", "web")
                .with("Team", "core"),
            Row::on_sheet("prod")
                .with("InstanceId", "i-2")
                .with("Name", "worker"),
        ];
        let rows_b = vec![Row::on_sheet("dev")
            .with("InstanceId", "i-3")
            .with("CostCenter", "42")];

        let columns_a = resolve_columns(BASE_COLUMNS, &rows_a);
        assert_eq!(columns_a, vec!["InstanceId", "Name", "Team"]);
        assert_eq!(rows_a[1].get("Team"), MISSING);

        let columns_b = resolve_columns(BASE_COLUMNS, &rows_b);
        assert_eq!(columns_b, vec!["InstanceId", "CostCenter"]);
    }
}

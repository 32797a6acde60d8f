//! Aged EBS snapshot report
//!
//! Walks every profile and configured region for snapshots owned by the
//! account that are older than the cutoff, and writes them to one workbook
//! sheet. Region failures are logged and skipped so the remaining
//! profile/region pairs still report.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::rows::Row;

const SHEET: &str = "Old Snapshots";

const BASE_COLUMNS: &[&str] = &[
    "SnapshotId",
    "AccountName",
    "Region",
    "CreatorARN",
    "StartTime",
    "Age (Days)",
];

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Only snapshots older than this many days are reported.
    pub older_than_days: i64,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self { older_than_days: 80 }
    }
}

pub async fn run(config: &AppConfig, opts: &SnapshotOptions) -> Result<WrittenReport> {
    let profiles = config.resolve_profiles()?;
    let regions = config.regions();
    let now = Utc::now();
    let cutoff = now - Duration::days(opts.older_than_days);

    let mut rows = Vec::new();
    for profile in &profiles {
        for region in &regions {
            match fetch_region(profile, region, cutoff, now).await {
                Ok(mut region_rows) => rows.append(&mut region_rows),
                Err(err) => {
                    warn!(%profile, %region, error = %err, "skipping region");
                }
            }
        }
        info!(%profile, "finished processing profile");
    }

    let path = timestamped_path(
        &config.output_dir(),
        &format!("snapshots_over_{}days", opts.older_than_days),
        "xlsx",
    );
    write_workbook(&path, BASE_COLUMNS, &rows)
}

async fn fetch_region(
    profile: &str,
    region: &str,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, Some(region)).await;
    let client = aws_sdk_ec2::Client::new(&sdk);

    let resp = client
        .describe_snapshots()
        .owner_ids("self")
        .send()
        .await
        .map_err(|e| aws::sdk_error("describe snapshots", e))?;

    let mut rows = Vec::new();
    for snapshot in resp.snapshots() {
        let Some(start) = snapshot
            .start_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), 0))
        else {
            continue;
        };
        if start >= cutoff {
            continue;
        }

        rows.push(
            Row::on_sheet(SHEET)
                .with("SnapshotId", snapshot.snapshot_id().unwrap_or_default())
                .with("AccountName", profile)
                .with("Region", region)
                .with("CreatorARN", snapshot.description().unwrap_or("Unknown"))
                .with("StartTime", start.format("%Y-%m-%d %H:%M:%S").to_string())
                .with("Age (Days)", age_days(start, now).to_string()),
        );
    }

    Ok(rows)
}

fn age_days(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_days() {
        let now = Utc::now();
        assert_eq!(age_days(now - Duration::days(81), now), 81);
        assert_eq!(age_days(now - Duration::hours(12), now), 0);
    }

    #[test]
    fn test_cutoff_excludes_recent_snapshots() {
        let now = Utc::now();
        let cutoff = now - Duration::days(80);
        let recent = now - Duration::days(10);
        let old = now - Duration::days(200);
        assert!(recent >= cutoff);
        assert!(old < cutoff);
    }
}

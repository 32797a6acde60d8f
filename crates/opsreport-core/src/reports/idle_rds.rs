//! Idle RDS instance report
//!
//! Fans out over every profile/region pair, checks each writer instance's
//! CloudWatch activity metrics over the lookback window, and reports the
//! instances where nothing crossed its threshold. Reader/standby cluster
//! members are skipped since their activity mirrors the writer's.

use std::collections::HashSet;

use aws_sdk_cloudwatch::primitives::DateTime as CwDateTime;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::fanout::{collect_rows, FanoutOptions, FanoutOutcome, TaskKey};
use crate::rows::Row;

const SHEET: &str = "Idle RDS Instances";

const BASE_COLUMNS: &[&str] = &[
    "DBInstanceIdentifier",
    "DBInstanceClass",
    "Engine",
    "Region",
    "AccountName",
    "AccountNumber",
    "IdleStatus",
];

const WORKERS: usize = 10;

/// An instance is idle when no datapoint of any of these metrics exceeds
/// its threshold over the whole lookback window.
pub const METRIC_THRESHOLDS: &[(&str, f64)] = &[
    ("DatabaseConnections", 1.0),
    ("ReadIOPS", 5.0),
    ("WriteIOPS", 5.0),
    ("CPUUtilization", 5.0),
    ("NetworkReceiveThroughput", 1024.0),
    ("NetworkTransmitThroughput", 1024.0),
];

#[derive(Debug, Clone)]
pub struct IdleRdsOptions {
    pub lookback_days: i64,
}

impl Default for IdleRdsOptions {
    fn default() -> Self {
        Self { lookback_days: 30 }
    }
}

pub async fn run(config: &AppConfig, opts: &IdleRdsOptions) -> Result<(WrittenReport, FanoutOutcome)> {
    let profiles = config.resolve_profiles()?;
    let regions = config.regions();

    let keys = TaskKey::cross(&profiles, &regions);
    let options = FanoutOptions::workers(config.workers().unwrap_or(WORKERS));
    let lookback_days = opts.lookback_days;

    let outcome = collect_rows(keys, &options, |key| async move {
        let region = key.region.clone().unwrap_or_default();
        fetch_region(&key.profile, &region, lookback_days).await
    })
    .await;

    info!(
        completed = outcome.completed,
        failed = outcome.failures.len(),
        idle_instances = outcome.row_count(),
        "idle RDS scan completed"
    );

    let path = timestamped_path(&config.output_dir(), "idle_rds_instances", "xlsx");
    let written = write_workbook(&path, BASE_COLUMNS, &outcome.rows)?;
    Ok((written, outcome))
}

async fn fetch_region(profile: &str, region: &str, lookback_days: i64) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, Some(region)).await;
    let account_id = aws::account_id(&sdk).await?;
    let rds = aws_sdk_rds::Client::new(&sdk);
    let cloudwatch = aws_sdk_cloudwatch::Client::new(&sdk);

    let readers = cluster_readers(&rds).await?;

    let mut rows = Vec::new();
    let mut instances = rds.describe_db_instances().into_paginator().items().send();
    while let Some(instance) = instances.next().await {
        let instance = instance.map_err(|e| aws::sdk_error("describe db instances", e))?;
        let Some(identifier) = instance.db_instance_identifier() else {
            continue;
        };

        if readers.contains(identifier) {
            info!(%profile, %region, instance = identifier, "skipping standby instance");
            continue;
        }

        if is_idle(&cloudwatch, identifier, lookback_days).await {
            rows.push(
                Row::on_sheet(SHEET)
                    .with("DBInstanceIdentifier", identifier)
                    .with(
                        "DBInstanceClass",
                        instance.db_instance_class().unwrap_or_default(),
                    )
                    .with("Engine", instance.engine().unwrap_or_default())
                    .with("Region", region)
                    .with("AccountName", profile)
                    .with("AccountNumber", account_id.as_str())
                    .with("IdleStatus", "No significant activity"),
            );
        }
    }

    Ok(rows)
}

/// Identifiers of cluster members that are not the writer.
async fn cluster_readers(rds: &aws_sdk_rds::Client) -> Result<HashSet<String>> {
    let mut readers = HashSet::new();
    let mut clusters = rds.describe_db_clusters().into_paginator().items().send();
    while let Some(cluster) = clusters.next().await {
        let cluster = cluster.map_err(|e| aws::sdk_error("describe db clusters", e))?;
        for member in cluster.db_cluster_members() {
            if !member.is_cluster_writer().unwrap_or(false) {
                if let Some(id) = member.db_instance_identifier() {
                    readers.insert(id.to_string());
                }
            }
        }
    }
    Ok(readers)
}

/// Check every watched metric; a metric whose fetch fails is logged and
/// treated as showing no activity, matching the skip-and-continue posture of
/// the rest of the run.
async fn is_idle(
    cloudwatch: &aws_sdk_cloudwatch::Client,
    identifier: &str,
    lookback_days: i64,
) -> bool {
    let now = Utc::now();
    let start = now - Duration::days(lookback_days);

    for (metric, threshold) in METRIC_THRESHOLDS {
        let resp = cloudwatch
            .get_metric_statistics()
            .namespace("AWS/RDS")
            .metric_name(*metric)
            .dimensions(
                Dimension::builder()
                    .name("DBInstanceIdentifier")
                    .value(identifier)
                    .build(),
            )
            .start_time(CwDateTime::from_secs(start.timestamp()))
            .end_time(CwDateTime::from_secs(now.timestamp()))
            .period(3600 * 24)
            .statistics(Statistic::Average)
            .send()
            .await;

        match resp {
            Ok(output) => {
                let averages: Vec<f64> = output
                    .datapoints()
                    .iter()
                    .filter_map(|point| point.average())
                    .collect();
                if exceeds_threshold(&averages, *threshold) {
                    return false;
                }
            }
            Err(err) => {
                warn!(
                    instance = identifier,
                    metric,
                    error = %aws::sdk_error("get metric statistics", err),
                    "failed to fetch metric"
                );
            }
        }
    }

    true
}

fn exceeds_threshold(averages: &[f64], threshold: f64) -> bool {
    averages.iter().any(|avg| *avg > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeds_threshold() {
        assert!(exceeds_threshold(&[0.2, 0.4, 6.1], 5.0));
        assert!(!exceeds_threshold(&[0.2, 0.4, 4.9], 5.0));
        assert!(!exceeds_threshold(&[], 5.0));
    }

    #[test]
    fn test_threshold_table_covers_activity_metrics() {
        let metrics: Vec<&str> = METRIC_THRESHOLDS.iter().map(|(m, _)| *m).collect();
        assert!(metrics.contains(&"DatabaseConnections"));
        assert!(metrics.contains(&"CPUUtilization"));
        assert_eq!(metrics.len(), 6);
    }
}

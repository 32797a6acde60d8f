//! Karpenter rightsizing report
//!
//! Finds instances provisioned by Karpenter whose Compute Optimizer
//! recommendations say both the instance and at least one attached volume
//! should change, across every profile and region. Profiles run on a small
//! worker pool; recommendation lookups go through the backoff wrapper since
//! Compute Optimizer throttles aggressively.

use std::time::Duration;

use aws_sdk_computeoptimizer::types::VolumeRecommendation;
use tracing::info;

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::fanout::{collect_rows, FanoutOptions, TaskKey};
use crate::retry::{with_backoff, RetryPolicy};
use crate::rows::Row;

/// Tag carried by every instance Karpenter provisions.
pub const PROVISIONER_TAG_KEY: &str = "karpenter.sh/provisioner-name";

const SHEET: &str = "Summary";

const BASE_COLUMNS: &[&str] = &["Profile", "AccountId", "Region", "InstanceId", "VolumeIds"];

const WORKERS: usize = 5;

#[derive(Debug, Clone)]
pub struct RightsizingOptions {
    pub retry: RetryPolicy,
}

impl Default for RightsizingOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(5, Duration::from_secs(2)),
        }
    }
}

/// Returns `None` when no instance needs rightsizing; no file is written in
/// that case.
pub async fn run(config: &AppConfig, opts: &RightsizingOptions) -> Result<Option<WrittenReport>> {
    let profiles = config.resolve_profiles()?;
    let regions = config.regions();

    let keys: Vec<TaskKey> = profiles.iter().map(TaskKey::profile).collect();
    let options = FanoutOptions::workers(config.workers().unwrap_or(WORKERS));

    let outcome = collect_rows(keys, &options, |key| {
        let regions = regions.clone();
        let retry = opts.retry.clone();
        async move { collect_profile(&key.profile, &regions, &retry).await }
    })
    .await;

    info!(
        completed = outcome.completed,
        failed = outcome.failures.len(),
        rows = outcome.row_count(),
        "rightsizing checks completed"
    );

    if outcome.rows.is_empty() {
        return Ok(None);
    }

    let path = timestamped_path(&config.output_dir(), "Karpenter_Rightsizing_Report", "xlsx");
    write_workbook(&path, BASE_COLUMNS, &outcome.rows).map(Some)
}

async fn collect_profile(
    profile: &str,
    regions: &[String],
    retry: &RetryPolicy,
) -> Result<Vec<Row>> {
    let mut rows = Vec::new();

    for region in regions {
        let sdk = aws::load_profile_config(profile, Some(region)).await;
        let account_id = aws::account_id(&sdk).await?;
        let ec2 = aws_sdk_ec2::Client::new(&sdk);
        let optimizer = aws_sdk_computeoptimizer::Client::new(&sdk);

        let resp = with_backoff("describe instances", retry, || {
            let ec2 = ec2.clone();
            async move {
                ec2.describe_instances()
                    .filters(
                        aws_sdk_ec2::types::Filter::builder()
                            .name("tag-key")
                            .values(PROVISIONER_TAG_KEY)
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| aws::sdk_error("describe instances", e))
            }
        })
        .await?;

        for reservation in resp.reservations() {
            for instance in reservation.instances() {
                let instance_id = instance.instance_id().unwrap_or_default().to_string();
                let instance_arn = ec2_arn(region, &account_id, "instance", &instance_id);

                let recommendations = with_backoff("get ec2 instance recommendations", retry, || {
                    let optimizer = optimizer.clone();
                    let arn = instance_arn.clone();
                    async move {
                        optimizer
                            .get_ec2_instance_recommendations()
                            .instance_arns(arn)
                            .send()
                            .await
                            .map_err(|e| aws::sdk_error("get ec2 instance recommendations", e))
                    }
                })
                .await?;
                let instance_needs_rightsizing =
                    !recommendations.instance_recommendations().is_empty();

                let mut volumes_needing_rightsizing = Vec::new();
                for mapping in instance.block_device_mappings() {
                    let Some(volume_id) = mapping.ebs().and_then(|ebs| ebs.volume_id()) else {
                        continue;
                    };
                    let volume_arn = ec2_arn(region, &account_id, "volume", volume_id);

                    let volume_recs = with_backoff("get ebs volume recommendations", retry, || {
                        let optimizer = optimizer.clone();
                        let arn = volume_arn.clone();
                        async move {
                            optimizer
                                .get_ebs_volume_recommendations()
                                .volume_arns(arn)
                                .send()
                                .await
                                .map_err(|e| aws::sdk_error("get ebs volume recommendations", e))
                        }
                    })
                    .await?;

                    if volume_needs_change(volume_recs.volume_recommendations()) {
                        volumes_needing_rightsizing.push(volume_id.to_string());
                    }
                }

                if instance_needs_rightsizing && !volumes_needing_rightsizing.is_empty() {
                    rows.push(
                        Row::on_sheet(SHEET)
                            .with("Profile", profile)
                            .with("AccountId", account_id.as_str())
                            .with("Region", region.as_str())
                            .with("InstanceId", instance_id)
                            .with("VolumeIds", volumes_needing_rightsizing.join(", ")),
                    );
                }
            }
        }
    }

    Ok(rows)
}

fn ec2_arn(region: &str, account_id: &str, resource: &str, id: &str) -> String {
    format!("arn:aws:ec2:{region}:{account_id}:{resource}/{id}")
}

/// A volume needs a change when any recommendation option proposes a volume
/// type different from the current configuration.
fn volume_needs_change(recommendations: &[VolumeRecommendation]) -> bool {
    recommendations.iter().any(|rec| {
        let current = rec
            .current_configuration()
            .and_then(|config| config.volume_type());
        rec.volume_recommendation_options().iter().any(|option| {
            let recommended = option.configuration().and_then(|config| config.volume_type());
            recommended.is_some() && recommended != current
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_computeoptimizer::types::{VolumeConfiguration, VolumeRecommendationOption};

    fn recommendation(current: &str, recommended: &str) -> VolumeRecommendation {
        VolumeRecommendation::builder()
            .current_configuration(
                VolumeConfiguration::builder().volume_type(current).build(),
            )
            .volume_recommendation_options(
                VolumeRecommendationOption::builder()
                    .configuration(
                        VolumeConfiguration::builder()
                            .volume_type(recommended)
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_ec2_arn() {
        assert_eq!(
            ec2_arn("us-east-1", "123456789012", "instance", "i-abc"),
            "arn:aws:ec2:us-east-1:123456789012:instance/i-abc"
        );
    }

    #[test]
    fn test_volume_change_detected_on_type_difference() {
        assert!(volume_needs_change(&[recommendation("gp2", "gp3")]));
    }

    #[test]
    fn test_volume_unchanged_when_types_match() {
        assert!(!volume_needs_change(&[recommendation("gp3", "gp3")]));
        assert!(!volume_needs_change(&[]));
    }
}

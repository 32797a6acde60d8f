//! Load balancer and target group health report
//!
//! Flags target groups with no targets or unhealthy targets, and load
//! balancers with no target groups or attached groups that are empty or
//! unhealthy. Profiles run on a worker pool of three with a jittered pause
//! between dispatches; every describe goes through the backoff wrapper with
//! the long throttling policy these APIs need.

use std::time::Duration;

use aws_sdk_elasticloadbalancingv2::types::{LoadBalancer, TargetGroup};
use tracing::info;

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::fanout::{collect_rows, DispatchDelay, FanoutOptions, FanoutOutcome, TaskKey};
use crate::retry::{with_backoff, RetryPolicy};
use crate::rows::Row;

const BASE_COLUMNS: &[&str] = &["Resource", "Name", "Status", "Account"];

const WORKERS: usize = 3;

#[derive(Debug, Clone)]
pub struct LbTargetOptions {
    pub region: String,
    pub retry: RetryPolicy,
}

impl LbTargetOptions {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            retry: RetryPolicy::new(10, Duration::from_secs(10)),
        }
    }
}

pub async fn run(
    config: &AppConfig,
    opts: &LbTargetOptions,
) -> Result<(WrittenReport, FanoutOutcome)> {
    let profiles = config.resolve_profiles()?;

    let keys: Vec<TaskKey> = profiles.iter().map(TaskKey::profile).collect();
    let options = FanoutOptions::workers(config.workers().unwrap_or(WORKERS))
        .with_dispatch_delay(DispatchDelay::Jittered {
            min: Duration::from_secs(2),
            max: Duration::from_secs(5),
        });

    let outcome = collect_rows(keys, &options, |key| {
        let region = opts.region.clone();
        let retry = opts.retry.clone();
        async move { check_profile(&key.profile, &region, &retry).await }
    })
    .await;

    info!(
        completed = outcome.completed,
        failed = outcome.failures.len(),
        findings = outcome.row_count(),
        "load balancer checks completed"
    );

    let path = timestamped_path(&config.output_dir(), "LoadBalancer_TargetGroup_Report", "xlsx");
    let written = write_workbook(&path, BASE_COLUMNS, &outcome.rows)?;
    Ok((written, outcome))
}

async fn check_profile(profile: &str, region: &str, retry: &RetryPolicy) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, Some(region)).await;
    let client = aws_sdk_elasticloadbalancingv2::Client::new(&sdk);

    let mut rows = Vec::new();

    // Standalone target-group pass
    let target_groups = list_target_groups(&client, retry).await?;
    for tg in &target_groups {
        let name = tg.target_group_name().unwrap_or_default().to_string();
        let arn = tg.target_group_arn().unwrap_or_default().to_string();

        match target_health(&client, retry, &arn).await {
            Ok(states) => rows.extend(target_group_rows(&name, &states)),
            Err(err) => rows.push(finding("Target Group", &name, &format!("Error: {err}"))),
        }
    }

    // Load-balancer pass: attached groups that are empty or unhealthy
    let load_balancers = list_load_balancers(&client, retry).await?;
    for lb in &load_balancers {
        let name = lb.load_balancer_name().unwrap_or_default().to_string();
        let arn = lb.load_balancer_arn().unwrap_or_default().to_string();

        match check_load_balancer(&client, retry, &name, &arn).await {
            Ok(lb_rows) => rows.extend(lb_rows),
            Err(err) => rows.push(finding("Load Balancer", &name, &format!("Error: {err}"))),
        }
    }

    info!(%profile, findings = rows.len(), "completed checks for profile");

    for row in &mut rows {
        row.set("Account", profile);
    }
    Ok(rows)
}

async fn check_load_balancer(
    client: &aws_sdk_elasticloadbalancingv2::Client,
    retry: &RetryPolicy,
    lb_name: &str,
    lb_arn: &str,
) -> Result<Vec<Row>> {
    let attachments = with_backoff("describe target groups for load balancer", retry, || {
        let client = client.clone();
        let arn = lb_arn.to_string();
        async move {
            client
                .describe_target_groups()
                .load_balancer_arn(arn)
                .send()
                .await
                .map_err(|e| aws::sdk_error("describe target groups", e))
        }
    })
    .await?;

    let attached: Vec<TargetGroup> = attachments.target_groups().to_vec();
    if attached.is_empty() {
        return Ok(vec![finding("Load Balancer", lb_name, "No Target Groups")]);
    }

    let mut rows = Vec::new();
    for tg in &attached {
        let tg_name = tg.target_group_name().unwrap_or_default().to_string();
        let arn = tg.target_group_arn().unwrap_or_default().to_string();
        let states = target_health(client, retry, &arn).await?;
        rows.extend(attached_group_rows(lb_name, &tg_name, &states));
    }
    Ok(rows)
}

async fn list_target_groups(
    client: &aws_sdk_elasticloadbalancingv2::Client,
    retry: &RetryPolicy,
) -> Result<Vec<TargetGroup>> {
    with_backoff("describe target groups", retry, || {
        let client = client.clone();
        async move {
            let mut all = Vec::new();
            let mut pages = client.describe_target_groups().into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| aws::sdk_error("describe target groups", e))?;
                all.extend(page.target_groups().iter().cloned());
            }
            Ok(all)
        }
    })
    .await
}

async fn list_load_balancers(
    client: &aws_sdk_elasticloadbalancingv2::Client,
    retry: &RetryPolicy,
) -> Result<Vec<LoadBalancer>> {
    with_backoff("describe load balancers", retry, || {
        let client = client.clone();
        async move {
            let mut all = Vec::new();
            let mut pages = client.describe_load_balancers().into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| aws::sdk_error("describe load balancers", e))?;
                all.extend(page.load_balancers().iter().cloned());
            }
            Ok(all)
        }
    })
    .await
}

/// Health state and reason per registered target.
async fn target_health(
    client: &aws_sdk_elasticloadbalancingv2::Client,
    retry: &RetryPolicy,
    target_group_arn: &str,
) -> Result<Vec<(String, String)>> {
    let resp = with_backoff("describe target health", retry, || {
        let client = client.clone();
        let arn = target_group_arn.to_string();
        async move {
            client
                .describe_target_health()
                .target_group_arn(arn)
                .send()
                .await
                .map_err(|e| aws::sdk_error("describe target health", e))
        }
    })
    .await?;

    Ok(resp
        .target_health_descriptions()
        .iter()
        .map(|description| {
            let state = description
                .target_health()
                .and_then(|health| health.state())
                .map(|state| state.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let reason = description
                .target_health()
                .and_then(|health| health.reason())
                .map(|reason| reason.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            (state, reason)
        })
        .collect())
}

fn finding(resource: &str, name: &str, status: &str) -> Row {
    Row::new()
        .with("Resource", resource)
        .with("Name", name)
        .with("Status", status)
}

fn target_group_rows(name: &str, states: &[(String, String)]) -> Vec<Row> {
    if states.is_empty() {
        return vec![finding("Target Group", name, "No Targets")];
    }
    states
        .iter()
        .filter(|(state, _)| state == "unhealthy")
        .map(|(_, reason)| finding("Target Group", name, &format!("Unhealthy: {reason}")))
        .collect()
}

fn attached_group_rows(lb_name: &str, tg_name: &str, states: &[(String, String)]) -> Vec<Row> {
    if states.is_empty() {
        return vec![finding(
            "Load Balancer",
            lb_name,
            &format!("Empty Target Group: {tg_name}"),
        )];
    }
    states
        .iter()
        .filter(|(state, _)| state == "unhealthy")
        .map(|_| {
            finding(
                "Load Balancer",
                lb_name,
                &format!("Associated Target Group: {tg_name} has Unhealthy target(s)"),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(s, r)| (s.to_string(), r.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_target_group_flagged() {
        let rows = target_group_rows("api-tg", &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Status"), "No Targets");
    }

    #[test]
    fn test_unhealthy_targets_flagged_with_reason() {
        let rows = target_group_rows(
            "api-tg",
            &states(&[
                ("healthy", "unknown"),
                ("unhealthy", "Target.Timeout"),
                ("unhealthy", "Target.FailedHealthChecks"),
            ]),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Status"), "Unhealthy: Target.Timeout");
        assert_eq!(rows[1].get("Status"), "Unhealthy: Target.FailedHealthChecks");
    }

    #[test]
    fn test_healthy_target_group_produces_no_rows() {
        let rows = target_group_rows("api-tg", &states(&[("healthy", "unknown")]));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_attached_empty_group_flagged_on_load_balancer() {
        let rows = attached_group_rows("prod-alb", "api-tg", &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Resource"), "Load Balancer");
        assert_eq!(rows[0].get("Status"), "Empty Target Group: api-tg");
    }

    #[test]
    fn test_attached_unhealthy_group_flagged_per_target() {
        let rows = attached_group_rows(
            "prod-alb",
            "api-tg",
            &states(&[("unhealthy", "Target.Timeout"), ("healthy", "unknown")]),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("Status"),
            "Associated Target Group: api-tg has Unhealthy target(s)"
        );
    }
}

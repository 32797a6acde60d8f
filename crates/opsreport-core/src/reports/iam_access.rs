//! IAM role service-access report
//!
//! Generates an Access Advisor job per role, polls it to completion, and
//! reports the days since each service was last used by the role.

use std::time::Duration;

use aws_sdk_iam::types::JobStatusType;
use chrono::Utc;
use tracing::info;

use crate::aws;
use crate::config::AppConfig;
use crate::error::{ReportError, Result};
use crate::export::{timestamped_path, write_csv, WrittenReport};
use crate::rows::Row;

const BASE_COLUMNS: &[&str] = &["RoleName", "ServiceName", "LastAccessed"];

#[derive(Debug, Clone)]
pub struct IamAccessOptions {
    pub profile: String,
    /// How many roles to sample; Access Advisor jobs are slow, so this stays
    /// small by default.
    pub max_roles: i32,
    pub poll_interval: Duration,
}

impl IamAccessOptions {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            max_roles: 3,
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// One service-access record for a role.
#[derive(Debug, Clone)]
pub struct ServiceAccess {
    pub role_name: String,
    pub service_name: String,
    /// Days since the service was last used, or `None` when it never was.
    pub days_since_access: Option<i64>,
}

impl ServiceAccess {
    pub fn last_accessed_label(&self) -> String {
        match self.days_since_access {
            Some(days) => format!("{days} days ago"),
            None => "Never".to_string(),
        }
    }
}

pub async fn run(
    config: &AppConfig,
    opts: &IamAccessOptions,
) -> Result<(Vec<ServiceAccess>, WrittenReport)> {
    let sdk = aws::load_profile_config(&opts.profile, None).await;
    let client = aws_sdk_iam::Client::new(&sdk);

    let resp = client
        .list_roles()
        .max_items(opts.max_roles)
        .send()
        .await
        .map_err(|e| aws::sdk_error("list roles", e))?;

    let now = Utc::now().timestamp();
    let mut records = Vec::new();

    for role in resp.roles() {
        let role_name = role.role_name().to_string();
        info!(role = %role_name, "generating service access report");

        let job = client
            .generate_service_last_accessed_details()
            .arn(role.arn())
            .send()
            .await
            .map_err(|e| aws::sdk_error("generate service last accessed details", e))?;
        let job_id = job
            .job_id()
            .ok_or_else(|| ReportError::Api("access advisor job id missing".into()))?
            .to_string();

        let details = poll_job(&client, &job_id, opts.poll_interval).await?;
        for service in details.services_last_accessed() {
            records.push(ServiceAccess {
                role_name: role_name.clone(),
                service_name: service.service_name().to_string(),
                days_since_access: service
                    .last_authenticated()
                    .map(|t| days_since(t.secs(), now)),
            });
        }
    }

    let rows: Vec<Row> = records.iter().map(access_row).collect();
    let path = timestamped_path(&config.output_dir(), "iam_role_service_access", "csv");
    let written = write_csv(&path, BASE_COLUMNS, &rows)?;
    Ok((records, written))
}

async fn poll_job(
    client: &aws_sdk_iam::Client,
    job_id: &str,
    poll_interval: Duration,
) -> Result<aws_sdk_iam::operation::get_service_last_accessed_details::GetServiceLastAccessedDetailsOutput>
{
    loop {
        let details = client
            .get_service_last_accessed_details()
            .job_id(job_id)
            .send()
            .await
            .map_err(|e| aws::sdk_error("get service last accessed details", e))?;

        match details.job_status() {
            JobStatusType::Completed => return Ok(details),
            JobStatusType::Failed => {
                return Err(ReportError::Api(format!(
                    "access advisor job {job_id} failed"
                )));
            }
            _ => tokio::time::sleep(poll_interval).await,
        }
    }
}

fn days_since(accessed_secs: i64, now_secs: i64) -> i64 {
    (now_secs - accessed_secs) / 86_400
}

fn access_row(record: &ServiceAccess) -> Row {
    Row::new()
        .with("RoleName", record.role_name.as_str())
        .with("ServiceName", record.service_name.as_str())
        .with("LastAccessed", record.last_accessed_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_since() {
        let now = 1_700_000_000;
        assert_eq!(days_since(now - 86_400 * 30, now), 30);
        assert_eq!(days_since(now - 3_600, now), 0);
    }

    #[test]
    fn test_last_accessed_label() {
        let used = ServiceAccess {
            role_name: "deploy".into(),
            service_name: "Amazon S3".into(),
            days_since_access: Some(12),
        };
        assert_eq!(used.last_accessed_label(), "12 days ago");

        let never = ServiceAccess {
            days_since_access: None,
            ..used
        };
        assert_eq!(never.last_accessed_label(), "Never");
    }

    #[test]
    fn test_access_row_columns() {
        let row = access_row(&ServiceAccess {
            role_name: "deploy".into(),
            service_name: "AWS Lambda".into(),
            days_since_access: None,
        });
        assert_eq!(row.get("RoleName"), "deploy");
        assert_eq!(row.get("LastAccessed"), "Never");
    }
}

//! API gateway tag inventory
//!
//! Lists every REST API in one account with its tags and writes a CSV whose
//! columns are the API details plus one column per discovered tag key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_csv, WrittenReport};
use crate::rows::Row;

const BASE_COLUMNS: &[&str] = &["id", "name", "description", "created_date", "resource_arn"];

#[derive(Debug, Clone)]
pub struct ApiGatewayOptions {
    pub profile: String,
    pub region: String,
}

pub async fn run(config: &AppConfig, opts: &ApiGatewayOptions) -> Result<WrittenReport> {
    let sdk = aws::load_profile_config(&opts.profile, Some(&opts.region)).await;
    let client = aws_sdk_apigateway::Client::new(&sdk);

    let mut rows = Vec::new();
    let mut pages = client.get_rest_apis().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                // Keep whatever was collected before the failure.
                warn!(
                    profile = %opts.profile,
                    error = %aws::sdk_error("get rest apis", err),
                    "error fetching API gateway data"
                );
                break;
            }
        };
        for api in page.items() {
            let id = api.id().unwrap_or_default();
            let created = api
                .created_date()
                .and_then(|d| DateTime::<Utc>::from_timestamp(d.secs(), 0))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();

            rows.push(gateway_row(
                id,
                api.name(),
                api.description(),
                &created,
                &rest_api_arn(&opts.region, id),
                api.tags(),
            ));
        }
    }

    info!(
        profile = %opts.profile,
        apis = rows.len(),
        "collected API gateways"
    );

    let path = timestamped_path(&config.output_dir(), "api_gateways_with_tags", "csv");
    write_csv(&path, BASE_COLUMNS, &rows)
}

fn rest_api_arn(region: &str, api_id: &str) -> String {
    format!("arn:aws:apigateway:{region}::/restapis/{api_id}")
}

fn gateway_row(
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
    created_date: &str,
    resource_arn: &str,
    tags: Option<&HashMap<String, String>>,
) -> Row {
    let mut row = Row::new()
        .with("id", id)
        .with("name", name.unwrap_or("Unnamed API"))
        .with(
            "description",
            description.unwrap_or("No description available"),
        )
        .with("created_date", created_date)
        .with("resource_arn", resource_arn);

    if let Some(tags) = tags {
        for (key, value) in tags {
            row.set(key, value);
        }
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{resolve_columns, MISSING};

    #[test]
    fn test_rest_api_arn() {
        assert_eq!(
            rest_api_arn("us-east-1", "abc123"),
            "arn:aws:apigateway:us-east-1::/restapis/abc123"
        );
    }

    #[test]
    fn test_gateway_row_defaults() {
        let row = gateway_row("abc", None, None, "2024-01-15", "arn:...", None);
        assert_eq!(row.get("name"), "Unnamed API");
        assert_eq!(row.get("description"), "No description available");
        assert_eq!(row.get("Team"), MISSING);
    }

    #[test]
    fn test_gateway_rows_collect_tag_columns() {
        let mut tags_a = HashMap::new();
        tags_a.insert("Team".to_string(), "payments".to_string());
        let mut tags_b = HashMap::new();
        tags_b.insert("Env".to_string(), "prod".to_string());

        let rows = vec![
            gateway_row("a", Some("api-a"), None, "", "arn:a", Some(&tags_a)),
            gateway_row("b", Some("api-b"), None, "", "arn:b", Some(&tags_b)),
        ];

        let columns = resolve_columns(BASE_COLUMNS, &rows);
        assert_eq!(
            columns,
            vec![
                "id",
                "name",
                "description",
                "created_date",
                "resource_arn",
                "Env",
                "Team"
            ]
        );
        assert_eq!(rows[0].get("Env"), MISSING);
        assert_eq!(rows[1].get("Env"), "prod");
    }
}

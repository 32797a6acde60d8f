//! IAM principal inventory
//!
//! Collects every IAM user and role across all profiles into one workbook
//! sheet of principal id, type, name, and ARN.

use tracing::{info, warn};

use crate::aws;
use crate::config::AppConfig;
use crate::error::Result;
use crate::export::{timestamped_path, write_workbook, WrittenReport};
use crate::rows::Row;

const SHEET: &str = "Principal Mappings";

const BASE_COLUMNS: &[&str] = &["PrincipalId", "Type", "Name", "ARN"];

pub async fn run(config: &AppConfig) -> Result<WrittenReport> {
    let profiles = config.resolve_profiles()?;

    let mut rows = Vec::new();
    for profile in &profiles {
        info!(%profile, "fetching IAM principals");
        match fetch_profile(profile).await {
            Ok(mut profile_rows) => rows.append(&mut profile_rows),
            Err(err) => {
                warn!(%profile, error = %err, "failed to fetch IAM principals, skipping profile");
            }
        }
    }

    let path = timestamped_path(&config.output_dir(), "Principal_Mappings", "xlsx");
    write_workbook(&path, BASE_COLUMNS, &rows)
}

async fn fetch_profile(profile: &str) -> Result<Vec<Row>> {
    let sdk = aws::load_profile_config(profile, None).await;
    let client = aws_sdk_iam::Client::new(&sdk);

    let mut rows = Vec::new();

    let mut users = client.list_users().into_paginator().items().send();
    while let Some(user) = users.next().await {
        let user = user.map_err(|e| aws::sdk_error("list users", e))?;
        rows.push(principal_row(
            user.user_id(),
            "User",
            user.user_name(),
            user.arn(),
        ));
    }

    let mut roles = client.list_roles().into_paginator().items().send();
    while let Some(role) = roles.next().await {
        let role = role.map_err(|e| aws::sdk_error("list roles", e))?;
        rows.push(principal_row(
            role.role_id(),
            "Role",
            role.role_name(),
            role.arn(),
        ));
    }

    Ok(rows)
}

fn principal_row(principal_id: &str, kind: &str, name: &str, arn: &str) -> Row {
    Row::on_sheet(SHEET)
        .with("PrincipalId", principal_id)
        .with("Type", kind)
        .with("Name", name)
        .with("ARN", arn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_row_shape() {
        let row = principal_row("AIDA123", "User", "deploy-bot", "arn:aws:iam::1:user/deploy-bot");
        assert_eq!(row.sheet(), Some(SHEET));
        assert_eq!(row.get("Type"), "User");
        assert_eq!(row.get("Name"), "deploy-bot");
    }
}

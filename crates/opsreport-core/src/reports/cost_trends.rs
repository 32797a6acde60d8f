//! Cost Explorer trend comparisons
//!
//! Pulls daily per-service costs and compares the current period against the
//! previous one at daily, weekly, and monthly granularity, one workbook
//! sheet per selected comparison.

use std::collections::{BTreeSet, HashMap};

use aws_sdk_costexplorer::types::{
    DateInterval, Granularity, GroupDefinition, GroupDefinitionType,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::info;

use crate::aws;
use crate::config::AppConfig;
use crate::error::{ReportError, Result};
use crate::export::{timestamped_path, write_sheets, SheetSpec, WrittenReport};
use crate::rows::Row;

/// Cost Explorer is only served out of this region.
const COST_EXPLORER_REGION: &str = "us-east-1";

const METRIC: &str = "UnblendedCost";

/// Which period comparisons to include in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    Daily,
    Weekly,
    Monthly,
    All,
}

impl TrendWindow {
    fn daily(self) -> bool {
        matches!(self, TrendWindow::Daily | TrendWindow::All)
    }

    fn weekly(self) -> bool {
        matches!(self, TrendWindow::Weekly | TrendWindow::All)
    }

    fn monthly(self) -> bool {
        matches!(self, TrendWindow::Monthly | TrendWindow::All)
    }
}

#[derive(Debug, Clone)]
pub struct CostTrendOptions {
    pub window: TrendWindow,
}

/// Per-service cost for one day, as returned by the usage API.
#[derive(Debug, Clone)]
struct DailyServiceCost {
    date: String,
    service: String,
    amount: f64,
}

pub async fn run(config: &AppConfig, opts: &CostTrendOptions) -> Result<WrittenReport> {
    let sdk = aws::load_default_config(COST_EXPLORER_REGION).await;
    let client = aws_sdk_costexplorer::Client::new(&sdk);

    let today = Local::now().date_naive();
    let mut sheets = Vec::new();

    if opts.window.daily() {
        let yesterday = today - Duration::days(1);
        let current = sum_by_service(&fetch_daily_costs(&client, today, today + Duration::days(1)).await?);
        let previous = sum_by_service(&fetch_daily_costs(&client, yesterday, today).await?);

        sheets.push(comparison_sheet(
            "Daily",
            "Today Cost",
            "Yesterday Cost",
            &current,
            &previous,
            false,
        ));
    }

    if opts.window.weekly() {
        let window_start = today - Duration::days(14);
        let midpoint = window_start + Duration::days(7);
        let costs = fetch_daily_costs(&client, window_start, today).await?;

        let previous = sum_by_service_between(&costs, window_start, midpoint);
        let current = sum_by_service_between(&costs, midpoint, today);

        sheets.push(comparison_sheet(
            "Weekly",
            "Current Week Cost",
            "Previous Week Cost",
            &current,
            &previous,
            true,
        ));
    }

    if opts.window.monthly() {
        let current_start = month_start(today);
        let previous_end = current_start - Duration::days(1);
        let previous_start = month_start(previous_end);

        let current = sum_by_service(&fetch_daily_costs(&client, current_start, today).await?);
        let previous = sum_by_service(
            &fetch_daily_costs(&client, previous_start, previous_end + Duration::days(1)).await?,
        );

        sheets.push(comparison_sheet(
            "Monthly",
            "Current Month Cost",
            "Previous Month Cost",
            &current,
            &previous,
            true,
        ));
    }

    info!(sheets = sheets.len(), "cost comparisons computed");

    let path = timestamped_path(&config.output_dir(), "cost_comparison", "xlsx");
    write_sheets(&path, &sheets)
}

async fn fetch_daily_costs(
    client: &aws_sdk_costexplorer::Client,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyServiceCost>> {
    let period = DateInterval::builder()
        .start(start.format("%Y-%m-%d").to_string())
        .end(end.format("%Y-%m-%d").to_string())
        .build()
        .map_err(|e| ReportError::Configuration(format!("invalid cost period: {e}")))?;

    let resp = client
        .get_cost_and_usage()
        .time_period(period)
        .granularity(Granularity::Daily)
        .metrics(METRIC)
        .group_by(
            GroupDefinition::builder()
                .r#type(GroupDefinitionType::Dimension)
                .key("SERVICE")
                .build(),
        )
        .send()
        .await
        .map_err(|e| aws::sdk_error("get cost and usage", e))?;

    let mut costs = Vec::new();
    for result in resp.results_by_time() {
        let date = result
            .time_period()
            .map(|p| p.start().to_string())
            .unwrap_or_default();
        for group in result.groups() {
            let service = group.keys().first().cloned().unwrap_or_default();
            let amount = group
                .metrics()
                .and_then(|metrics| metrics.get(METRIC))
                .and_then(|value| value.amount())
                .and_then(|amount| amount.parse::<f64>().ok())
                .unwrap_or(0.0);
            costs.push(DailyServiceCost {
                date: date.clone(),
                service,
                amount,
            });
        }
    }

    Ok(costs)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn sum_by_service(costs: &[DailyServiceCost]) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for cost in costs {
        *totals.entry(cost.service.clone()).or_default() += cost.amount;
    }
    totals
}

/// Sum the days in `[from, to)`, comparing the API's ISO date strings.
fn sum_by_service_between(
    costs: &[DailyServiceCost],
    from: NaiveDate,
    to: NaiveDate,
) -> HashMap<String, f64> {
    let from = from.format("%Y-%m-%d").to_string();
    let to = to.format("%Y-%m-%d").to_string();

    let mut totals: HashMap<String, f64> = HashMap::new();
    for cost in costs {
        if cost.date.as_str() >= from.as_str() && cost.date.as_str() < to.as_str() {
            *totals.entry(cost.service.clone()).or_default() += cost.amount;
        }
    }
    totals
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// Build one comparison sheet. With `union` the service list is the union of
/// both periods; without it only services present in the current period are
/// listed.
fn comparison_sheet(
    label: &str,
    current_column: &str,
    previous_column: &str,
    current: &HashMap<String, f64>,
    previous: &HashMap<String, f64>,
    union: bool,
) -> SheetSpec {
    let services: BTreeSet<&String> = if union {
        current.keys().chain(previous.keys()).collect()
    } else {
        current.keys().collect()
    };

    let rows: Vec<Row> = services
        .into_iter()
        .map(|service| {
            let current_cost = current.get(service).copied().unwrap_or(0.0);
            let previous_cost = previous.get(service).copied().unwrap_or(0.0);
            Row::new()
                .with("Service", service.as_str())
                .with(current_column, format!("{:.2}", round2(current_cost)))
                .with(previous_column, format!("{:.2}", round2(previous_cost)))
                .with(
                    "Cost Difference",
                    format!("{:.2}", round2(current_cost - previous_cost)),
                )
                .with(
                    "Percentage Change (%)",
                    format!("{:.2}", percentage_change(current_cost, previous_cost)),
                )
        })
        .collect();

    SheetSpec::new(
        label,
        &[
            "Service",
            current_column,
            previous_column,
            "Cost Difference",
            "Percentage Change (%)",
        ],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs() -> Vec<DailyServiceCost> {
        vec![
            DailyServiceCost {
                date: "2024-03-01".into(),
                service: "AmazonEC2".into(),
                amount: 10.0,
            },
            DailyServiceCost {
                date: "2024-03-02".into(),
                service: "AmazonEC2".into(),
                amount: 12.0,
            },
            DailyServiceCost {
                date: "2024-03-02".into(),
                service: "AmazonRDS".into(),
                amount: 5.0,
            },
            DailyServiceCost {
                date: "2024-03-09".into(),
                service: "AmazonEC2".into(),
                amount: 20.0,
            },
        ]
    }

    #[test]
    fn test_month_start() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(month_start(date), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_sum_by_service() {
        let totals = sum_by_service(&costs());
        assert_eq!(totals["AmazonEC2"], 42.0);
        assert_eq!(totals["AmazonRDS"], 5.0);
    }

    #[test]
    fn test_sum_by_service_between_is_half_open() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let totals = sum_by_service_between(&costs(), from, to);
        // 2024-03-09 falls outside [from, to)
        assert_eq!(totals["AmazonEC2"], 22.0);
    }

    #[test]
    fn test_percentage_change_zero_previous() {
        assert_eq!(percentage_change(10.0, 0.0), 0.0);
        assert_eq!(percentage_change(15.0, 10.0), 50.0);
        assert_eq!(percentage_change(5.0, 10.0), -50.0);
    }

    #[test]
    fn test_comparison_sheet_union_and_missing_services() {
        let mut current = HashMap::new();
        current.insert("AmazonEC2".to_string(), 10.0);
        let mut previous = HashMap::new();
        previous.insert("AmazonRDS".to_string(), 4.0);

        let sheet = comparison_sheet("Weekly", "Current", "Previous", &current, &previous, true);
        assert_eq!(sheet.rows.len(), 2);

        let ec2 = sheet
            .rows
            .iter()
            .find(|r| r.get("Service") == "AmazonEC2")
            .unwrap();
        assert_eq!(ec2.get("Current"), "10.00");
        assert_eq!(ec2.get("Previous"), "0.00");
        assert_eq!(ec2.get("Percentage Change (%)"), "0.00");

        let rds = sheet
            .rows
            .iter()
            .find(|r| r.get("Service") == "AmazonRDS")
            .unwrap();
        assert_eq!(rds.get("Cost Difference"), "-4.00");
        assert_eq!(rds.get("Percentage Change (%)"), "-100.00");
    }

    #[test]
    fn test_comparison_sheet_current_only() {
        let mut current = HashMap::new();
        current.insert("AmazonEC2".to_string(), 10.0);
        let mut previous = HashMap::new();
        previous.insert("AmazonRDS".to_string(), 4.0);

        let sheet = comparison_sheet("Daily", "Today", "Yesterday", &current, &previous, false);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].get("Service"), "AmazonEC2");
    }
}

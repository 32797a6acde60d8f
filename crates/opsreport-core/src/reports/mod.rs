//! Operational reports
//!
//! Each module is one independent fetch-transform-export pipeline. They all
//! follow the same shape: an options struct, an async `run` taking the
//! loaded [`AppConfig`](crate::config::AppConfig), and a
//! [`WrittenReport`](crate::export::WrittenReport) (or printed table) as the
//! result. Partial failure is the norm: a profile or region erroring is
//! logged and skipped, never fatal to the run.

pub mod api_gateways;
pub mod cost_trends;
pub mod idle_rds;
pub mod iam_access;
pub mod iam_principals;
pub mod instance_tags;
pub mod lb_targets;
pub mod rds_storage;
pub mod rightsizing;
pub mod snapshots;

pub mod compute;
pub mod cost;
pub mod iam;
pub mod lb;
pub mod rds;
pub mod tags;

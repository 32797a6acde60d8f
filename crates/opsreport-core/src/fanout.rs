//! Bounded fan-out executor
//!
//! Runs one task per (profile, optional region) pair on a fixed-size worker
//! pool and aggregates rows in completion order. A failing task is logged
//! and recorded, never cancelling its siblings: rows already collected from
//! other tasks always survive. An optional delay between dispatches spreads
//! request bursts across tasks that would otherwise start simultaneously.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{ReportError, Result};
use crate::rows::Row;

/// Identity of one unit of fan-out work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskKey {
    pub profile: String,
    pub region: Option<String>,
}

impl TaskKey {
    pub fn profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: None,
        }
    }

    pub fn profile_region(profile: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            region: Some(region.into()),
        }
    }

    /// Every (profile, region) pair for a run.
    pub fn cross(profiles: &[String], regions: &[String]) -> Vec<TaskKey> {
        profiles
            .iter()
            .flat_map(|p| regions.iter().map(move |r| TaskKey::profile_region(p, r)))
            .collect()
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}/{}", self.profile, region),
            None => write!(f, "{}", self.profile),
        }
    }
}

/// Pause inserted between dispatching consecutive tasks.
#[derive(Debug, Clone)]
pub enum DispatchDelay {
    Fixed(Duration),
    /// Uniformly random delay between the two bounds, inclusive.
    Jittered { min: Duration, max: Duration },
}

impl DispatchDelay {
    async fn wait(&self) {
        let delay = match self {
            DispatchDelay::Fixed(d) => *d,
            DispatchDelay::Jittered { min, max } => {
                let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
                Duration::from_millis(rand::thread_rng().gen_range(lo..=hi.max(lo)))
            }
        };
        tokio::time::sleep(delay).await;
    }
}

/// Fan-out tuning: worker-pool size and optional inter-dispatch delay.
#[derive(Debug, Clone)]
pub struct FanoutOptions {
    pub workers: usize,
    pub dispatch_delay: Option<DispatchDelay>,
}

impl FanoutOptions {
    pub fn workers(workers: usize) -> Self {
        Self {
            workers,
            dispatch_delay: None,
        }
    }

    pub fn with_dispatch_delay(mut self, delay: DispatchDelay) -> Self {
        self.dispatch_delay = Some(delay);
        self
    }
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            dispatch_delay: None,
        }
    }
}

/// A task that was skipped, with the error that skipped it.
#[derive(Debug)]
pub struct TaskFailure {
    pub key: TaskKey,
    pub error: ReportError,
}

/// Aggregated outcome of a fan-out run.
#[derive(Debug, Default)]
pub struct FanoutOutcome {
    pub rows: Vec<Row>,
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

impl FanoutOutcome {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Run `fetch` for every key with at most `options.workers` tasks in flight,
/// appending each task's rows to the outcome as it completes.
///
/// Completion order, not submission order, decides row order. A task error
/// is logged with its key and pushed onto `failures`; sibling tasks keep
/// running and their rows are unaffected.
pub async fn collect_rows<F, Fut>(
    keys: Vec<TaskKey>,
    options: &FanoutOptions,
    mut fetch: F,
) -> FanoutOutcome
where
    F: FnMut(TaskKey) -> Fut,
    Fut: Future<Output = Result<Vec<Row>>> + Send + 'static,
{
    let workers = options.workers.max(1);
    let mut in_flight: JoinSet<(TaskKey, Result<Vec<Row>>)> = JoinSet::new();
    let mut outcome = FanoutOutcome::default();
    let mut dispatched = 0usize;

    for key in keys {
        if dispatched > 0 {
            if let Some(delay) = &options.dispatch_delay {
                delay.wait().await;
            }
        }
        dispatched += 1;

        let task_key = key.clone();
        let fut = fetch(key);
        in_flight.spawn(async move { (task_key, fut.await) });

        while in_flight.len() >= workers {
            if let Some(joined) = in_flight.join_next().await {
                absorb(joined, &mut outcome);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        absorb(joined, &mut outcome);
    }

    outcome
}

fn absorb(
    joined: std::result::Result<(TaskKey, Result<Vec<Row>>), tokio::task::JoinError>,
    outcome: &mut FanoutOutcome,
) {
    match joined {
        Ok((key, Ok(rows))) => {
            info!(task = %key, rows = rows.len(), "task completed");
            outcome.completed += 1;
            outcome.rows.extend(rows);
        }
        Ok((key, Err(error))) => {
            error!(task = %key, %error, "task failed, skipping");
            outcome.failures.push(TaskFailure { key, error });
        }
        Err(join_error) => {
            error!(%join_error, "task panicked, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> Row {
        Row::new().with("id", id)
    }

    #[tokio::test]
    async fn test_collects_rows_from_all_tasks() {
        let keys = vec![
            TaskKey::profile("alpha"),
            TaskKey::profile("beta"),
            TaskKey::profile("gamma"),
        ];
        let outcome = collect_rows(keys, &FanoutOptions::workers(2), |key| async move {
            Ok(vec![row(&key.profile)])
        })
        .await;

        assert_eq!(outcome.completed, 3);
        assert_eq!(outcome.row_count(), 3);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failing_task_does_not_drop_other_rows() {
        let keys = vec![
            TaskKey::profile("good-1"),
            TaskKey::profile("bad"),
            TaskKey::profile("good-2"),
        ];
        let outcome = collect_rows(keys, &FanoutOptions::workers(3), |key| async move {
            if key.profile == "bad" {
                Err(ReportError::Api("boom".into()))
            } else {
                Ok(vec![row(&key.profile), row(&key.profile)])
            }
        })
        .await;

        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.row_count(), 4);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key.profile, "bad");
    }

    #[tokio::test]
    async fn test_connectivity_failure_isolated_to_one_region() {
        // 3 profiles x 2 regions; one profile's first region is unreachable.
        // Rows from the other profiles and from the failing profile's other
        // region must all survive.
        let profiles: Vec<String> = ["p1", "p2", "p3"].map(String::from).to_vec();
        let regions: Vec<String> = ["us-east-1", "eu-central-1"].map(String::from).to_vec();
        let keys = TaskKey::cross(&profiles, &regions);
        assert_eq!(keys.len(), 6);

        let outcome = collect_rows(keys, &FanoutOptions::workers(3), |key| async move {
            if key.profile == "p2" && key.region.as_deref() == Some("us-east-1") {
                Err(ReportError::Connectivity("endpoint unreachable".into()))
            } else {
                Ok(vec![Row::new().with("task", key.to_string())])
            }
        })
        .await;

        assert_eq!(outcome.completed, 5);
        assert_eq!(outcome.row_count(), 5);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key.to_string(), "p2/us-east-1");
        assert!(outcome.failures[0].error.is_skippable());

        let collected: Vec<&str> = outcome.rows.iter().map(|r| r.get("task")).collect();
        assert!(collected.contains(&"p2/eu-central-1"));
        assert!(!collected.contains(&"p2/us-east-1"));
    }

    #[tokio::test]
    async fn test_panicking_task_is_skipped() {
        let keys = vec![TaskKey::profile("ok"), TaskKey::profile("panics")];
        let outcome = collect_rows(keys, &FanoutOptions::workers(2), |key| async move {
            if key.profile == "panics" {
                panic!("task blew up");
            }
            Ok(vec![row(&key.profile)])
        })
        .await;

        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.row_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_dispatch_delay_spaces_submissions() {
        let keys = vec![
            TaskKey::profile("a"),
            TaskKey::profile("b"),
            TaskKey::profile("c"),
        ];
        let options = FanoutOptions::workers(3)
            .with_dispatch_delay(DispatchDelay::Fixed(Duration::from_secs(2)));

        let started = tokio::time::Instant::now();
        let outcome = collect_rows(keys, &options, |key| async move {
            Ok(vec![row(&key.profile)])
        })
        .await;

        assert_eq!(outcome.completed, 3);
        // No delay before the first dispatch, one between each of the rest.
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}

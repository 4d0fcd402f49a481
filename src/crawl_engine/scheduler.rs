//! Bounded fan-out of page tasks
//!
//! Every input address becomes one spawned task. A task holds a semaphore
//! permit for the whole of its body, so at most `limit` bodies (and therefore
//! at most `limit` open sessions) exist at any time. Reports come back in
//! completion order; `TaskReport::index` restores dispatch order.

use futures::Stream;
use futures::stream::FuturesUnordered;
use log::{debug, warn};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

use super::crawl_types::{PageTask, ScrapeError, TaskFailure, TaskReport, TaskState};

/// Shared stop switch for dispatch
///
/// Once closed it stays closed. Tasks check it after acquiring their permit
/// and report [`TaskFailure::Skipped`] instead of running.
#[derive(Debug, Clone, Default)]
pub struct DispatchGate {
    closed: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl DispatchGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop further dispatch. Returns `true` for the call that closed it.
    pub fn close(&self, reason: impl Into<String>) -> bool {
        let mut slot = self.reason.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let reason = reason.into();
        warn!(target: "stream_harvest::scheduler", "Dispatch stopped: {reason}");
        *slot = Some(reason);
        true
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reason given by the first `close`, if closed
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }
}

/// Runs task bodies with at most `limit` in flight
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    limit: usize,
    gate: DispatchGate,
}

impl TaskScheduler {
    /// A limit of zero is raised to one.
    #[must_use]
    pub fn new(limit: usize, gate: DispatchGate) -> Self {
        Self {
            limit: limit.max(1),
            gate,
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn gate(&self) -> &DispatchGate {
        &self.gate
    }

    /// Spawn one task per address and stream their reports as they finish.
    ///
    /// Addresses are not de-duplicated: every occurrence gets its own task
    /// and report. A body error that reports a lost browser transport closes
    /// the gate.
    pub fn run<I, F, Fut, T>(
        &self,
        addresses: I,
        task_fn: F,
    ) -> impl Stream<Item = TaskReport<T>> + Send + Unpin + use<I, F, Fut, T>
    where
        I: IntoIterator<Item = String>,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ScrapeError>> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let task_fn = Arc::new(task_fn);
        let reports = FuturesUnordered::new();

        for (index, address) in addresses.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let gate = self.gate.clone();
            let task_fn = Arc::clone(&task_fn);
            let task = PageTask::new(index, address);
            let panicked_task = task.clone();

            let handle = tokio::spawn(async move {
                let mut task = task;
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (task, Err(TaskFailure::Skipped("scheduler shut down".to_string())));
                };

                if gate.is_closed() {
                    let reason = gate.reason().unwrap_or_else(|| "dispatch stopped".to_string());
                    return (task, Err(TaskFailure::Skipped(reason)));
                }

                task.state = TaskState::Running;
                debug!(target: "stream_harvest::scheduler", "Task {index} running: {}", task.address);
                let outcome = match task_fn(task.address.clone()).await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        if e.is_transport() {
                            gate.close(format!("browser transport lost: {e}"));
                        }
                        Err(TaskFailure::Failed(e.to_string()))
                    }
                };
                task.state = if outcome.is_ok() { TaskState::Done } else { TaskState::Failed };
                (task, outcome)
            });

            reports.push(async move {
                let (task, outcome) = match handle.await {
                    Ok(finished) => finished,
                    Err(join_error) => {
                        let task = PageTask {
                            state: TaskState::Failed,
                            ..panicked_task
                        };
                        (task, Err(TaskFailure::Panicked(join_error.to_string())))
                    }
                };
                TaskReport { task, outcome }
            });
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use futures::StreamExt;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://x/a-{i}")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = TaskScheduler::new(3, DispatchGate::new());

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let reports: Vec<_> = scheduler
            .run(addresses(10), move |_| {
                let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ScrapeError>(())
                }
            })
            .collect()
            .await;

        assert_eq!(reports.len(), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_collapsed() {
        let scheduler = TaskScheduler::new(2, DispatchGate::new());
        let input = vec![
            "https://x/a-1".to_string(),
            "https://x/a-1".to_string(),
            "https://x/a-2".to_string(),
        ];
        let mut reports: Vec<_> = scheduler
            .run(input, |address| async move { Ok::<_, ScrapeError>(address) })
            .collect()
            .await;
        reports.sort_by_key(TaskReport::index);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].outcome.as_deref(), Ok("https://x/a-1"));
    }

    #[tokio::test]
    async fn test_failure_and_panic_are_isolated() {
        let scheduler = TaskScheduler::new(2, DispatchGate::new());
        let mut reports: Vec<_> = scheduler
            .run(addresses(3), |address| async move {
                if address.ends_with("a-0") {
                    return Err(ScrapeError::Session(SessionError::Closed));
                }
                if address.ends_with("a-1") {
                    panic!("body blew up");
                }
                Ok(address)
            })
            .collect()
            .await;
        reports.sort_by_key(TaskReport::index);

        assert!(matches!(reports[0].outcome, Err(TaskFailure::Failed(_))));
        assert!(matches!(reports[1].outcome, Err(TaskFailure::Panicked(_))));
        assert!(reports[2].outcome.is_ok());
        assert_eq!(reports[0].task.state, TaskState::Failed);
        assert_eq!(reports[1].task.state, TaskState::Failed);
        assert_eq!(reports[2].task.state, TaskState::Done);
    }

    #[tokio::test]
    async fn test_transport_failure_closes_gate() {
        let gate = DispatchGate::new();
        let scheduler = TaskScheduler::new(1, gate.clone());
        let mut reports: Vec<_> = scheduler
            .run(addresses(4), |address| async move {
                if address.ends_with("a-0") {
                    return Err(ScrapeError::Session(SessionError::Transport("gone".into())));
                }
                Ok(())
            })
            .collect()
            .await;
        reports.sort_by_key(TaskReport::index);

        assert!(gate.is_closed());
        assert!(matches!(reports[0].outcome, Err(TaskFailure::Failed(_))));
        for report in &reports[1..] {
            assert!(matches!(report.outcome, Err(TaskFailure::Skipped(_))));
        }
    }

    #[tokio::test]
    async fn test_task_states_follow_dispatch() {
        let gate = DispatchGate::new();
        let scheduler = TaskScheduler::new(1, gate.clone());
        let body_gate = gate.clone();
        let mut reports: Vec<_> = scheduler
            .run(addresses(3), move |address| {
                let gate = body_gate.clone();
                async move {
                    // Stop dispatch from inside the second task
                    if address.ends_with("a-1") {
                        gate.close("interrupted");
                    }
                    Ok::<_, ScrapeError>(())
                }
            })
            .collect()
            .await;
        reports.sort_by_key(TaskReport::index);

        let states: Vec<_> = reports.iter().map(|r| r.task.state).collect();
        assert_eq!(states, vec![TaskState::Done, TaskState::Done, TaskState::Pending]);
        assert!(matches!(reports[2].outcome, Err(TaskFailure::Skipped(_))));
    }

    #[test]
    fn test_gate_keeps_first_reason() {
        let gate = DispatchGate::new();
        assert!(gate.close("interrupted"));
        assert!(!gate.close("later"));
        assert_eq!(gate.reason().as_deref(), Some("interrupted"));
    }
}

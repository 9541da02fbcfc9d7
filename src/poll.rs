use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::target::WorkloadRef;
use crate::workload::WorkloadApi;

/// Shared flag that aborts a running wait. Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        CancelToken {
            flag: Arc::new(flag),
        }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns once set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Poll the observed replica count of `workload` until it equals `target`.
///
/// Makes at most `attempts` reads, sleeping `interval` between them, and
/// returns the number of reads it took. API errors end the wait immediately.
pub async fn wait_for_replicas<A>(
    api: &A,
    workload: &WorkloadRef,
    target: i32,
    attempts: u32,
    interval: Duration,
    cancel: &CancelToken,
) -> Result<u32>
where
    A: WorkloadApi + ?Sized,
{
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { target });
        }

        let scale = api.get_scale(workload).await?;
        log::debug!(
            "{workload} in {}: observed {} replicas, waiting for {target} ({attempt}/{attempts})",
            workload.namespace,
            scale.observed
        );
        if scale.observed == target {
            return Ok(attempt);
        }

        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled { target }),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    Err(Error::WaitTimeout {
        workload: workload.clone(),
        target,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::WorkloadKind;
    use crate::workload::fake::FakeCluster;

    const SECOND: Duration = Duration::from_secs(1);

    fn web() -> WorkloadRef {
        WorkloadRef::new(WorkloadKind::Deployment, "web", "default")
    }

    #[tokio::test(start_paused = true)]
    async fn returns_on_first_matching_read() {
        let cluster = FakeCluster::default().with(WorkloadKind::Deployment, "web", 2);
        cluster.script(WorkloadKind::Deployment, "web", &[2, 1, 0, 5]);

        let started = tokio::time::Instant::now();
        let taken = wait_for_replicas(&cluster, &web(), 0, 10, SECOND, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(taken, 3);
        assert_eq!(started.elapsed(), 2 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_the_attempt_budget() {
        let cluster = FakeCluster::default().with(WorkloadKind::Deployment, "web", 1);

        let err = wait_for_replicas(&cluster, &web(), 0, 4, SECOND, &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::WaitTimeout {
                target: 0,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(cluster.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_sleep() {
        let cluster = FakeCluster::default().with(WorkloadKind::Deployment, "web", 1);
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let err = wait_for_replicas(&cluster, &web(), 0, 60, SECOND, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { target: 0 }));
        assert_eq!(cluster.calls().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_reading() {
        let cluster = FakeCluster::default().with(WorkloadKind::Deployment, "web", 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        cancel.cancelled().await;

        let err = wait_for_replicas(&cluster, &web(), 0, 60, SECOND, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled { .. }));
        assert!(cluster.calls().is_empty());
    }
}

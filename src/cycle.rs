use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::poll::{wait_for_replicas, CancelToken};
use crate::target::{Target, WorkloadKind, WorkloadRef};
use crate::workload::WorkloadApi;

/// Scaling back up is capped independently of the user's wait budget.
pub const SCALE_UP_ATTEMPTS: u32 = 60;

#[derive(Clone, Debug)]
pub struct CycleOptions {
    pub poll_interval: Duration,
    pub scale_up_attempts: u32,
}

impl Default for CycleOptions {
    fn default() -> Self {
        CycleOptions {
            poll_interval: Duration::from_secs(1),
            scale_up_attempts: SCALE_UP_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleEvent {
    ScalingDown { workload: WorkloadRef, original: i32 },
    ScalingUp { workload: WorkloadRef, original: i32 },
    Completed { workload: WorkloadRef, replicas: i32 },
}

impl fmt::Display for CycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleEvent::ScalingDown { workload, original } => write!(
                f,
                "{} {} in {} has {original} replicas. Scaling to 0...",
                workload.kind, workload.name, workload.namespace
            ),
            CycleEvent::ScalingUp { workload, original } => write!(
                f,
                "{} {} in {} now has 0 replicas. Scaling back to {original}...",
                workload.kind, workload.name, workload.namespace
            ),
            CycleEvent::Completed { workload, replicas } => write!(
                f,
                "{} {} in {} has now been scaled back to {replicas}",
                workload.kind, workload.name, workload.namespace
            ),
        }
    }
}

/// Find the workload `target` names. A bare name is looked up as a
/// Deployment first, then as a StatefulSet.
pub async fn resolve<A>(api: &A, target: &Target, namespace: &str) -> Result<WorkloadRef>
where
    A: WorkloadApi + ?Sized,
{
    if let Some(kind) = target.kind {
        let workload = WorkloadRef::new(kind, &target.name, namespace);
        return api.get(&workload).await.map(|w| w.reference);
    }

    for kind in [WorkloadKind::Deployment, WorkloadKind::StatefulSet] {
        let workload = WorkloadRef::new(kind, &target.name, namespace);
        match api.get(&workload).await {
            Ok(found) => {
                log::debug!("resolved {} to {found_ref}", target.name, found_ref = found.reference);
                return Ok(found.reference);
            }
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err),
        }
    }

    Err(Error::NotFound(format!(
        "deployment/statefulset {}",
        target.name
    )))
}

/// Scale `workload` to zero, wait, then scale it back to its observed count
/// and wait again.
///
/// Failures after the scale-down has been issued come back as
/// `Error::Aborted`; the workload is not restored.
pub async fn run_cycle<A, F>(
    api: &A,
    workload: &WorkloadRef,
    max_wait_seconds: u32,
    options: &CycleOptions,
    cancel: &CancelToken,
    mut report: F,
) -> Result<i32>
where
    A: WorkloadApi + ?Sized,
    F: FnMut(&CycleEvent),
{
    let original = api.get(workload).await?.observed_replicas;
    log::info!("{workload} in {}: original replicas {original}", workload.namespace);
    report(&CycleEvent::ScalingDown {
        workload: workload.clone(),
        original,
    });

    let scaled = async {
        api.update_scale(workload, 0).await?;
        wait_for_replicas(
            api,
            workload,
            0,
            max_wait_seconds,
            options.poll_interval,
            cancel,
        )
        .await?;
        log::info!("{workload} in {} reached 0 replicas", workload.namespace);
        report(&CycleEvent::ScalingUp {
            workload: workload.clone(),
            original,
        });

        api.update_scale(workload, original).await?;
        wait_for_replicas(
            api,
            workload,
            original,
            options.scale_up_attempts,
            options.poll_interval,
            cancel,
        )
        .await?;
        Ok::<(), Error>(())
    };

    if let Err(err) = scaled.await {
        log::debug!("{workload} in {} left mid-cycle: {err}", workload.namespace);
        return Err(Error::Aborted {
            workload: workload.clone(),
            source: Box::new(err),
        });
    }

    report(&CycleEvent::Completed {
        workload: workload.clone(),
        replicas: original,
    });
    Ok(original)
}

//! Scale a Deployment or StatefulSet to zero and back to force a full
//! rollout of its pods.

pub mod context;
pub mod cycle;
pub mod error;
pub mod poll;
pub mod target;
pub mod workload;

pub use cycle::{resolve, run_cycle, CycleEvent, CycleOptions};
pub use error::{Error, Result};
pub use poll::CancelToken;
pub use target::{ScaleCycleRequest, Target, WorkloadKind, WorkloadRef};
pub use workload::{KubeWorkloadApi, ScaleState, Workload, WorkloadApi};

use crate::target::WorkloadRef;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("no or invalid context is set, use \"kubectl config use-context <context>\" to select a new one")]
    Context,
    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
    #[error("{0} cannot be found")]
    NotFound(String),
    #[error("k8s error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to encode scale: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{} {} in {} has not reached {target} replicas after {attempts} tries", .workload.kind.as_str(), .workload.name, .workload.namespace)]
    WaitTimeout {
        workload: WorkloadRef,
        target: i32,
        attempts: u32,
    },
    #[error("wait for {target} replicas was cancelled")]
    Cancelled { target: i32 },
    /// A failure after the workload was already scaled down. Nothing is rolled back.
    #[error("rescale of {workload} in {} aborted, the workload was left as the cluster reports it: {source}", .workload.namespace)]
    Aborted {
        workload: WorkloadRef,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The underlying error, looking through `Aborted`.
    pub fn cause(&self) -> &Error {
        match self {
            Error::Aborted { source, .. } => source.cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self.cause() {
            Error::NotFound(_) => true,
            Error::Kube(err) => is_status(err, 404),
            _ => false,
        }
    }
}

pub(crate) fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == code)
}

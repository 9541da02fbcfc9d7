use std::fmt;

use crate::error::{Error, Result};

const KIND_PREFIXES: [(&str, WorkloadKind); 4] = [
    ("deployment/", WorkloadKind::Deployment),
    ("deploy/", WorkloadKind::Deployment),
    ("statefulset/", WorkloadKind::StatefulSet),
    ("sts/", WorkloadKind::StatefulSet),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadKind::Deployment => f.write_str("Deployment"),
            WorkloadKind::StatefulSet => f.write_str("StatefulSet"),
        }
    }
}

/// The workload named on the command line. `kind` is `None` for a bare name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub kind: Option<WorkloadKind>,
    pub name: String,
}

impl Target {
    /// Parses `[kind/]name`, accepting the `deployment/`, `deploy/`,
    /// `statefulset/` and `sts/` prefixes.
    pub fn parse(arg: &str) -> Result<Target> {
        let (kind, name) = KIND_PREFIXES
            .iter()
            .find_map(|(prefix, kind)| arg.strip_prefix(prefix).map(|name| (Some(*kind), name)))
            .unwrap_or((None, arg));

        if name.is_empty() {
            return Err(Error::Validation(
                "either a deployment or a statefulset must be provided".to_owned(),
            ));
        }

        Ok(Target {
            kind,
            name: name.to_owned(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
}

impl WorkloadRef {
    pub fn new(kind: WorkloadKind, name: &str, namespace: &str) -> Self {
        WorkloadRef {
            kind,
            name: name.to_owned(),
            namespace: namespace.to_owned(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleCycleRequest {
    pub target: Target,
    pub max_wait_seconds: u32,
}

impl ScaleCycleRequest {
    /// Validates raw user input. Runs before any cluster access.
    pub fn new(args: &[String], max_wait_seconds: i64) -> Result<Self> {
        if max_wait_seconds <= 0 {
            return Err(Error::Validation(
                "invalid max number of waiting seconds provided".to_owned(),
            ));
        }
        let max_wait_seconds = u32::try_from(max_wait_seconds).map_err(|_| {
            Error::Validation(format!(
                "max number of waiting seconds must not exceed {}",
                u32::MAX
            ))
        })?;

        let target = match args {
            [arg] => Target::parse(arg)?,
            _ => {
                return Err(Error::Validation(
                    "either a deployment or a statefulset must be provided".to_owned(),
                ))
            }
        };

        Ok(ScaleCycleRequest {
            target,
            max_wait_seconds,
        })
    }
}

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{is_status, Error, Result};
use crate::target::{WorkloadKind, WorkloadRef};

const CONFLICT_RETRIES: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    pub reference: WorkloadRef,
    /// `status.replicas`, the count the controller currently observes.
    pub observed_replicas: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleState {
    pub desired: i32,
    pub observed: i32,
}

impl From<Scale> for ScaleState {
    fn from(scale: Scale) -> Self {
        ScaleState {
            desired: scale.spec.and_then(|spec| spec.replicas).unwrap_or(0),
            observed: scale.status.map_or(0, |status| status.replicas),
        }
    }
}

/// Access to the workloads being rescaled. A missing workload is reported
/// as `Error::NotFound` by `get`.
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    async fn get(&self, workload: &WorkloadRef) -> Result<Workload>;

    async fn get_scale(&self, workload: &WorkloadRef) -> Result<ScaleState>;

    async fn update_scale(&self, workload: &WorkloadRef, replicas: i32) -> Result<ScaleState>;
}

/// `WorkloadApi` over the `apps/v1` scale sub-resource.
#[derive(Clone)]
pub struct KubeWorkloadApi {
    client: Client,
    guard_conflicts: bool,
}

impl KubeWorkloadApi {
    pub fn new(client: Client) -> Self {
        KubeWorkloadApi {
            client,
            guard_conflicts: false,
        }
    }

    /// Update scale with the fetched `resourceVersion` as a precondition and
    /// retry on conflict, instead of patching blindly.
    pub fn with_conflict_guard(mut self, guard_conflicts: bool) -> Self {
        self.guard_conflicts = guard_conflicts;
        self
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn update_scale_of<K>(&self, api: Api<K>, name: &str, replicas: i32) -> Result<Scale>
    where
        K: Clone + DeserializeOwned + Debug,
    {
        if !self.guard_conflicts {
            let patch: Value = json!({
                "spec": {
                    "replicas": replicas
                }
            });
            let patch: Patch<&Value> = Patch::Merge(&patch);
            return Ok(api.patch_scale(name, &PatchParams::default(), &patch).await?);
        }

        let mut attempt = 1;
        loop {
            let mut scale = api.get_scale(name).await?;
            scale.spec = Some(ScaleSpec {
                replicas: Some(replicas),
            });
            let data = serde_json::to_vec(&scale)?;
            match api.replace_scale(name, &PostParams::default(), data).await {
                Err(err) if is_status(&err, 409) && attempt < CONFLICT_RETRIES => {
                    log::warn!("conflict updating scale of {name}, retrying ({attempt}/{CONFLICT_RETRIES})");
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }
}

#[async_trait]
impl WorkloadApi for KubeWorkloadApi {
    async fn get(&self, workload: &WorkloadRef) -> Result<Workload> {
        let name = &workload.name;
        let observed = match workload.kind {
            WorkloadKind::Deployment => self
                .api::<Deployment>(&workload.namespace)
                .get(name)
                .await
                .map(|d| d.status.and_then(|status| status.replicas).unwrap_or(0)),
            WorkloadKind::StatefulSet => self
                .api::<StatefulSet>(&workload.namespace)
                .get(name)
                .await
                .map(|ss| ss.status.map_or(0, |status| status.replicas)),
        };

        match observed {
            Ok(observed_replicas) => Ok(Workload {
                reference: workload.clone(),
                observed_replicas,
            }),
            Err(err) if is_status(&err, 404) => Err(Error::NotFound(format!(
                "{} {} in {}",
                workload.kind.as_str(),
                workload.name,
                workload.namespace
            ))),
            Err(err) => {
                if let kube::Error::Api(response) = &err {
                    log::debug!(
                        "Error getting {} {} in {}: {}",
                        workload.kind.as_str(),
                        workload.name,
                        workload.namespace,
                        response.message
                    );
                }
                Err(err.into())
            }
        }
    }

    async fn get_scale(&self, workload: &WorkloadRef) -> Result<ScaleState> {
        let scale = match workload.kind {
            WorkloadKind::Deployment => {
                self.api::<Deployment>(&workload.namespace)
                    .get_scale(&workload.name)
                    .await?
            }
            WorkloadKind::StatefulSet => {
                self.api::<StatefulSet>(&workload.namespace)
                    .get_scale(&workload.name)
                    .await?
            }
        };
        Ok(scale.into())
    }

    async fn update_scale(&self, workload: &WorkloadRef, replicas: i32) -> Result<ScaleState> {
        let scale = match workload.kind {
            WorkloadKind::Deployment => {
                let api = self.api::<Deployment>(&workload.namespace);
                self.update_scale_of(api, &workload.name, replicas).await?
            }
            WorkloadKind::StatefulSet => {
                let api = self.api::<StatefulSet>(&workload.namespace);
                self.update_scale_of(api, &workload.name, replicas).await?
            }
        };
        Ok(scale.into())
    }
}


#[cfg(test)]
mod tests {
    use k8s_openapi::api::autoscaling::v1::ScaleStatus;

    use super::*;

    #[test]
    fn scale_state_reads_spec_and_status() {
        let scale = Scale {
            spec: Some(ScaleSpec { replicas: Some(3) }),
            status: Some(ScaleStatus {
                replicas: 1,
                selector: None,
            }),
            ..Scale::default()
        };
        assert_eq!(
            ScaleState::from(scale),
            ScaleState {
                desired: 3,
                observed: 1
            }
        );
    }

    #[test]
    fn empty_scale_counts_as_zero() {
        assert_eq!(
            ScaleState::from(Scale::default()),
            ScaleState {
                desired: 0,
                observed: 0
            }
        );
    }
}

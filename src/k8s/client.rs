//! The narrow cluster-client port (Design Notes §9): `create/get/delete/list` over the seven
//! resource kinds the agent deployer touches, plus a self-subject-access-review probe. A real
//! implementation wraps `kube::Client`; tests substitute a `mockall`-generated fake so §4.5–§4.7
//! are exercised without a live cluster.

use crate::error::{Error, Result};
use crate::k8s::permissions::PermissionCheck;
use async_trait::async_trait;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams, PropagationPolicy};

/// Resource kinds the deployer creates, reads, or deletes, abstracted so both a real `kube`
/// client and a test fake satisfy the same contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_service_account(&self, namespace: &str, sa: ServiceAccount) -> Result<()>;
    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<()>;
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<Option<ServiceAccount>>;

    async fn create_role(&self, namespace: &str, role: Role) -> Result<()>;
    async fn delete_role(&self, namespace: &str, name: &str) -> Result<()>;

    async fn create_role_binding(&self, namespace: &str, binding: RoleBinding) -> Result<()>;
    async fn delete_role_binding(&self, namespace: &str, name: &str) -> Result<()>;

    async fn create_cluster_role(&self, role: ClusterRole) -> Result<()>;
    async fn delete_cluster_role(&self, name: &str) -> Result<()>;

    async fn create_cluster_role_binding(&self, binding: ClusterRoleBinding) -> Result<()>;
    async fn delete_cluster_role_binding(&self, name: &str) -> Result<()>;

    async fn create_job(&self, namespace: &str, job: Job) -> Result<()>;
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>>;
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;
    /// Opens the pod's log stream in follow mode (§4.7): the returned stream yields one `Ok(line)`
    /// per line as the container writes it, and keeps yielding until the stream ends or the
    /// underlying connection drops.
    async fn stream_pod_logs(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<BoxStream<'static, Result<String>>>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;

    async fn check_permission(&self, check: &PermissionCheck) -> Result<bool>;
}

/// The real, `kube`-backed implementation.
pub struct KubeClusterClient {
    client: kube::Client,
}

impl KubeClusterClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Builds from the ambient kubeconfig / in-cluster service-account, the same discovery
    /// `kube::Client::try_default` performs.
    pub async fn try_default() -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| Error::internal(format!("building cluster client: {e}")))?;
        Ok(Self::new(client))
    }

    fn foreground_delete_params() -> DeleteParams {
        DeleteParams {
            propagation_policy: Some(PropagationPolicy::Foreground),
            ..DeleteParams::default()
        }
    }
}

/// Treats a 404 from a delete call as success and any other error as a real failure (§4.5).
fn ignore_not_found(err: kube::Error) -> Result<()> {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 => Ok(()),
        other => Err(Error::internal(format!("cluster API error: {other}"))),
    }
}

/// Treats "already exists" (409) from a create call as success (§4.5).
fn ignore_already_exists(err: kube::Error) -> Result<()> {
    match &err {
        kube::Error::Api(resp) if resp.code == 409 => Ok(()),
        other => Err(Error::internal(format!("cluster API error: {other}"))),
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_service_account(&self, namespace: &str, sa: ServiceAccount) -> Result<()> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), &sa).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_already_exists(e),
        }
    }

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<Option<ServiceAccount>> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(sa) => Ok(Some(sa)),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(None),
            Err(e) => Err(Error::internal(format!("cluster API error: {e}"))),
        }
    }

    async fn create_role(&self, namespace: &str, role: Role) -> Result<()> {
        let api: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), &role).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_already_exists(e),
        }
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn create_role_binding(&self, namespace: &str, binding: RoleBinding) -> Result<()> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), &binding).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_already_exists(e),
        }
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn create_cluster_role(&self, role: ClusterRole) -> Result<()> {
        let api: Api<ClusterRole> = Api::all(self.client.clone());
        match api.create(&PostParams::default(), &role).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_already_exists(e),
        }
    }

    async fn delete_cluster_role(&self, name: &str) -> Result<()> {
        let api: Api<ClusterRole> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn create_cluster_role_binding(&self, binding: ClusterRoleBinding) -> Result<()> {
        let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
        match api.create(&PostParams::default(), &binding).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_already_exists(e),
        }
    }

    async fn delete_cluster_role_binding(&self, name: &str) -> Result<()> {
        let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn create_job(&self, namespace: &str, job: Job) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &job)
            .await
            .map(|_| ())
            .map_err(|e| Error::internal(format!("creating job: {e}")))
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(job) => Ok(Some(job)),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(None),
            Err(e) => Err(Error::internal(format!("cluster API error: {e}"))),
        }
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &Self::foreground_delete_params()).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_not_found(e),
        }
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        let list = api
            .list(&params)
            .await
            .map_err(|e| Error::internal(format!("listing pods: {e}")))?;
        Ok(list.items)
    }

    async fn stream_pod_logs(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            follow: true,
            ..LogParams::default()
        };
        let bytes = api
            .log_stream(pod_name, &params)
            .await
            .map_err(|e| Error::internal(format!("opening log stream for {pod_name}: {e}")))?;

        let reader = BufReader::new(
            bytes.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)).into_async_read(),
        );
        let lines = reader
            .lines()
            .map(|line| line.map_err(|e| Error::internal(format!("reading log line: {e}"))));
        Ok(lines.boxed())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(cm) => Ok(Some(cm)),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(None),
            Err(e) => Err(Error::internal(format!("cluster API error: {e}"))),
        }
    }

    async fn check_permission(&self, check: &PermissionCheck) -> Result<bool> {
        use k8s_openapi::api::authorization::v1::{
            ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
        };

        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    namespace: check.namespace.clone(),
                    verb: Some(check.verb.clone()),
                    resource: Some(check.resource.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let api: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
        let result = api
            .create(&PostParams::default(), &review)
            .await
            .map_err(|e| Error::internal(format!("self-subject-access-review: {e}")))?;
        Ok(result.status.map(|s| s.allowed).unwrap_or(false))
    }
}

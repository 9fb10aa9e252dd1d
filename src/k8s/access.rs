//! Idempotent creation and deletion of the five access resources the agent needs (§4.5):
//! a ServiceAccount, a namespaced Role + RoleBinding, and a cluster-wide ClusterRole +
//! ClusterRoleBinding. "Create" treats "already exists" as success; "delete" treats "not found"
//! as success — both handled inside [`crate::k8s::client::KubeClusterClient`].

use crate::agent_config::AgentConfig;
use crate::error::Result;
use crate::k8s::client::ClusterClient;
use crate::k8s::labels::standard_labels;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::core::ObjectMeta;

/// Cluster-wide resource names are a fixed, product-specific constant (§4.5).
pub const CLUSTER_ROLE_NAME: &str = "gpu-stack-agent-node-reader";
pub const CLUSTER_ROLE_BINDING_NAME: &str = "gpu-stack-agent-node-reader-binding";

fn role_name(config: &AgentConfig) -> String {
    format!("{}-role", config.service_account_name)
}

fn role_binding_name(config: &AgentConfig) -> String {
    format!("{}-role-binding", config.service_account_name)
}

fn object_meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(standard_labels()),
        ..Default::default()
    }
}

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(|s| s.to_string()).collect()),
        resources: Some(resources.iter().map(|s| s.to_string()).collect()),
        verbs: verbs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Creates all five access resources, tolerating any that already exist.
pub async fn ensure_all(client: &dyn ClusterClient, config: &AgentConfig) -> Result<()> {
    client
        .create_service_account(
            &config.namespace,
            ServiceAccount {
                metadata: object_meta(&config.service_account_name, Some(&config.namespace)),
                ..Default::default()
            },
        )
        .await?;

    client
        .create_role(
            &config.namespace,
            Role {
                metadata: object_meta(&role_name(config), Some(&config.namespace)),
                rules: Some(vec![
                    rule(&[""], &["configmaps"], &["create", "get", "update", "patch"]),
                    rule(&[""], &["pods"], &["get", "list"]),
                ]),
            },
        )
        .await?;

    client
        .create_role_binding(
            &config.namespace,
            RoleBinding {
                metadata: object_meta(&role_binding_name(config), Some(&config.namespace)),
                role_ref: RoleRef {
                    api_group: "rbac.authorization.k8s.io".to_string(),
                    kind: "Role".to_string(),
                    name: role_name(config),
                },
                subjects: Some(vec![Subject {
                    kind: "ServiceAccount".to_string(),
                    name: config.service_account_name.clone(),
                    namespace: Some(config.namespace.clone()),
                    ..Default::default()
                }]),
            },
        )
        .await?;

    client
        .create_cluster_role(ClusterRole {
            metadata: object_meta(CLUSTER_ROLE_NAME, None),
            rules: Some(vec![
                rule(&[""], &["nodes"], &["get", "list"]),
                rule(&[""], &["pods"], &["get", "list"]),
                rule(&[""], &["services"], &["get", "list"]),
                rule(&["gpu-stack.example.com"], &["*"], &["get", "list"]),
            ]),
            ..Default::default()
        })
        .await?;

    client
        .create_cluster_role_binding(ClusterRoleBinding {
            metadata: object_meta(CLUSTER_ROLE_BINDING_NAME, None),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "ClusterRole".to_string(),
                name: CLUSTER_ROLE_NAME.to_string(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: config.service_account_name.clone(),
                namespace: Some(config.namespace.clone()),
                ..Default::default()
            }]),
        })
        .await?;

    Ok(())
}

/// Deletes each access resource independently, returning the name of every one that failed to
/// delete rather than stopping at the first failure (property P9, via the caller in
/// [`crate::k8s::lifecycle`]).
pub async fn delete_all(client: &dyn ClusterClient, config: &AgentConfig) -> Vec<(String, crate::error::Error)> {
    let mut failures = Vec::new();

    if let Err(e) = client.delete_cluster_role_binding(CLUSTER_ROLE_BINDING_NAME).await {
        failures.push((CLUSTER_ROLE_BINDING_NAME.to_string(), e));
    }
    if let Err(e) = client.delete_cluster_role(CLUSTER_ROLE_NAME).await {
        failures.push((CLUSTER_ROLE_NAME.to_string(), e));
    }
    if let Err(e) = client
        .delete_role_binding(&config.namespace, &role_binding_name(config))
        .await
    {
        failures.push((role_binding_name(config), e));
    }
    if let Err(e) = client.delete_role(&config.namespace, &role_name(config)).await {
        failures.push((role_name(config), e));
    }
    if let Err(e) = client
        .delete_service_account(&config.namespace, &config.service_account_name)
        .await
    {
        failures.push((config.service_account_name.clone(), e));
    }

    failures
}

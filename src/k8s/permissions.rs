//! Preflight permission matrix (§4.7 step 1): every verb/resource/scope triple the lifecycle
//! needs before it will attempt to deploy, probed via `SelfSubjectAccessReview`.

use crate::error::{Error, Result};
use crate::k8s::client::ClusterClient;
use serde::Serialize;

/// One authorization probe and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionCheck {
    pub resource: String,
    pub verb: String,
    /// `None` for cluster-scoped resources.
    pub namespace: Option<String>,
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PermissionCheck {
    fn new(resource: &str, verb: &str, namespace: Option<&str>) -> Self {
        Self {
            resource: resource.to_string(),
            verb: verb.to_string(),
            namespace: namespace.map(str::to_string),
            allowed: false,
            reason: None,
        }
    }

    fn scope_label(&self) -> &'static str {
        if self.namespace.is_some() {
            "namespace"
        } else {
            "cluster-scoped"
        }
    }
}

const NAMESPACED_KINDS: &[&str] = &["serviceaccounts", "roles", "rolebindings", "jobs"];
const NAMESPACED_VERBS: &[&str] = &["create", "get", "list", "delete"];
const CLUSTER_KINDS: &[&str] = &["clusterroles", "clusterrolebindings"];
const CONFIGMAP_VERBS: &[&str] = &["get", "list"];

/// Builds the full matrix of probes required before `Deploy` proceeds.
pub fn required_checks(namespace: &str) -> Vec<PermissionCheck> {
    let mut checks = Vec::new();
    for kind in NAMESPACED_KINDS {
        for verb in NAMESPACED_VERBS {
            checks.push(PermissionCheck::new(kind, verb, Some(namespace)));
        }
    }
    for kind in CLUSTER_KINDS {
        checks.push(PermissionCheck::new(kind, "create", None));
    }
    for verb in CONFIGMAP_VERBS {
        checks.push(PermissionCheck::new("configmaps", verb, Some(namespace)));
    }
    checks
}

/// Runs every probe; any that errors aborts the whole matrix immediately with a wrapped error
/// (§4.7 step 1, "matrix-level short-circuit"). Missing entries are aggregated into a single
/// `PermissionDenied` error naming a remediation manifest.
pub async fn preflight(client: &dyn ClusterClient, namespace: &str) -> Result<()> {
    let mut missing = Vec::new();
    for mut check in required_checks(namespace) {
        let allowed = client.check_permission(&check).await.map_err(|e| {
            Error::internal(format!(
                "permission probe for {} {} failed: {e}",
                check.verb, check.resource
            ))
        })?;
        check.allowed = allowed;
        if !allowed {
            missing.push(format!("{} {} ({})", check.verb, check.resource, check.scope_label()));
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    Err(Error::permission_denied(format!(
        "missing required permissions: {}. Apply the prepackaged manifests \
         (rbac/service-account.yaml, rbac/role.yaml, rbac/role-binding.yaml, \
         rbac/cluster-role.yaml, rbac/cluster-role-binding.yaml) as a cluster admin, then retry.",
        missing.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_covers_every_namespaced_kind_and_verb() {
        let checks = required_checks("gpu-operators");
        assert_eq!(checks.len(), NAMESPACED_KINDS.len() * NAMESPACED_VERBS.len() + CLUSTER_KINDS.len() + CONFIGMAP_VERBS.len());
        assert!(checks
            .iter()
            .any(|c| c.resource == "jobs" && c.verb == "delete" && c.namespace.as_deref() == Some("gpu-operators")));
    }

    #[test]
    fn cluster_scoped_checks_have_no_namespace() {
        let checks = required_checks("gpu-operators");
        let cluster_role_check = checks.iter().find(|c| c.resource == "clusterroles").unwrap();
        assert!(cluster_role_check.namespace.is_none());
    }
}

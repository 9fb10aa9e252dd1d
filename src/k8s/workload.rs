//! The agent workload object (§4.6): a one-shot batch Job with two selectable security profiles.
//! `deploy` implements the delete-then-recreate reconcile sequence — no concurrent caller may run
//! this against the same workload name at once (§5).

use crate::agent_config::AgentConfig;
use crate::error::{Error, Result};
use crate::k8s::client::ClusterClient;
use crate::k8s::labels::standard_labels;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, EmptyDirVolumeSource, LocalObjectReference, PodSecurityContext,
    PodSpec, PodTemplateSpec, ResourceRequirements, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectMeta;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DELETE_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
const TTL_SECONDS_AFTER_FINISHED: i32 = 3600;
const ACTIVE_DEADLINE_SECONDS: i64 = 18000;
const SCRATCH_VOLUME_NAME: &str = "scratch";
const SCRATCH_MOUNT_PATH: &str = "/var/run/gpu-stack-agent/scratch";

fn resources(requests: [(&str, &str); 3], limits: [(&str, &str); 3]) -> ResourceRequirements {
    let to_map = |pairs: [(&str, &str); 3]| {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
            .collect::<BTreeMap<_, _>>()
    };
    ResourceRequirements {
        requests: Some(to_map(requests)),
        limits: Some(to_map(limits)),
        ..Default::default()
    }
}

fn privileged_security_context() -> SecurityContext {
    SecurityContext {
        privileged: Some(true),
        allow_privilege_escalation: Some(true),
        capabilities: Some(Capabilities {
            add: Some(vec!["SYS_ADMIN".to_string(), "SYS_CHROOT".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn restricted_security_context() -> SecurityContext {
    SecurityContext {
        privileged: Some(false),
        allow_privilege_escalation: Some(false),
        read_only_root_filesystem: Some(true),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_security_context(privileged: bool) -> PodSecurityContext {
    if privileged {
        PodSecurityContext {
            run_as_user: Some(0),
            run_as_group: Some(0),
            fs_group: Some(0),
            fs_group_change_policy: Some("OnRootMismatch".to_string()),
            ..Default::default()
        }
    } else {
        PodSecurityContext {
            run_as_user: Some(65534),
            run_as_group: Some(65534),
            fs_group: Some(65534),
            seccomp_profile: Some(k8s_openapi::api::core::v1::SeccompProfile {
                type_: "RuntimeDefault".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Builds the workload object for `config`, selecting the privileged or restricted security
/// profile per the table in §4.6.
pub fn build_job(config: &AgentConfig) -> Job {
    let mut args = vec!["snapshot".to_string(), "-o".to_string(), config.output_uri.clone()];
    if config.debug {
        args.splice(0..0, vec!["--debug".to_string(), "--log-json".to_string()]);
    }

    let (security_context, resource_requirements, host_pid, host_network, host_ipc) = if config.privileged {
        (
            privileged_security_context(),
            resources(
                [("cpu", "1"), ("memory", "4Gi"), ("ephemeral-storage", "2Gi")],
                [("cpu", "2"), ("memory", "8Gi"), ("ephemeral-storage", "4Gi")],
            ),
            true,
            true,
            true,
        )
    } else {
        (
            restricted_security_context(),
            resources(
                [("cpu", "100m"), ("memory", "256Mi"), ("ephemeral-storage", "256Mi")],
                [("cpu", "500m"), ("memory", "512Mi"), ("ephemeral-storage", "512Mi")],
            ),
            false,
            false,
            false,
        )
    };

    let mut volume_mounts = vec![VolumeMount {
        name: SCRATCH_VOLUME_NAME.to_string(),
        mount_path: SCRATCH_MOUNT_PATH.to_string(),
        ..Default::default()
    }];
    let mut volumes = vec![Volume {
        name: SCRATCH_VOLUME_NAME.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }];
    if config.privileged {
        volume_mounts.push(VolumeMount {
            name: "run-systemd".to_string(),
            mount_path: "/run/systemd".to_string(),
            read_only: Some(true),
            ..Default::default()
        });
        volumes.push(Volume {
            name: "run-systemd".to_string(),
            host_path: Some(k8s_openapi::api::core::v1::HostPathVolumeSource {
                path: "/run/systemd".to_string(),
                type_: None,
            }),
            ..Default::default()
        });
    }

    let container = Container {
        name: "agent".to_string(),
        image: Some(config.image.clone()),
        args: Some(args),
        security_context: Some(security_context),
        resources: Some(resource_requirements),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    let pod_spec = PodSpec {
        containers: vec![container],
        restart_policy: Some("Never".to_string()),
        service_account_name: Some(config.service_account_name.clone()),
        node_selector: Some(config.node_selector.clone()),
        host_pid: Some(host_pid),
        host_network: Some(host_network),
        host_ipc: Some(host_ipc),
        security_context: Some(pod_security_context(config.privileged)),
        volumes: Some(volumes),
        image_pull_secrets: if config.image_pull_secrets.is_empty() {
            None
        } else {
            Some(
                config
                    .image_pull_secrets
                    .iter()
                    .map(|s| LocalObjectReference { name: Some(s.clone()) })
                    .collect(),
            )
        },
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(config.workload_name.clone()),
            namespace: Some(config.namespace.clone()),
            labels: Some(standard_labels()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            completions: Some(1),
            parallelism: Some(1),
            backoff_limit: Some(0),
            ttl_seconds_after_finished: Some(TTL_SECONDS_AFTER_FINISHED),
            active_deadline_seconds: Some(ACTIVE_DEADLINE_SECONDS),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(standard_labels()),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// If a workload with this name exists, deletes it with foreground propagation and polls every
/// 500ms (30s timeout) until it is observed gone, then creates a fresh one (§4.6).
pub async fn deploy(client: &dyn ClusterClient, config: &AgentConfig) -> Result<()> {
    if client.get_job(&config.namespace, &config.workload_name).await?.is_some() {
        info!(workload = %config.workload_name, "deleting existing workload before recreate");
        client.delete_job(&config.namespace, &config.workload_name).await?;
        wait_until_gone(client, config).await?;
    }

    client.create_job(&config.namespace, build_job(config)).await?;
    debug!(workload = %config.workload_name, "workload created");
    Ok(())
}

async fn wait_until_gone(client: &dyn ClusterClient, config: &AgentConfig) -> Result<()> {
    let deadline = tokio::time::Instant::now() + DELETE_WAIT_TIMEOUT;
    loop {
        if client.get_job(&config.namespace, &config.workload_name).await?.is_none() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::timeout(format!(
                "timed out waiting for workload `{}` to be deleted",
                config.workload_name
            )));
        }
        tokio::time::sleep(DELETE_POLL_INTERVAL).await;
    }
}

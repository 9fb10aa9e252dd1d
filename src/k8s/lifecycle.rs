//! Cluster agent lifecycle (§4.7): composes permission preflight, access-resource setup, workload
//! deploy, completion waiting, log streaming, snapshot retrieval, and teardown.

use crate::agent_config::{AgentConfig, CleanupOptions};
use crate::error::{Error, Result};
use crate::k8s::client::ClusterClient;
use crate::k8s::labels::pod_label_selector;
use crate::k8s::{access, locator, permissions, workload};
use futures::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SNAPSHOT_KEY: &str = "snapshot.yaml";
const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(500);
const POD_READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct AgentLifecycle<'a> {
    client: &'a dyn ClusterClient,
    config: AgentConfig,
}

impl<'a> AgentLifecycle<'a> {
    pub fn new(client: &'a dyn ClusterClient, config: AgentConfig) -> Self {
        Self { client, config }
    }

    /// Preflight → idempotent access resources → delete-and-recreate workload (§4.7 step 1-3).
    pub async fn deploy(&self, cancellation: CancellationToken) -> Result<()> {
        if cancellation.is_cancelled() {
            return Err(Error::cancelled("deploy cancelled before starting"));
        }
        permissions::preflight(self.client, &self.config.namespace).await?;
        access::ensure_all(self.client, &self.config).await?;
        workload::deploy(self.client, &self.config).await?;
        Ok(())
    }

    /// Polls the workload's terminal condition until `Complete=True` (returns `Ok`) or
    /// `Failed=True` (returns the terminal message as an error), honoring `timeout` and
    /// `cancellation`.
    pub async fn wait_for_completion(
        &self,
        cancellation: CancellationToken,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if cancellation.is_cancelled() {
                return Err(Error::cancelled("wait_for_completion cancelled"));
            }
            let job = self
                .client
                .get_job(&self.config.namespace, &self.config.workload_name)
                .await?
                .ok_or_else(|| Error::not_found(format!("workload `{}` not found", self.config.workload_name)))?;

            if let Some(status) = &job.status {
                if let Some(conditions) = &status.conditions {
                    for condition in conditions {
                        if condition.type_ == "Complete" && condition.status == "True" {
                            return Ok(());
                        }
                        if condition.type_ == "Failed" && condition.status == "True" {
                            return Err(Error::internal(format!(
                                "workload `{}` failed: {}",
                                self.config.workload_name,
                                condition.message.clone().unwrap_or_default()
                            )));
                        }
                    }
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "timed out waiting for workload `{}` to complete",
                    self.config.workload_name
                )));
            }
            tokio::time::sleep(COMPLETION_POLL_INTERVAL).await;
        }
    }

    /// Locates the one pod matching the workload's label selector and copies its logs, each line
    /// prefixed, until cancellation fires or the stream ends.
    pub async fn stream_logs(
        &self,
        cancellation: CancellationToken,
        writer: &mut dyn std::io::Write,
        prefix: &str,
    ) -> Result<()> {
        let pods = self
            .client
            .list_pods(&self.config.namespace, &pod_label_selector())
            .await?;
        let pod = pods
            .first()
            .ok_or_else(|| Error::not_found("no pod found for workload label selector"))?;
        let pod_name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::internal("pod has no name"))?;

        if cancellation.is_cancelled() {
            return Err(Error::cancelled("stream_logs cancelled before starting"));
        }
        let mut lines = self.client.stream_pod_logs(&self.config.namespace, &pod_name).await?;
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    return Err(Error::cancelled("stream_logs cancelled mid-stream"));
                }
                next = lines.next() => {
                    match next {
                        Some(Ok(line)) => {
                            writeln!(writer, "{prefix}{line}")
                                .map_err(|e| Error::internal(format!("writing log line: {e}")))?;
                        }
                        Some(Err(err)) => return Err(err),
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Polls every 500ms for the pod to enter `Running`, erroring early on `Failed`.
    pub async fn wait_for_pod_ready(&self, cancellation: CancellationToken, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if cancellation.is_cancelled() {
                return Err(Error::cancelled("wait_for_pod_ready cancelled"));
            }
            let pods = self
                .client
                .list_pods(&self.config.namespace, &pod_label_selector())
                .await?;
            if let Some(pod) = pods.first() {
                if let Some(status) = &pod.status {
                    match status.phase.as_deref() {
                        Some("Running") => return Ok(()),
                        Some("Failed") => {
                            return Err(Error::internal(format!(
                                "pod for workload `{}` failed before becoming ready",
                                self.config.workload_name
                            )))
                        }
                        _ => {}
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout("timed out waiting for pod readiness"));
            }
            tokio::time::sleep(POD_READY_POLL_INTERVAL).await;
        }
    }

    /// Reads the output configuration object and returns the value at the fixed key
    /// `snapshot.yaml` (§4.8).
    pub async fn get_snapshot(&self) -> Result<String> {
        let loc = locator::parse(&self.config.output_uri)?;
        let config_map = self
            .client
            .get_config_map(&loc.namespace, &loc.name)
            .await?
            .ok_or_else(|| Error::not_found(format!("configuration object `{}` not found", self.config.output_uri)))?;

        config_map
            .data
            .as_ref()
            .and_then(|data| data.get(SNAPSHOT_KEY))
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!(
                    "key `{SNAPSHOT_KEY}` not found in configuration object `{}`",
                    self.config.output_uri
                ))
            })
    }

    /// Best-effort teardown (§4.7, property P9): accumulates every deletion failure rather than
    /// stopping at the first one. A no-op when `opts.enabled` is false.
    pub async fn cleanup(&self, opts: CleanupOptions) -> Result<()> {
        if !opts.enabled {
            debug!("cleanup disabled, leaving resources in place");
            return Ok(());
        }

        let mut failures = Vec::new();
        if let Err(e) = self
            .client
            .delete_job(&self.config.namespace, &self.config.workload_name)
            .await
        {
            failures.push((self.config.workload_name.clone(), e));
        } else {
            debug!(workload = %self.config.workload_name, "deleted workload");
        }

        for (name, err) in access::delete_all(self.client, &self.config).await {
            failures.push((name, err));
        }

        if failures.is_empty() {
            return Ok(());
        }

        let message = failures
            .iter()
            .map(|(name, err)| format!("{name}: {err}"))
            .collect::<Vec<_>>()
            .join("; ");
        warn!(failures = failures.len(), "cleanup left resources undeleted");
        Err(Error::internal(format!("cleanup failed for: {message}")))
    }
}

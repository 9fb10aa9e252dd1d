//! Embedded component templates: the data half of the "templates are data" contract (§1). Each
//! template is plain YAML text with `${nr-var:dotted.path}` placeholders, substituted by
//! [`super::generic::render`] from a component's override map and scheduling policy.

/// Returns the embedded template for `tag`, or `None` if no built-in template exists for it.
pub fn lookup(tag: &str) -> Option<&'static str> {
    match tag {
        "gpu-operator" => Some(GPU_OPERATOR),
        "network-operator" => Some(NETWORK_OPERATOR),
        "cert-manager" => Some(CERT_MANAGER),
        "node-customization-operator" => Some(NODE_CUSTOMIZATION_OPERATOR),
        "monitoring-sentinel" => Some(MONITORING_SENTINEL),
        "dra-driver" => Some(DRA_DRIVER),
        _ => None,
    }
}

const GPU_OPERATOR: &str = "\
driver:
  version: \"${nr-var:driver.version}\"
  repository: \"${nr-var:driver.repository}\"
toolkit:
  enabled: true
mig:
  strategy: \"${nr-var:mig.strategy}\"
nodeSelector: ${nr-var:scheduling.accelerated.selector}
tolerations: ${nr-var:scheduling.accelerated.tolerations}
";

const NETWORK_OPERATOR: &str = "\
nicClusterPolicy:
  ofedDriver:
    version: \"${nr-var:ofed.version}\"
  rdmaSharedDevicePlugin:
    enabled: ${nr-var:rdma.enabled}
nodeSelector: ${nr-var:scheduling.accelerated.selector}
tolerations: ${nr-var:scheduling.accelerated.tolerations}
";

const CERT_MANAGER: &str = "\
installCRDs: true
replicaCount: ${nr-var:replicaCount}
nodeSelector: ${nr-var:scheduling.system.selector}
tolerations: ${nr-var:scheduling.system.tolerations}
";

const NODE_CUSTOMIZATION_OPERATOR: &str = "\
sysctl:
  profile: \"${nr-var:sysctl.profile}\"
nodeSelector: ${nr-var:scheduling.system.selector}
tolerations: ${nr-var:scheduling.system.tolerations}
";

const MONITORING_SENTINEL: &str = "\
dcgmExporter:
  enabled: true
  config: \"${nr-var:dcgm.exporter.config}\"
nodeSelector: ${nr-var:scheduling.accelerated.selector}
tolerations: ${nr-var:scheduling.accelerated.tolerations}
";

const DRA_DRIVER: &str = "\
resourceSlices:
  enabled: true
driver:
  version: \"${nr-var:driver.version}\"
nodeSelector: ${nr-var:scheduling.accelerated.selector}
tolerations: ${nr-var:scheduling.accelerated.tolerations}
";

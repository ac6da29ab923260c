//! Which node and cluster this invocation runs on.

use crate::config::ClusterConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub nodename: String,
    /// `None` when the node name matches no known cluster.
    pub cluster: Option<String>,
}

impl HostContext {
    #[must_use]
    pub fn new(nodename: impl Into<String>, known: &[String]) -> Self {
        let nodename = nodename.into();
        let cluster = known
            .iter()
            .find(|name| !name.is_empty() && nodename.contains(name.as_str()))
            .cloned();
        Self { nodename, cluster }
    }

    #[must_use]
    pub fn detect(config: &ClusterConfig) -> Self {
        let nodename = config.nodename.clone().unwrap_or_else(detect_nodename);
        Self::new(nodename, &config.known)
    }

    /// Requests may only be approved on the cluster they were made for.
    #[must_use]
    pub fn serves(&self, cluster: &str) -> bool {
        self.nodename.contains(cluster)
    }

    #[must_use]
    pub fn cluster_name(&self) -> &str {
        self.cluster.as_deref().unwrap_or("unknown")
    }
}

fn detect_nodename() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        vec!["thomas".to_string(), "michael".to_string(), "young".to_string()]
    }

    #[test]
    fn finds_cluster_in_nodename() {
        let host = HostContext::new("login02.thomas.ucl.ac.uk", &known());
        assert_eq!(host.cluster.as_deref(), Some("thomas"));
        assert!(host.serves("thomas"));
        assert!(!host.serves("young"));
    }

    #[test]
    fn unknown_host_has_no_cluster() {
        let host = HostContext::new("laptop", &known());
        assert_eq!(host.cluster, None);
        assert_eq!(host.cluster_name(), "unknown");
    }

    #[test]
    fn config_override_wins() {
        let config = ClusterConfig {
            nodename: Some("ylogin01.young".to_string()),
            known: known(),
        };
        let host = HostContext::detect(&config);
        assert_eq!(host.nodename, "ylogin01.young");
        assert_eq!(host.cluster.as_deref(), Some("young"));
    }
}

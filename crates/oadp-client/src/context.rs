use crate::config::ClientConfig;

/// Namespace the OADP operator is installed into by default.
pub const DEFAULT_ADMIN_NAMESPACE: &str = "openshift-adp";

/// The namespaces an invocation acts in. Every operation gets this passed
/// explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// The namespace of the current kubeconfig context. Non-admin objects are
    /// created here.
    pub namespace: String,

    /// The namespace of the Velero installation, used by admin commands.
    pub admin_namespace: String,
}

impl RequestContext {
    /// Picks the admin namespace from the `--namespace` flag, then the client
    /// config, then [`DEFAULT_ADMIN_NAMESPACE`].
    pub fn resolve(
        requester_namespace: impl Into<String>,
        namespace_flag: Option<&str>,
        config: &ClientConfig,
    ) -> Self {
        let admin_namespace = namespace_flag
            .or(config.namespace.as_deref())
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or(DEFAULT_ADMIN_NAMESPACE)
            .to_owned();

        Self {
            namespace: requester_namespace.into(),
            admin_namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("velero"), Some("oadp-prod"), "velero")]
    #[case(None, Some("oadp-prod"), "oadp-prod")]
    #[case(None, None, "openshift-adp")]
    #[case(Some(""), None, "openshift-adp")]
    fn admin_namespace_precedence(
        #[case] flag: Option<&str>,
        #[case] configured: Option<&str>,
        #[case] expected: &str,
    ) {
        let config = ClientConfig {
            namespace: configured.map(str::to_owned),
            ..ClientConfig::default()
        };

        let context = RequestContext::resolve("team-a", flag, &config);

        assert_eq!(context.admin_namespace, expected);
        assert_eq!(context.namespace, "team-a");
    }
}

use crate::command::CommandInvoker;
use crate::RuntimeError;
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const METALLB_API_VERSION: &str = "metallb.io/v1beta1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    IpAddressPool,
    L2Advertisement,
}

impl ResourceKind {
    pub fn api_version(self) -> &'static str {
        METALLB_API_VERSION
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::IpAddressPool => "IPAddressPool",
            Self::L2Advertisement => "L2Advertisement",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A namespaced load-balancer resource in declarative form.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub spec: Value,
}

impl Resource {
    /// Address pool handing out `addresses` (ranges or CIDRs, verbatim).
    pub fn ip_address_pool(name: &str, namespace: &str, addresses: &[String]) -> Self {
        Self {
            kind: ResourceKind::IpAddressPool,
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            spec: json!({ "addresses": addresses }),
        }
    }

    /// Layer-2 advertisement announcing exactly one pool.
    pub fn l2_advertisement(name: &str, namespace: &str, pool: &str) -> Self {
        Self {
            kind: ResourceKind::L2Advertisement,
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            spec: json!({ "ipAddressPools": [pool] }),
        }
    }

    pub fn to_manifest(&self) -> Value {
        json!({
            "apiVersion": self.kind.api_version(),
            "kind": self.kind.kind(),
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
            },
            "spec": self.spec,
        })
    }
}

/// Declarative create/replace access to load-balancer resources.
pub trait ResourceClient: Send + Sync {
    /// Fails if the resource already exists.
    fn create(&self, resource: &Resource) -> Result<(), RuntimeError>;

    fn replace(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        resource: &Resource,
    ) -> Result<(), RuntimeError>;
}

/// Hands out a connected `ResourceClient`, or reports why none is available.
pub trait ResourceClientProvider: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ResourceClient>, RuntimeError>;
}

/// `ResourceClient` driving `kubectl`, with manifests fed on stdin.
pub struct KubectlClient {
    invoker: Arc<dyn CommandInvoker>,
    kubectl: String,
    kubeconfig: Option<PathBuf>,
}

impl KubectlClient {
    pub fn new(
        invoker: Arc<dyn CommandInvoker>,
        kubectl: &str,
        kubeconfig: Option<PathBuf>,
    ) -> Self {
        Self {
            invoker,
            kubectl: kubectl.to_owned(),
            kubeconfig,
        }
    }

    fn argv(&self, args: &[&str]) -> Vec<String> {
        let mut argv = vec![self.kubectl.clone()];
        if let Some(ref kubeconfig) = self.kubeconfig {
            argv.push("--kubeconfig".to_owned());
            argv.push(kubeconfig.display().to_string());
        }
        argv.extend(args.iter().map(|a| (*a).to_owned()));
        argv
    }

    fn submit(&self, verb: &str, resource: &Resource) -> Result<(), RuntimeError> {
        let manifest = serde_json::to_string(&resource.to_manifest())?;
        debug!(
            "kubectl {verb} {}/{} in {}",
            resource.kind, resource.name, resource.namespace
        );
        self.invoker
            .run(&self.argv(&[verb, "-f", "-"]), Some(&manifest))
            .map(|_| ())
    }
}

impl ResourceClient for KubectlClient {
    fn create(&self, resource: &Resource) -> Result<(), RuntimeError> {
        self.submit("create", resource)
    }

    fn replace(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        resource: &Resource,
    ) -> Result<(), RuntimeError> {
        if resource.kind != kind || resource.name != name || resource.namespace != namespace {
            return Err(RuntimeError::Api(format!(
                "replace target {kind}/{name} in {namespace} does not match resource {}/{} in {}",
                resource.kind, resource.name, resource.namespace
            )));
        }
        self.submit("replace", resource)
    }
}

/// Connects `KubectlClient`s after checking that kubectl is usable.
pub struct KubectlProvider {
    invoker: Arc<dyn CommandInvoker>,
    kubectl: String,
    kubeconfig: Option<PathBuf>,
}

impl KubectlProvider {
    pub fn new(
        invoker: Arc<dyn CommandInvoker>,
        kubectl: &str,
        kubeconfig: Option<PathBuf>,
    ) -> Self {
        Self {
            invoker,
            kubectl: kubectl.to_owned(),
            kubeconfig,
        }
    }
}

impl ResourceClientProvider for KubectlProvider {
    fn connect(&self) -> Result<Box<dyn ResourceClient>, RuntimeError> {
        if let Some(ref kubeconfig) = self.kubeconfig {
            if !kubeconfig.is_file() {
                return Err(RuntimeError::BackendUnavailable(format!(
                    "kubeconfig {} not found",
                    kubeconfig.display()
                )));
            }
        }
        let client = KubectlClient::new(
            Arc::clone(&self.invoker),
            &self.kubectl,
            self.kubeconfig.clone(),
        );
        self.invoker
            .run(&client.argv(&["version", "--client"]), None)
            .map_err(|e| RuntimeError::BackendUnavailable(format!("{}: {e}", self.kubectl)))?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInvoker;

    fn invoker() -> Arc<MockInvoker> {
        Arc::new(MockInvoker::new())
    }

    #[test]
    fn pool_manifest_shape() {
        let pool = Resource::ip_address_pool(
            "sunbeam-public-pool",
            "metallb-system",
            &["10.20.0.10-10.20.0.50".to_owned()],
        );
        let manifest = pool.to_manifest();
        assert_eq!(manifest["apiVersion"], "metallb.io/v1beta1");
        assert_eq!(manifest["kind"], "IPAddressPool");
        assert_eq!(manifest["metadata"]["name"], "sunbeam-public-pool");
        assert_eq!(manifest["metadata"]["namespace"], "metallb-system");
        assert_eq!(manifest["spec"]["addresses"][0], "10.20.0.10-10.20.0.50");
    }

    #[test]
    fn advertisement_references_single_pool() {
        let adv =
            Resource::l2_advertisement("sunbeam-public-adv", "metallb-system", "sunbeam-public-pool");
        let manifest = adv.to_manifest();
        assert_eq!(manifest["kind"], "L2Advertisement");
        assert_eq!(
            manifest["spec"]["ipAddressPools"],
            serde_json::json!(["sunbeam-public-pool"])
        );
    }

    #[test]
    fn kubectl_client_pipes_manifest() {
        let inv = invoker();
        let client = KubectlClient::new(
            Arc::clone(&inv) as Arc<dyn CommandInvoker>,
            "kubectl",
            Some(PathBuf::from("/etc/kube.conf")),
        );
        let pool = Resource::ip_address_pool("p", "ns", &["10.0.0.0/28".to_owned()]);
        client.create(&pool).unwrap();
        client
            .replace(ResourceKind::IpAddressPool, "p", "ns", &pool)
            .unwrap();

        assert_eq!(
            inv.commands(),
            vec![
                "kubectl --kubeconfig /etc/kube.conf create -f -",
                "kubectl --kubeconfig /etc/kube.conf replace -f -",
            ]
        );
        let stdin = inv.stdin_log();
        let sent: Value = serde_json::from_str(stdin[0].as_deref().unwrap()).unwrap();
        assert_eq!(sent, pool.to_manifest());
    }

    #[test]
    fn replace_rejects_mismatched_target() {
        let client = KubectlClient::new(invoker() as Arc<dyn CommandInvoker>, "kubectl", None);
        let pool = Resource::ip_address_pool("p", "ns", &[]);
        assert!(matches!(
            client.replace(ResourceKind::IpAddressPool, "other", "ns", &pool),
            Err(RuntimeError::Api(_))
        ));
    }

    #[test]
    fn provider_requires_existing_kubeconfig() {
        let provider = KubectlProvider::new(
            invoker() as Arc<dyn CommandInvoker>,
            "kubectl",
            Some(PathBuf::from("/nonexistent/netfence/kubeconfig")),
        );
        assert!(matches!(
            provider.connect(),
            Err(RuntimeError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn provider_checks_kubectl_runs() {
        let dir = tempfile::tempdir().unwrap();
        let kubeconfig = dir.path().join("config");
        std::fs::write(&kubeconfig, "apiVersion: v1\n").unwrap();

        let failing = Arc::new(MockInvoker::with_responses(vec![Err(
            RuntimeError::ExecFailed("not found".to_owned()),
        )]));
        let provider = KubectlProvider::new(
            failing as Arc<dyn CommandInvoker>,
            "kubectl",
            Some(kubeconfig.clone()),
        );
        assert!(matches!(
            provider.connect(),
            Err(RuntimeError::BackendUnavailable(_))
        ));

        let inv = invoker();
        let provider = KubectlProvider::new(
            Arc::clone(&inv) as Arc<dyn CommandInvoker>,
            "kubectl",
            Some(kubeconfig),
        );
        assert!(provider.connect().is_ok());
        assert!(inv.commands()[0].ends_with("version --client"));
    }
}

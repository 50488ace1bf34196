use crate::command::CommandInvoker;
use crate::RuntimeError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Operations the reconcilers need from the network-fabric control plane,
/// scoped to a single model.
pub trait FabricControl: Send + Sync {
    /// Name of the model every call is scoped to.
    fn scope(&self) -> &str;

    fn list_spaces(&self) -> Result<BTreeSet<String>, RuntimeError>;

    fn add_space(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError>;

    fn set_space_subnets(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError>;

    /// Apply a single `key=value` model configuration assignment.
    fn set_model_config(&self, assignment: &str) -> Result<(), RuntimeError>;

    fn list_applications(&self) -> Result<BTreeSet<String>, RuntimeError>;

    /// Apply a `key=value` assignment to an application's configuration.
    /// With `json_output` false the command's output is returned as plain text.
    fn set_application_config(
        &self,
        application: &str,
        assignment: &str,
        json_output: bool,
    ) -> Result<String, RuntimeError>;
}

#[derive(Debug, Deserialize)]
struct SpacesOutput {
    #[serde(default)]
    spaces: Vec<SpaceEntry>,
}

#[derive(Debug, Deserialize)]
struct SpaceEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatusOutput {
    #[serde(default)]
    applications: serde_json::Map<String, serde_json::Value>,
}

/// Fabric control through the `juju` CLI.
pub struct JujuFabric {
    invoker: Arc<dyn CommandInvoker>,
    juju: String,
    model: String,
}

impl JujuFabric {
    pub fn new(invoker: Arc<dyn CommandInvoker>, model: &str) -> Self {
        Self {
            invoker,
            juju: "juju".to_owned(),
            model: model.to_owned(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, juju: &str) -> Self {
        self.juju = juju.to_owned();
        self
    }

    /// `juju <args...> --model <model>`
    fn juju(&self, args: &[&str], tail: &[String]) -> Result<String, RuntimeError> {
        let mut argv = Vec::with_capacity(args.len() + tail.len() + 3);
        argv.push(self.juju.clone());
        argv.extend(args.iter().map(|a| (*a).to_owned()));
        argv.extend(tail.iter().cloned());
        argv.push("--model".to_owned());
        argv.push(self.model.clone());
        self.invoker.run(&argv, None)
    }
}

impl FabricControl for JujuFabric {
    fn scope(&self) -> &str {
        &self.model
    }

    fn list_spaces(&self) -> Result<BTreeSet<String>, RuntimeError> {
        let raw = self.juju(&["spaces", "--format", "json"], &[])?;
        let parsed: SpacesOutput = serde_json::from_str(&raw)
            .map_err(|e| RuntimeError::UnexpectedOutput(format!("juju spaces: {e}")))?;
        Ok(parsed.spaces.into_iter().map(|s| s.name).collect())
    }

    fn add_space(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError> {
        self.juju(&["add-space", name], subnets).map(|_| ())
    }

    fn set_space_subnets(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError> {
        self.juju(&["set-space-subnets", name], subnets).map(|_| ())
    }

    fn set_model_config(&self, assignment: &str) -> Result<(), RuntimeError> {
        let argv = vec![
            self.juju.clone(),
            "model-config".to_owned(),
            "--model".to_owned(),
            self.model.clone(),
            assignment.to_owned(),
        ];
        self.invoker.run(&argv, None).map(|_| ())
    }

    fn list_applications(&self) -> Result<BTreeSet<String>, RuntimeError> {
        let raw = self.juju(&["status", "--format", "json"], &[])?;
        let parsed: StatusOutput = serde_json::from_str(&raw)
            .map_err(|e| RuntimeError::UnexpectedOutput(format!("juju status: {e}")))?;
        Ok(parsed.applications.keys().cloned().collect())
    }

    fn set_application_config(
        &self,
        application: &str,
        assignment: &str,
        json_output: bool,
    ) -> Result<String, RuntimeError> {
        let mut args = vec!["config", application, assignment];
        if json_output {
            args.extend(["--format", "json"]);
        }
        self.juju(&args, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInvoker;

    fn fabric(invoker: &Arc<MockInvoker>) -> JujuFabric {
        JujuFabric::new(Arc::clone(invoker) as Arc<dyn CommandInvoker>, "openstack")
    }

    #[test]
    fn list_spaces_parses_names() {
        let invoker = Arc::new(MockInvoker::with_responses(vec![Ok(r#"{
            "spaces": [
                {"id": "0", "name": "alpha", "subnets": {}},
                {"id": "1", "name": "management", "subnets": {"10.0.0.0/24": {}}}
            ]
        }"#
        .to_owned())]));
        let spaces = fabric(&invoker).list_spaces().unwrap();
        assert!(spaces.contains("alpha"));
        assert!(spaces.contains("management"));
        assert_eq!(
            invoker.commands()[0],
            "juju spaces --format json --model openstack"
        );
    }

    #[test]
    fn list_spaces_rejects_garbage() {
        let invoker = Arc::new(MockInvoker::with_responses(vec![Ok("not json".to_owned())]));
        assert!(matches!(
            fabric(&invoker).list_spaces(),
            Err(RuntimeError::UnexpectedOutput(_))
        ));
    }

    #[test]
    fn space_mutations_put_model_last() {
        let invoker = Arc::new(MockInvoker::new());
        let f = fabric(&invoker);
        let subnets = vec!["10.0.0.0/24".to_owned(), "10.0.1.0/24".to_owned()];
        f.add_space("management", &subnets).unwrap();
        f.set_space_subnets("storage", &subnets[..1]).unwrap();
        assert_eq!(
            invoker.commands(),
            vec![
                "juju add-space management 10.0.0.0/24 10.0.1.0/24 --model openstack",
                "juju set-space-subnets storage 10.0.0.0/24 --model openstack",
            ]
        );
    }

    #[test]
    fn model_config_puts_model_first() {
        let invoker = Arc::new(MockInvoker::new());
        fabric(&invoker)
            .set_model_config("default-space=management")
            .unwrap();
        assert_eq!(
            invoker.commands(),
            vec!["juju model-config --model openstack default-space=management"]
        );
    }

    #[test]
    fn list_applications_reads_status_keys() {
        let invoker = Arc::new(MockInvoker::with_responses(vec![Ok(r#"{
            "model": {"name": "openstack"},
            "applications": {"traefik": {}, "keystone": {}}
        }"#
        .to_owned())]));
        let apps = fabric(&invoker).list_applications().unwrap();
        assert_eq!(apps.len(), 2);
        assert!(apps.contains("traefik"));
    }

    #[test]
    fn application_config_respects_output_mode() {
        let invoker = Arc::new(MockInvoker::new());
        let f = fabric(&invoker).with_binary("/snap/bin/juju");
        f.set_application_config("traefik", "k=v", false).unwrap();
        f.set_application_config("traefik", "k=v", true).unwrap();
        assert_eq!(
            invoker.commands(),
            vec![
                "/snap/bin/juju config traefik k=v --model openstack",
                "/snap/bin/juju config traefik k=v --format json --model openstack",
            ]
        );
    }
}

//! Recording test doubles for the backend traits.
//!
//! Each mock keeps a call log so tests can assert exactly which backend
//! operations a reconciler issued, and exposes toggles to inject failures.

use crate::command::{display_command, CommandInvoker};
use crate::fabric::FabricControl;
use crate::loadbalancer::{Resource, ResourceClient, ResourceClientProvider, ResourceKind};
use crate::RuntimeError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(command: String, output: &str) -> RuntimeError {
    RuntimeError::CommandFailed {
        command,
        status: Some(1),
        output: output.to_owned(),
    }
}

/// Invoker replaying scripted responses. Once the script is exhausted every
/// command succeeds with empty output.
#[derive(Default)]
pub struct MockInvoker {
    responses: Mutex<VecDeque<Result<String, RuntimeError>>>,
    calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<Result<String, RuntimeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::default(),
        }
    }

    /// Every command line issued so far, space-joined.
    pub fn commands(&self) -> Vec<String> {
        guard(&self.calls)
            .iter()
            .map(|(argv, _)| display_command(argv))
            .collect()
    }

    pub fn stdin_log(&self) -> Vec<Option<String>> {
        guard(&self.calls)
            .iter()
            .map(|(_, stdin)| stdin.clone())
            .collect()
    }
}

impl CommandInvoker for MockInvoker {
    fn run(&self, argv: &[String], stdin: Option<&str>) -> Result<String, RuntimeError> {
        guard(&self.calls).push((argv.to_vec(), stdin.map(str::to_owned)));
        guard(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricCall {
    ListSpaces,
    AddSpace {
        name: String,
        subnets: Vec<String>,
    },
    SetSpaceSubnets {
        name: String,
        subnets: Vec<String>,
    },
    SetModelConfig(String),
    ListApplications,
    SetApplicationConfig {
        application: String,
        assignment: String,
        json_output: bool,
    },
}

impl FabricCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListSpaces | Self::ListApplications)
    }
}

#[derive(Default)]
struct FabricState {
    spaces: BTreeMap<String, Vec<String>>,
    applications: BTreeSet<String>,
    calls: Vec<FabricCall>,
    reject_updates: bool,
    failing_adds: BTreeSet<String>,
    failing_app_config: BTreeSet<String>,
    fail_list_spaces: bool,
    fail_model_config: bool,
    fail_list_applications: bool,
}

/// In-memory fabric with a live space set and application list.
pub struct MockFabric {
    model: String,
    state: Mutex<FabricState>,
}

impl Default for MockFabric {
    fn default() -> Self {
        Self::new("openstack")
    }
}

impl MockFabric {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_owned(),
            state: Mutex::default(),
        }
    }

    #[must_use]
    pub fn with_space(self, name: &str, subnets: &[&str]) -> Self {
        guard(&self.state).spaces.insert(
            name.to_owned(),
            subnets.iter().map(|s| (*s).to_owned()).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_applications(self, applications: &[&str]) -> Self {
        guard(&self.state)
            .applications
            .extend(applications.iter().map(|a| (*a).to_owned()));
        self
    }

    /// Make `set_space_subnets` fail the way controllers without subnet
    /// reassignment do.
    #[must_use]
    pub fn rejecting_updates(self) -> Self {
        guard(&self.state).reject_updates = true;
        self
    }

    #[must_use]
    pub fn failing_add(self, name: &str) -> Self {
        guard(&self.state).failing_adds.insert(name.to_owned());
        self
    }

    #[must_use]
    pub fn failing_application_config(self, application: &str) -> Self {
        guard(&self.state)
            .failing_app_config
            .insert(application.to_owned());
        self
    }

    #[must_use]
    pub fn failing_list_spaces(self) -> Self {
        guard(&self.state).fail_list_spaces = true;
        self
    }

    #[must_use]
    pub fn failing_model_config(self) -> Self {
        guard(&self.state).fail_model_config = true;
        self
    }

    #[must_use]
    pub fn failing_list_applications(self) -> Self {
        guard(&self.state).fail_list_applications = true;
        self
    }

    pub fn calls(&self) -> Vec<FabricCall> {
        guard(&self.state).calls.clone()
    }

    pub fn mutations(&self) -> Vec<FabricCall> {
        self.calls()
            .into_iter()
            .filter(FabricCall::is_mutation)
            .collect()
    }

    pub fn clear_calls(&self) {
        guard(&self.state).calls.clear();
    }

    pub fn space_subnets(&self, name: &str) -> Option<Vec<String>> {
        guard(&self.state).spaces.get(name).cloned()
    }
}

impl FabricControl for MockFabric {
    fn scope(&self) -> &str {
        &self.model
    }

    fn list_spaces(&self) -> Result<BTreeSet<String>, RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(FabricCall::ListSpaces);
        if state.fail_list_spaces {
            return Err(rejected(
                "juju spaces".to_owned(),
                "ERROR cannot connect to controller",
            ));
        }
        Ok(state.spaces.keys().cloned().collect())
    }

    fn add_space(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(FabricCall::AddSpace {
            name: name.to_owned(),
            subnets: subnets.to_vec(),
        });
        if state.failing_adds.contains(name) {
            return Err(rejected(
                format!("juju add-space {name}"),
                "ERROR subnet already in use",
            ));
        }
        if state.spaces.contains_key(name) {
            return Err(rejected(
                format!("juju add-space {name}"),
                &format!("ERROR space \"{name}\" already exists"),
            ));
        }
        state.spaces.insert(name.to_owned(), subnets.to_vec());
        Ok(())
    }

    fn set_space_subnets(&self, name: &str, subnets: &[String]) -> Result<(), RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(FabricCall::SetSpaceSubnets {
            name: name.to_owned(),
            subnets: subnets.to_vec(),
        });
        if state.reject_updates {
            return Err(rejected(
                format!("juju set-space-subnets {name}"),
                "ERROR unrecognized command: juju set-space-subnets",
            ));
        }
        match state.spaces.get_mut(name) {
            Some(current) => {
                *current = subnets.to_vec();
                Ok(())
            }
            None => Err(rejected(
                format!("juju set-space-subnets {name}"),
                &format!("ERROR space \"{name}\" not found"),
            )),
        }
    }

    fn set_model_config(&self, assignment: &str) -> Result<(), RuntimeError> {
        let mut state = guard(&self.state);
        state
            .calls
            .push(FabricCall::SetModelConfig(assignment.to_owned()));
        if state.fail_model_config {
            return Err(rejected(
                "juju model-config".to_owned(),
                "ERROR permission denied",
            ));
        }
        Ok(())
    }

    fn list_applications(&self) -> Result<BTreeSet<String>, RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(FabricCall::ListApplications);
        if state.fail_list_applications {
            return Err(rejected(
                "juju status".to_owned(),
                "ERROR cannot connect to controller",
            ));
        }
        Ok(state.applications.clone())
    }

    fn set_application_config(
        &self,
        application: &str,
        assignment: &str,
        json_output: bool,
    ) -> Result<String, RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(FabricCall::SetApplicationConfig {
            application: application.to_owned(),
            assignment: assignment.to_owned(),
            json_output,
        });
        if state.failing_app_config.contains(application)
            || !state.applications.contains(application)
        {
            return Err(rejected(
                format!("juju config {application}"),
                &format!("ERROR application \"{application}\" not found"),
            ));
        }
        Ok(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LbCall {
    Connect,
    Create { kind: ResourceKind, name: String },
    Replace { kind: ResourceKind, name: String },
}

#[derive(Default)]
struct LbState {
    resources: BTreeMap<(String, String), Resource>,
    calls: Vec<LbCall>,
    unavailable: bool,
    fail_create: bool,
    failing_replace: BTreeSet<String>,
}

/// In-memory load-balancer API. Clones share state, so the same value
/// serves as both the provider and the clients it hands out.
#[derive(Clone, Default)]
pub struct MockLoadBalancer {
    state: Arc<Mutex<LbState>>,
}

fn resource_key(kind: ResourceKind, namespace: &str, name: &str) -> (String, String) {
    (kind.kind().to_owned(), format!("{namespace}/{name}"))
}

impl MockLoadBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail.
    #[must_use]
    pub fn unavailable(self) -> Self {
        guard(&self.state).unavailable = true;
        self
    }

    /// Make every `create` fail.
    #[must_use]
    pub fn failing_create(self) -> Self {
        guard(&self.state).fail_create = true;
        self
    }

    #[must_use]
    pub fn failing_replace(self, name: &str) -> Self {
        guard(&self.state).failing_replace.insert(name.to_owned());
        self
    }

    #[must_use]
    pub fn with_resource(self, resource: Resource) -> Self {
        guard(&self.state).resources.insert(
            resource_key(resource.kind, &resource.namespace, &resource.name),
            resource,
        );
        self
    }

    pub fn calls(&self) -> Vec<LbCall> {
        guard(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        guard(&self.state).calls.clear();
    }

    pub fn connects(&self) -> usize {
        guard(&self.state)
            .calls
            .iter()
            .filter(|c| **c == LbCall::Connect)
            .count()
    }

    pub fn resource(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<Resource> {
        guard(&self.state)
            .resources
            .get(&resource_key(kind, namespace, name))
            .cloned()
    }

    pub fn resource_count(&self) -> usize {
        guard(&self.state).resources.len()
    }
}

impl ResourceClientProvider for MockLoadBalancer {
    fn connect(&self) -> Result<Box<dyn ResourceClient>, RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(LbCall::Connect);
        if state.unavailable {
            return Err(RuntimeError::BackendUnavailable(
                "load-balancer API".to_owned(),
            ));
        }
        Ok(Box::new(self.clone()))
    }
}

impl ResourceClient for MockLoadBalancer {
    fn create(&self, resource: &Resource) -> Result<(), RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(LbCall::Create {
            kind: resource.kind,
            name: resource.name.clone(),
        });
        if state.fail_create {
            return Err(RuntimeError::Api(format!(
                "create {} {} rejected",
                resource.kind, resource.name
            )));
        }
        let key = resource_key(resource.kind, &resource.namespace, &resource.name);
        if state.resources.contains_key(&key) {
            return Err(RuntimeError::Api(format!(
                "{} \"{}\" already exists",
                resource.kind, resource.name
            )));
        }
        state.resources.insert(key, resource.clone());
        Ok(())
    }

    fn replace(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        resource: &Resource,
    ) -> Result<(), RuntimeError> {
        let mut state = guard(&self.state);
        state.calls.push(LbCall::Replace {
            kind,
            name: name.to_owned(),
        });
        if state.failing_replace.contains(name) {
            return Err(RuntimeError::Api(format!(
                "replace {kind} {name} rejected"
            )));
        }
        let key = resource_key(kind, namespace, name);
        if !state.resources.contains_key(&key) {
            return Err(RuntimeError::Api(format!("{kind} \"{name}\" not found")));
        }
        state.resources.insert(key, resource.clone());
        Ok(())
    }
}

use crate::step::{one_line, Applicability, MutationOutcome, Step, StepOutcome};
use netfence_runtime::{
    FabricControl, Resource, ResourceClient, ResourceClientProvider, ResourceKind,
    RuntimeError,
};
use netfence_schema::{
    parse_address_list, ApplicationName, IsolationConfig, IsolationNames, PoolRanges, PoolRole,
    ResolvedRanges,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Ensures one address pool and advertisement per resolved range, then points
/// the front-end services at their pools through application configuration.
///
/// Any failure aborts the remaining work. Nothing already applied is rolled
/// back.
pub struct PoolReconciler {
    enabled: bool,
    ranges: PoolRanges,
    names: IsolationNames,
    provider: Arc<dyn ResourceClientProvider>,
    fabric: Arc<dyn FabricControl>,
    client: Option<Box<dyn ResourceClient>>,
    outcomes: Vec<(ResourceKind, String, MutationOutcome)>,
    annotated: Vec<ApplicationName>,
}

impl PoolReconciler {
    pub fn new(
        config: &IsolationConfig,
        names: IsolationNames,
        provider: Arc<dyn ResourceClientProvider>,
        fabric: Arc<dyn FabricControl>,
    ) -> Self {
        Self {
            enabled: config.enabled,
            ranges: config.pool_ranges.clone(),
            names,
            provider,
            fabric,
            client: None,
            outcomes: Vec::new(),
            annotated: Vec::new(),
        }
    }

    pub fn resolved_ranges(&self) -> ResolvedRanges {
        self.ranges.resolve(self.enabled)
    }

    /// Resources touched by the last `apply`, in order.
    pub fn outcomes(&self) -> &[(ResourceKind, String, MutationOutcome)] {
        &self.outcomes
    }

    /// Applications annotated by the last `apply`.
    pub fn annotated(&self) -> &[ApplicationName] {
        &self.annotated
    }

    fn connect(&mut self) -> Result<(), RuntimeError> {
        if self.client.is_none() {
            self.client = Some(self.provider.connect()?);
        }
        Ok(())
    }

    fn ensure_pools(&mut self, client: &dyn ResourceClient) -> Result<(), String> {
        let ranges = self.resolved_ranges();
        for (role, range) in ranges.iter() {
            let pool_name = self.names.pool(role).to_string();
            let pool = Resource::ip_address_pool(
                &pool_name,
                &self.names.namespace,
                &parse_address_list(range),
            );
            self.record(client, &pool)?;

            let advertisement = Resource::l2_advertisement(
                self.names.advertisement(role).as_str(),
                &self.names.namespace,
                &pool_name,
            );
            self.record(client, &advertisement)?;
            info!("{role} pool {pool_name} applied with {range}");
        }
        Ok(())
    }

    fn record(&mut self, client: &dyn ResourceClient, resource: &Resource) -> Result<(), String> {
        let outcome = create_or_replace(client, resource);
        self.outcomes
            .push((resource.kind, resource.name.clone(), outcome.clone()));
        match outcome {
            MutationOutcome::Failed(reason) => Err(reason),
            _ => Ok(()),
        }
    }

    fn annotate_services(&mut self) -> Result<(), String> {
        let present = self
            .fabric
            .list_applications()
            .map_err(|e| format!("unable to list applications: {e}"))?;

        for target in &self.names.services {
            if !present.contains(target.application.as_str()) {
                debug!("{} not deployed, not annotating", target.application);
                continue;
            }
            let assignment = annotation_assignment(&self.names, target.role);
            self.fabric
                .set_application_config(target.application.as_str(), &assignment, false)
                .map_err(|e| format!("failed to annotate {}: {e}", target.application))?;
            debug!("{}: {assignment}", target.application);
            self.annotated.push(target.application.clone());
        }
        Ok(())
    }
}

/// `<config key>=<json object>` selecting the pool for a role.
fn annotation_assignment(names: &IsolationNames, role: PoolRole) -> String {
    let mut annotations = serde_json::Map::new();
    annotations.insert(
        names.annotation_key.clone(),
        serde_json::Value::String(names.pool(role).to_string()),
    );
    format!(
        "{}={}",
        names.annotation_config_key,
        serde_json::Value::Object(annotations)
    )
}

/// Optimistic create, falling back to replace when the create is rejected.
fn create_or_replace(client: &dyn ResourceClient, resource: &Resource) -> MutationOutcome {
    let create_err = match client.create(resource) {
        Ok(()) => return MutationOutcome::Created,
        Err(e) => e,
    };
    debug!(
        "create {} {} rejected ({create_err}), replacing",
        resource.kind, resource.name
    );
    match client.replace(resource.kind, &resource.name, &resource.namespace, resource) {
        Ok(()) => MutationOutcome::Updated,
        Err(replace_err) => MutationOutcome::Failed(format!(
            "Failed to apply {} {}: {replace_err} (create failed: {create_err})",
            resource.kind, resource.name
        )),
    }
}

impl Step for PoolReconciler {
    fn name(&self) -> &str {
        "pools"
    }

    fn description(&self) -> &str {
        "Applying load-balancer pools and service annotations"
    }

    fn is_applicable(&mut self) -> Applicability {
        if self.resolved_ranges().is_empty() {
            let reason = if self.enabled {
                "no load-balancer ranges specified"
            } else {
                "network isolation disabled"
            };
            return Applicability::Skipped(reason.to_owned());
        }
        match self.connect() {
            Ok(()) => Applicability::Ready,
            Err(e) => Applicability::Failed(one_line(e)),
        }
    }

    fn apply(&mut self) -> StepOutcome {
        self.outcomes.clear();
        self.annotated.clear();

        if self.resolved_ranges().is_empty() {
            debug!("no load-balancer ranges resolved, nothing to apply");
            return StepOutcome::Completed;
        }
        if let Err(e) = self.connect() {
            return StepOutcome::Failed(one_line(e));
        }
        let Some(client) = self.client.take() else {
            return StepOutcome::Failed("load-balancer client unavailable".to_owned());
        };

        let result = self
            .ensure_pools(client.as_ref())
            .and_then(|()| self.annotate_services());
        self.client = Some(client);

        match result {
            Ok(()) => StepOutcome::Completed,
            Err(reason) => {
                debug!("pool reconciliation failed: {reason}");
                StepOutcome::Failed(one_line(reason))
            }
        }
    }
}

use crate::step::{one_line, Applicability, MutationOutcome, Step, StepOutcome};
use netfence_runtime::FabricControl;
use netfence_schema::{IsolationConfig, NamedSpace, SpaceName};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives the fabric's network spaces to the configured subnets.
///
/// Absent spaces are created; a failed create fails the step. Present spaces
/// get their subnets reassigned, and a controller that rejects the
/// reassignment is tolerated. The model's default space is set last, best
/// effort.
pub struct SpaceReconciler {
    enabled: bool,
    spaces: Vec<NamedSpace>,
    default_space: SpaceName,
    fabric: Arc<dyn FabricControl>,
    outcomes: Vec<(SpaceName, MutationOutcome)>,
    default_space_outcome: Option<MutationOutcome>,
}

impl SpaceReconciler {
    pub fn new(
        config: &IsolationConfig,
        fabric: Arc<dyn FabricControl>,
        default_space: SpaceName,
    ) -> Self {
        Self {
            enabled: config.enabled,
            spaces: config.spaces.clone(),
            default_space,
            fabric,
            outcomes: Vec::new(),
            default_space_outcome: None,
        }
    }

    /// Per-space results of the last `apply`, in configuration order.
    pub fn outcomes(&self) -> &[(SpaceName, MutationOutcome)] {
        &self.outcomes
    }

    pub fn default_space_outcome(&self) -> Option<&MutationOutcome> {
        self.default_space_outcome.as_ref()
    }

    fn ensure_space(&self, live: &BTreeSet<String>, space: &NamedSpace) -> MutationOutcome {
        let name = space.name.as_str();
        let subnets = &space.spec.subnets;

        if live.contains(name) {
            match self.fabric.set_space_subnets(name, subnets) {
                Ok(()) => {
                    debug!("space {name}: subnets set to {subnets:?}");
                    MutationOutcome::Updated
                }
                Err(e) => {
                    warn!("space {name}: subnet update not applied: {e}");
                    MutationOutcome::UpdateUnsupported(one_line(e))
                }
            }
        } else {
            match self.fabric.add_space(name, subnets) {
                Ok(()) => {
                    info!("space {name}: created with {subnets:?}");
                    MutationOutcome::Created
                }
                Err(e) => MutationOutcome::Failed(one_line(e)),
            }
        }
    }

    fn set_default_space(&self) -> MutationOutcome {
        let assignment = format!("default-space={}", self.default_space);
        match self.fabric.set_model_config(&assignment) {
            Ok(()) => MutationOutcome::Updated,
            Err(e) => {
                warn!(
                    "could not set default space on model {}: {e}",
                    self.fabric.scope()
                );
                MutationOutcome::Failed(one_line(e))
            }
        }
    }
}

impl Step for SpaceReconciler {
    fn name(&self) -> &str {
        "spaces"
    }

    fn description(&self) -> &str {
        "Reconciling network spaces"
    }

    fn is_applicable(&mut self) -> Applicability {
        if !self.enabled {
            return Applicability::Skipped("network isolation disabled".to_owned());
        }
        if self.spaces.is_empty() {
            return Applicability::Skipped("no spaces specified".to_owned());
        }
        Applicability::Ready
    }

    fn apply(&mut self) -> StepOutcome {
        self.outcomes.clear();
        self.default_space_outcome = None;

        let live = match self.fabric.list_spaces() {
            Ok(live) => live,
            Err(e) => {
                return StepOutcome::Failed(one_line(format!(
                    "unable to read model spaces: {e}"
                )))
            }
        };
        debug!("model {} has spaces {live:?}", self.fabric.scope());

        for space in &self.spaces {
            if space.spec.subnets.is_empty() {
                debug!("space {}: no subnets configured, skipping", space.name);
                continue;
            }
            let outcome = self.ensure_space(&live, space);
            if let MutationOutcome::Failed(reason) = &outcome {
                return StepOutcome::Failed(format!(
                    "failed to ensure space {}: {reason}",
                    space.name
                ));
            }
            self.outcomes.push((space.name.clone(), outcome));
        }

        self.default_space_outcome = Some(self.set_default_space());
        StepOutcome::Completed
    }
}

use crate::import::{ConfigImporter, Console};
use crate::pools::PoolReconciler;
use crate::spaces::SpaceReconciler;
use crate::step::Step;
use crate::CoreError;
use netfence_runtime::{
    CommandInvoker, FabricControl, JujuFabric, KubectlProvider, ResourceClientProvider,
};
use netfence_schema::{
    set_pool_ranges, IsolationConfig, PoolRanges, Settings, ADDONS_KEY, ISOLATION_KEY,
};
use netfence_store::{AnswerStore, Answers};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Which reconcilers a plan contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepSelection {
    #[default]
    All,
    Spaces,
    Pools,
}

/// Assembles reconciliation plans from the answer store and operator settings.
///
/// Holds no reconciliation state of its own: the configuration is reloaded
/// from the store every time a plan is built.
pub struct Engine {
    store: Arc<dyn AnswerStore>,
    settings: Settings,
}

impl Engine {
    pub fn new(store: Arc<dyn AnswerStore>, settings: Settings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn AnswerStore {
        self.store.as_ref()
    }

    pub fn load_config(&self) -> Result<IsolationConfig, CoreError> {
        let isolation = self.store.load(ISOLATION_KEY)?;
        let addons = self.store.load(ADDONS_KEY)?;
        let config = IsolationConfig::from_answers(&isolation, &addons)?;
        debug!(
            "loaded isolation config: enabled={} spaces={}",
            config.enabled,
            config.spaces.len()
        );
        Ok(config)
    }

    /// Import the isolation document at `path`, or at the configured path.
    pub fn import(
        &self,
        path: Option<&Path>,
        console: &dyn Console,
    ) -> Result<Answers, CoreError> {
        let path = path.unwrap_or(self.settings.import.path.as_path());
        ConfigImporter::new(path, self.store.as_ref()).import(console)
    }

    /// Store load-balancer ranges, keeping the other add-on variables.
    pub fn set_ranges(&self, ranges: &PoolRanges) -> Result<(), CoreError> {
        let mut addons = self.store.load(ADDONS_KEY)?;
        set_pool_ranges(&mut addons, ranges);
        self.store.save(ADDONS_KEY, &addons)?;
        info!("stored load-balancer ranges in '{ADDONS_KEY}'");
        Ok(())
    }

    /// Spaces then pools.
    pub fn standard_plan(
        &self,
        fabric: Arc<dyn FabricControl>,
        provider: Arc<dyn ResourceClientProvider>,
    ) -> Result<Vec<Box<dyn Step>>, CoreError> {
        self.plan(StepSelection::All, fabric, provider)
    }

    pub fn plan(
        &self,
        selection: StepSelection,
        fabric: Arc<dyn FabricControl>,
        provider: Arc<dyn ResourceClientProvider>,
    ) -> Result<Vec<Box<dyn Step>>, CoreError> {
        let config = self.load_config()?;
        let names = &self.settings.names;
        let mut steps: Vec<Box<dyn Step>> = Vec::with_capacity(2);

        if matches!(selection, StepSelection::All | StepSelection::Spaces) {
            steps.push(Box::new(SpaceReconciler::new(
                &config,
                Arc::clone(&fabric),
                names.default_space.clone(),
            )));
        }
        if matches!(selection, StepSelection::All | StepSelection::Pools) {
            steps.push(Box::new(PoolReconciler::new(
                &config,
                names.clone(),
                provider,
                fabric,
            )));
        }
        Ok(steps)
    }

    /// Backends that drive the real `juju` and `kubectl` binaries.
    pub fn production_backends(
        &self,
        invoker: Arc<dyn CommandInvoker>,
    ) -> (Arc<dyn FabricControl>, Arc<dyn ResourceClientProvider>) {
        let fabric = JujuFabric::new(Arc::clone(&invoker), &self.settings.fabric.model)
            .with_binary(&self.settings.fabric.juju);
        let provider = KubectlProvider::new(
            invoker,
            &self.settings.loadbalancer.kubectl,
            self.settings.loadbalancer.kubeconfig.clone(),
        );
        (Arc::new(fabric), Arc::new(provider))
    }
}

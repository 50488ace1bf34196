//! Reconciliation core for netfence.
//!
//! This crate ties the isolation configuration read from the answer store to
//! the fabric and load-balancer backends: the `Step` contract, the space and
//! pool reconcilers, the one-shot `ConfigImporter`, the plan runner that
//! executes steps in order, and the `Engine` that assembles them.

pub mod engine;
pub mod import;
pub mod plan;
pub mod pools;
pub mod spaces;
pub mod step;

pub use engine::{Engine, StepSelection};
pub use import::{ConfigImporter, Console};
pub use plan::{evaluate_plan, run_plan, run_plan_with, PlanReport, StepReport, StepStatus};
pub use pools::PoolReconciler;
pub use spaces::SpaceReconciler;
pub use step::{Applicability, MutationOutcome, Step, StepOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Schema(#[from] netfence_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] netfence_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] netfence_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

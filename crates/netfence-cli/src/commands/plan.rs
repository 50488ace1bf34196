use super::{print_report, EXIT_FAILURE, EXIT_SUCCESS};
use netfence_core::{evaluate_plan, Engine, StepSelection};
use netfence_runtime::SubprocessInvoker;
use std::sync::Arc;

pub fn run(engine: &Engine, selection: StepSelection, json: bool) -> Result<u8, String> {
    let (fabric, provider) = engine.production_backends(Arc::new(SubprocessInvoker::new()));
    let mut steps = engine
        .plan(selection, fabric, provider)
        .map_err(|e| e.to_string())?;

    let report = evaluate_plan(&mut steps);
    if !json {
        println!("plan for model {}:", engine.settings().fabric.model);
    }
    print_report(&report, json)?;

    Ok(if report.succeeded() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

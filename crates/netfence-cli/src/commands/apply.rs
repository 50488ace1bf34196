use super::{print_report, spin_fail, spin_ok, spinner, TermConsole, EXIT_FAILURE, EXIT_SUCCESS};
use netfence_core::{run_plan, run_plan_with, Engine, StepSelection};
use netfence_runtime::SubprocessInvoker;
use std::sync::Arc;

pub fn run(
    engine: &Engine,
    selection: StepSelection,
    import: bool,
    json: bool,
) -> Result<u8, String> {
    if import {
        engine
            .import(None, &TermConsole::new(json))
            .map_err(|e| e.to_string())?;
    }

    let (fabric, provider) = engine.production_backends(Arc::new(SubprocessInvoker::new()));
    let mut steps = engine
        .plan(selection, fabric, provider)
        .map_err(|e| e.to_string())?;

    let report = if json {
        run_plan(&mut steps)
    } else {
        let pb = spinner("Reconciling network isolation...");
        let report = run_plan_with(&mut steps, |step| {
            pb.set_message(step.description().to_owned());
        });
        match report.failure() {
            None => spin_ok(&pb, "Network isolation reconciled"),
            Some(failed) => spin_fail(&pb, &format!("Step '{}' failed", failed.name)),
        }
        report
    };
    print_report(&report, json)?;

    Ok(if report.succeeded() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

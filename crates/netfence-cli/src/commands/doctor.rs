use super::{EXIT_FAILURE, EXIT_SUCCESS};
use netfence_core::Engine;
use netfence_store::{verify_store_integrity, StoreLayout, StoreLock};
use std::path::Path;

pub fn run(engine: &Engine, store_path: &Path, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_prereqs(engine, &mut checks, &mut all_pass);

    let layout = StoreLayout::new(store_path);
    if layout.is_initialized() {
        checks.push(Check::pass("store_exists", "Answer store exists"));
        check_store(&layout, &mut checks, &mut all_pass);
    } else {
        checks.push(Check::info(
            "store_exists",
            "Answer store not initialized (will be created on first import)",
        ));
    }

    check_config(engine, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_prereqs(engine: &Engine, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let settings = engine.settings();
    let missing =
        netfence_runtime::check_prereqs(&settings.fabric.juju, &settings.loadbalancer.kubectl);
    if missing.is_empty() {
        checks.push(Check::pass("prereqs", "juju and kubectl found"));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "prereqs",
            &format!(
                "Missing prerequisites: {}",
                netfence_runtime::format_missing(&missing)
            ),
        ));
    }

    if let Some(ref kubeconfig) = settings.loadbalancer.kubeconfig {
        if kubeconfig.is_file() {
            checks.push(Check::pass(
                "kubeconfig",
                &format!("kubeconfig {} exists", kubeconfig.display()),
            ));
        } else {
            *all_pass = false;
            checks.push(Check::fail(
                "kubeconfig",
                &format!("kubeconfig {} not found", kubeconfig.display()),
            ));
        }
    }
}

fn check_store(layout: &StoreLayout, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match layout.verify_version() {
        Ok(()) => checks.push(Check::pass("store_version", "Store format version valid")),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "store_version",
                &format!("Store version check failed: {e}"),
            ));
        }
    }

    match verify_store_integrity(layout) {
        Ok(report) if report.failed.is_empty() => {
            checks.push(Check::pass(
                "store_integrity",
                &format!("Answer integrity OK ({} buckets checked)", report.checked),
            ));
        }
        Ok(report) => {
            *all_pass = false;
            let detail = report
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.key, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            checks.push(Check::fail(
                "store_integrity",
                &format!(
                    "{} of {} buckets corrupted ({detail})",
                    report.failed.len(),
                    report.checked
                ),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "store_integrity",
                &format!("Integrity check failed: {e}"),
            ));
        }
    }

    match StoreLock::try_acquire(&layout.lock_file()) {
        Ok(Some(_)) => checks.push(Check::pass("store_lock", "Store lock is free")),
        Ok(None) => checks.push(Check::warn(
            "store_lock",
            "Store lock is held by another process",
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "store_lock",
                &format!("Cannot check store lock: {e}"),
            ));
        }
    }
}

fn check_config(engine: &Engine, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match engine.load_config() {
        Ok(config) => {
            let state = if config.enabled { "enabled" } else { "disabled" };
            checks.push(Check::info(
                "isolation",
                &format!(
                    "Isolation {state}: {} spaces, pools {}",
                    config.spaces.len(),
                    if config.resolved_ranges().is_empty() {
                        "not configured"
                    } else {
                        "configured"
                    }
                ),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "isolation",
                &format!("Stored answers are invalid: {e}"),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("netfence doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}

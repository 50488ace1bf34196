pub mod apply;
pub mod completions;
pub mod doctor;
pub mod import;
pub mod man_pages;
pub mod plan;
pub mod ranges;
pub mod show;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use netfence_core::{Console, PlanReport, StepStatus};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish_spinner(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish_spinner(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish_spinner(pb, format!("✗ {msg}"));
}

pub fn colorize_status(status: StepStatus) -> String {
    let label = status.to_string();
    match status {
        StepStatus::Completed => Style::new().green().apply_to(label).to_string(),
        StepStatus::Ready => Style::new().cyan().bold().apply_to(label).to_string(),
        StepStatus::Skipped => Style::new().dim().apply_to(label).to_string(),
        StepStatus::Failed => Style::new().red().bold().apply_to(label).to_string(),
    }
}

pub fn print_report(report: &PlanReport, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(());
    }
    for step in &report.steps {
        match step.message {
            Some(ref message) => println!(
                "  {:<8} {} ({message})",
                step.name,
                colorize_status(step.status)
            ),
            None => println!("  {:<8} {}", step.name, colorize_status(step.status)),
        }
    }
    Ok(())
}

/// Terminal console. In JSON mode every message goes to stderr so stdout
/// stays machine-readable.
pub struct TermConsole {
    json: bool,
}

impl TermConsole {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit(&self, line: &str) {
        if self.json {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

impl Console for TermConsole {
    fn success(&self, message: &str) {
        self.emit(&Style::new().green().apply_to(message).to_string());
    }

    fn error(&self, message: &str) {
        eprintln!("{}", Style::new().red().apply_to(message));
    }

    fn info(&self, message: &str) {
        self.emit(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netfence_core::StepReport;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_status_keeps_label() {
        for status in [
            StepStatus::Ready,
            StepStatus::Skipped,
            StepStatus::Completed,
            StepStatus::Failed,
        ] {
            assert!(colorize_status(status).contains(&status.to_string()));
        }
    }

    #[test]
    fn print_report_handles_messages() {
        let report = PlanReport {
            steps: vec![
                StepReport {
                    name: "spaces".to_owned(),
                    status: StepStatus::Skipped,
                    message: Some("network isolation disabled".to_owned()),
                },
                StepReport {
                    name: "pools".to_owned(),
                    status: StepStatus::Completed,
                    message: None,
                },
            ],
            started_at: "t0".to_owned(),
            finished_at: "t1".to_owned(),
        };
        assert!(print_report(&report, false).is_ok());
        assert!(print_report(&report, true).is_ok());
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
        assert_ne!(EXIT_CONFIG_ERROR, EXIT_STORE_ERROR);
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}

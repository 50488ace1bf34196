use crate::step::{Applicability, Step, StepOutcome};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Applicable but not run (dry-run evaluation only).
    Ready,
    Skipped,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Skipped => "skipped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub steps: Vec<StepReport>,
    pub started_at: String,
    pub finished_at: String,
}

impl PlanReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.status != StepStatus::Failed)
    }

    pub fn failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

fn report(step: &dyn Step, status: StepStatus, message: Option<String>) -> StepReport {
    StepReport {
        name: step.name().to_owned(),
        status,
        message,
    }
}

/// Run each step in order, stopping at the first failure.
pub fn run_plan(steps: &mut [Box<dyn Step>]) -> PlanReport {
    run_plan_with(steps, |_| {})
}

/// Like [`run_plan`], calling `on_apply` right before each step's `apply`.
pub fn run_plan_with(
    steps: &mut [Box<dyn Step>],
    mut on_apply: impl FnMut(&dyn Step),
) -> PlanReport {
    let started_at = chrono::Utc::now().to_rfc3339();
    let mut reports = Vec::with_capacity(steps.len());

    for step in steps.iter_mut() {
        let step = step.as_mut();
        match step.is_applicable() {
            Applicability::Skipped(reason) => {
                info!("{}: skipped ({reason})", step.name());
                reports.push(report(step, StepStatus::Skipped, Some(reason)));
            }
            Applicability::Failed(reason) => {
                warn!("{}: not applicable: {reason}", step.name());
                reports.push(report(step, StepStatus::Failed, Some(reason)));
                break;
            }
            Applicability::Ready => {
                info!("{}", step.description());
                on_apply(step);
                match step.apply() {
                    StepOutcome::Completed => {
                        reports.push(report(step, StepStatus::Completed, None));
                    }
                    StepOutcome::Failed(reason) => {
                        warn!("{}: failed: {reason}", step.name());
                        reports.push(report(step, StepStatus::Failed, Some(reason)));
                        break;
                    }
                }
            }
        }
    }

    PlanReport {
        steps: reports,
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Evaluate applicability only. No step is applied, and evaluation does not
/// stop at a failed check.
pub fn evaluate_plan(steps: &mut [Box<dyn Step>]) -> PlanReport {
    let started_at = chrono::Utc::now().to_rfc3339();
    let reports = steps
        .iter_mut()
        .map(|step| {
            let step = step.as_mut();
            match step.is_applicable() {
                Applicability::Ready => report(step, StepStatus::Ready, None),
                Applicability::Skipped(reason) => report(step, StepStatus::Skipped, Some(reason)),
                Applicability::Failed(reason) => report(step, StepStatus::Failed, Some(reason)),
            }
        })
        .collect();

    PlanReport {
        steps: reports,
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Scripted {
        name: &'static str,
        check: Applicability,
        outcome: StepOutcome,
        applied: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Step for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "scripted"
        }
        fn is_applicable(&mut self) -> Applicability {
            self.check.clone()
        }
        fn apply(&mut self) -> StepOutcome {
            self.applied.lock().unwrap().push(self.name);
            self.outcome.clone()
        }
    }

    fn plan(
        specs: Vec<(&'static str, Applicability, StepOutcome)>,
    ) -> (Vec<Box<dyn Step>>, Arc<Mutex<Vec<&'static str>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let steps = specs
            .into_iter()
            .map(|(name, check, outcome)| {
                Box::new(Scripted {
                    name,
                    check,
                    outcome,
                    applied: Arc::clone(&applied),
                }) as Box<dyn Step>
            })
            .collect();
        (steps, applied)
    }

    #[test]
    fn skipped_steps_do_not_stop_plan() {
        let (mut steps, applied) = plan(vec![
            ("a", Applicability::Skipped("off".to_owned()), StepOutcome::Completed),
            ("b", Applicability::Ready, StepOutcome::Completed),
        ]);
        let report = run_plan(&mut steps);
        assert!(report.succeeded());
        assert_eq!(report.steps[0].status, StepStatus::Skipped);
        assert_eq!(report.steps[0].message.as_deref(), Some("off"));
        assert_eq!(report.steps[1].status, StepStatus::Completed);
        assert_eq!(*applied.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn failed_apply_stops_plan() {
        let (mut steps, applied) = plan(vec![
            ("a", Applicability::Ready, StepOutcome::Failed("boom".to_owned())),
            ("b", Applicability::Ready, StepOutcome::Completed),
        ]);
        let report = run_plan(&mut steps);
        assert!(!report.succeeded());
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.failure().map(|s| s.name.as_str()), Some("a"));
        assert_eq!(*applied.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn failed_check_stops_plan_without_apply() {
        let (mut steps, applied) = plan(vec![
            ("a", Applicability::Failed("no api".to_owned()), StepOutcome::Completed),
            ("b", Applicability::Ready, StepOutcome::Completed),
        ]);
        let report = run_plan(&mut steps);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].status, StepStatus::Failed);
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn evaluate_never_applies() {
        let (mut steps, applied) = plan(vec![
            ("a", Applicability::Failed("no api".to_owned()), StepOutcome::Completed),
            ("b", Applicability::Ready, StepOutcome::Completed),
        ]);
        let report = evaluate_plan(&mut steps);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].status, StepStatus::Ready);
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn on_apply_sees_each_applied_step() {
        let (mut steps, _) = plan(vec![
            ("a", Applicability::Ready, StepOutcome::Completed),
            ("b", Applicability::Skipped("off".to_owned()), StepOutcome::Completed),
            ("c", Applicability::Ready, StepOutcome::Completed),
        ]);
        let mut seen = Vec::new();
        run_plan_with(&mut steps, |step| seen.push(step.name().to_owned()));
        assert_eq!(seen, vec!["a", "c"]);
    }

    #[test]
    fn report_serializes_lowercase_status() {
        let report = PlanReport {
            steps: vec![StepReport {
                name: "spaces".to_owned(),
                status: StepStatus::Completed,
                message: None,
            }],
            started_at: "t0".to_owned(),
            finished_at: "t1".to_owned(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["status"], "completed");
        assert!(json["steps"][0].get("message").is_none());
    }
}

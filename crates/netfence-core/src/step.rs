use std::fmt;

/// Result of the side-effect-free applicability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    Ready,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Failed(String),
}

/// What a single backend mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Created,
    Updated,
    /// The backend refused the update; the existing object was left as is.
    UpdateUnsupported(String),
    Failed(String),
}

impl MutationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for MutationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::UpdateUnsupported(reason) => write!(f, "update unsupported: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A named, idempotent unit of reconciliation work.
///
/// `is_applicable` must not mutate any backend; it may only establish the
/// handles `apply` needs. Neither method panics or returns errors: every
/// failure is folded into a `Failed` message.
pub trait Step {
    fn name(&self) -> &str;

    /// Human-readable progress line.
    fn description(&self) -> &str;

    fn is_applicable(&mut self) -> Applicability;

    fn apply(&mut self) -> StepOutcome;
}

/// Collapse a multi-line diagnostic into one line.
pub(crate) fn one_line(message: impl fmt::Display) -> String {
    message
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

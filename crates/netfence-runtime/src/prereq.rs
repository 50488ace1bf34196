use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that the fabric and load-balancer CLIs are installed.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_prereqs(juju: &str, kubectl: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists(juju) {
        missing.push(MissingPrereq {
            name: juju.to_owned(),
            purpose: "network space and application configuration",
            install_hint: "snap install juju",
        });
    }

    if !command_exists(kubectl) {
        missing.push(MissingPrereq {
            name: kubectl.to_owned(),
            purpose: "MetalLB address pools and advertisements",
            install_hint: "snap install kubectl --classic",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nnetfence drives these tools to reconcile network isolation.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "juju".to_owned(),
            purpose: "spaces",
            install_hint: "snap install juju",
        };
        let s = format!("{m}");
        assert!(s.contains("juju"));
        assert!(s.contains("spaces"));
        assert!(s.contains("snap install juju"));
    }

    #[test]
    fn absent_binaries_are_reported() {
        let missing = check_prereqs("/nonexistent/juju", "netfence-no-such-kubectl");
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].name, "/nonexistent/juju");
        assert_eq!(missing[1].name, "netfence-no-such-kubectl");
    }

    #[test]
    fn explicit_path_counts_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let juju = dir.path().join("juju");
        std::fs::write(&juju, "#!/bin/sh\n").unwrap();
        let missing = check_prereqs(juju.to_str().unwrap(), "netfence-no-such-kubectl");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "netfence-no-such-kubectl");
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let output = format_missing(&check_prereqs("/nonexistent/juju", "/nonexistent/kubectl"));
        assert!(output.starts_with("missing prerequisites:"));
        assert!(output.contains("/nonexistent/juju"));
        assert!(output.contains("/nonexistent/kubectl"));
    }
}

// Lifecycle models
// Process states and the per-step teardown report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the protected environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing snapshotted yet
    Idle,
    /// Snapshot attempted, sessions may run
    Protected,
    /// Teardown sequence in progress
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Protected => "protected",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single teardown step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok(String),
    Failed(String),
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Ok(detail) | StepOutcome::Failed(detail) => detail,
        }
    }
}

impl<E: fmt::Display> From<Result<String, E>> for StepOutcome {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(detail) => StepOutcome::Ok(detail),
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

/// Aggregate result of quit, restore and purge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub quit: StepOutcome,
    pub restore: StepOutcome,
    pub purge: StepOutcome,
}

impl ShutdownReport {
    pub fn is_success(&self) -> bool {
        self.quit.is_ok() && self.restore.is_ok() && self.purge.is_ok()
    }

    /// Steps that failed, by name
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        [
            ("quit", &self.quit),
            ("restore", &self.restore),
            ("purge", &self.purge),
        ]
        .into_iter()
        .filter(|(_, outcome)| !outcome.is_ok())
        .map(|(name, outcome)| (name, outcome.detail()))
        .collect()
    }

    /// One-line status for callers
    pub fn summary(&self) -> String {
        if self.is_success() {
            return "Environment reset complete: Charles quit requested, configuration restored, capture cache purged.".to_string();
        }
        let failed = self
            .failures()
            .into_iter()
            .map(|(name, detail)| format!("{}: {}", name, detail))
            .collect::<Vec<_>>()
            .join("; ");
        format!("Environment reset finished with errors ({}). Check the server log.", failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success() {
        let report = ShutdownReport {
            quit: StepOutcome::Ok("acknowledged".into()),
            restore: StepOutcome::Ok("config restored".into()),
            purge: StepOutcome::Ok("cache purged".into()),
        };
        assert!(report.is_success());
        assert!(report.failures().is_empty());
        assert!(report.summary().starts_with("Environment reset complete"));
    }

    #[test]
    fn test_report_lists_failed_steps() {
        let report = ShutdownReport {
            quit: StepOutcome::Ok("no response".into()),
            restore: StepOutcome::Failed("permission denied".into()),
            purge: StepOutcome::Ok("cache purged".into()),
        };
        assert!(!report.is_success());
        assert_eq!(report.failures(), vec![("restore", "permission denied")]);
        assert!(report.summary().contains("restore: permission denied"));
    }

    #[test]
    fn test_step_outcome_from_result() {
        let ok: Result<String, std::io::Error> = Ok("done".into());
        assert_eq!(StepOutcome::from(ok), StepOutcome::Ok("done".into()));

        let err: Result<String, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(StepOutcome::from(err), StepOutcome::Failed("boom".into()));
    }
}

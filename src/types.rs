use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a watch trigger arrives while a run is already in progress.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger. The running tasks are never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// How a run request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run the targets once and exit.
    #[default]
    Once,
    /// Keep watching the targets' source globs and re-run on change.
    Watch,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once" => Ok(RunMode::Once),
            "watch" => Ok(RunMode::Watch),
            other => Err(format!(
                "invalid run mode: {other} (expected \"once\" or \"watch\")"
            )),
        }
    }
}

/// A target plus execution mode, as resolved from the CLI and aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub targets: Vec<String>,
    pub mode: RunMode,
}

impl RunRequest {
    pub fn once(target: impl Into<String>) -> Self {
        Self {
            targets: vec![target.into()],
            mode: RunMode::Once,
        }
    }
}

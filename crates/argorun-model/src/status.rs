use serde::{Deserialize, Serialize};

/// Terminal status fragment of a workflow.
///
/// Fetched with `?fields=status.phase,status.message`, so both fields may be
/// absent. Only the literal phase `Succeeded` counts as success; every other
/// phase, including unknown ones, is a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowStatus {
    pub const SUCCEEDED: &'static str = "Succeeded";

    pub fn succeeded(&self) -> bool {
        self.phase.as_deref() == Some(Self::SUCCEEDED)
    }

    /// Engine-provided message, verbatim. May be empty.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    pub fn phase(&self) -> &str {
        self.phase.as_deref().unwrap_or("Unknown")
    }
}

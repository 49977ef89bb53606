use super::processor::ExecutionResult;
use crate::error::{MuxkitError, Result};

/// Marker MKVToolNix prints on stderr when it exits with status 1 but the
/// output file is still usable.
pub const WARNING_MARKER: &str = "Warning:";

pub const SUCCESS_MESSAGE: &str = "Operation completed successfully.";
pub const WARNING_MESSAGE: &str = "Operation completed with warnings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    WarningSuccess,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub classification: Classification,
    pub message: String,
    /// Primary-channel text, present unless the run failed.
    pub payload: Option<String>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.classification != Classification::Failure
    }

    /// Turn a failed classification into a [`MuxkitError::Tool`].
    pub fn into_result(self, tool: &str, exit_code: Option<i32>) -> Result<Outcome> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MuxkitError::Tool {
                tool: tool.to_string(),
                exit_code,
                message: self.message,
            })
        }
    }
}

/// How a tool's exit status is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Zero is success, anything else is failure.
    Strict,
    /// Exit code 1 plus [`WARNING_MARKER`] in the diagnostics is a success
    /// with warnings.
    WarningTolerant,
}

impl ExitPolicy {
    pub fn classify(self, result: &ExecutionResult) -> Outcome {
        match (self, result.exit_code) {
            (_, Some(0)) => Outcome {
                classification: Classification::Success,
                message: SUCCESS_MESSAGE.to_string(),
                payload: Some(result.primary().to_string()),
            },
            (ExitPolicy::WarningTolerant, Some(1)) if result.diagnostics().contains(WARNING_MARKER) => Outcome {
                classification: Classification::WarningSuccess,
                message: WARNING_MESSAGE.to_string(),
                payload: Some(result.primary().to_string()),
            },
            (_, exit_code) => Outcome {
                classification: Classification::Failure,
                message: failure_message(exit_code, result.diagnostics()),
                payload: None,
            },
        }
    }
}

fn failure_message(exit_code: Option<i32>, diagnostics: &str) -> String {
    let mut message = match exit_code {
        Some(code) => format!("Operation failed with exit code {}.", code),
        None => "Operation failed: the process was terminated by a signal.".to_string(),
    };

    let details = diagnostics.trim();
    if !details.is_empty() {
        message.push_str("\nDetails:\n");
        message.push_str(details);
    }
    message
}

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{MuxkitError, Result};
use crate::media::{CommandExecutor, MediaCommandBuilder, Tool, run_classified};
use crate::progress::Reporter;

/// Availability of one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub tool: Tool,
    /// Invocable the resolver chose.
    pub program: String,
    /// First line of the version banner, or why the tool could not run.
    pub detail: String,
    pub available: bool,
}

/// Runs every tool's version flag.
pub struct ToolChecker {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl ToolChecker {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    /// Check all tools; the terminal notification is an error if any is unavailable.
    pub async fn check_all(&self, reporter: &Reporter) -> Vec<ToolCheck> {
        let mut checks = Vec::with_capacity(Tool::ALL.len());
        for tool in Tool::ALL {
            checks.push(self.check(tool, reporter).await);
        }

        let missing: Vec<String> = checks
            .iter()
            .filter(|c| !c.available)
            .map(|c| c.tool.to_string())
            .collect();
        let result: Result<usize> = if missing.is_empty() {
            Ok(checks.len())
        } else {
            Err(MuxkitError::ToolsUnavailable(missing))
        };

        if !reporter.finish(&result, |count| format!("All {} tools are available.", count)) {
            warn!("Tool check finished after the reporter was already closed");
        }
        checks
    }

    async fn check(&self, tool: Tool, reporter: &Reporter) -> ToolCheck {
        let command = self.builder.version(tool);
        let program = command.program.clone();

        match run_classified(self.executor.as_ref(), &command, reporter).await {
            Ok(outcome) => {
                let banner = outcome.payload.unwrap_or_default();
                let detail = banner.lines().next().unwrap_or_default().trim().to_string();
                info!("{} available: {}", tool, detail);
                ToolCheck { tool, program, detail, available: true }
            }
            Err(MuxkitError::Launch { source, .. }) => {
                warn!("{} could not be started from {}: {}", tool, program, source);
                ToolCheck { tool, program, detail: format!("not installed ({})", source), available: false }
            }
            Err(e) => {
                warn!("{} version check failed: {}", tool, e);
                ToolCheck { tool, program, detail: e.to_string(), available: false }
            }
        }
    }
}

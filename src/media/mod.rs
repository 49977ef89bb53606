// Media tool orchestration
//
// This module turns typed requests into argument vectors and runs them:
// - Commands: argument-vector builders for every supported operation
// - Tools: executable identities and path resolution
// - Processor: async process runner with concurrent output draining
// - Outcome: per-tool exit-status classification
// - Probe / Properties: parsing of the JSON the tools report

pub mod commands;
pub mod formats;
pub mod outcome;
pub mod probe;
pub mod processor;
pub mod properties;
pub mod tools;

use async_trait::async_trait;
use std::sync::Arc;

pub use commands::*;
pub use formats::*;
pub use outcome::*;
pub use processor::*;
pub use tools::*;

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::progress::Reporter;

/// Runs one [`MediaCommand`] to completion.
///
/// Implementations forward every output line to the reporter but never
/// deliver a terminal notification; that belongs to the caller.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &MediaCommand, reporter: &Reporter) -> Result<ExecutionResult>;
}

/// Execute `command` and classify its exit status with the tool's policy.
///
/// A failed classification becomes [`crate::error::MuxkitError::Tool`].
pub async fn run_classified(
    executor: &dyn CommandExecutor,
    command: &MediaCommand,
    reporter: &Reporter,
) -> Result<Outcome> {
    let result = executor.execute(command, reporter).await?;
    let outcome = command.tool.exit_policy().classify(&result);
    outcome.into_result(command.tool.executable_name(), result.exit_code)
}

/// Factory for the default executor
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create the process-backed executor
    pub fn create_runner(config: &RunnerConfig) -> Arc<ProcessRunner> {
        Arc::new(ProcessRunner::new(config.workers))
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuxkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before any process was launched.
    #[error("{0}")]
    Validation(String),

    /// The OS refused to start the external tool.
    #[error("Failed to start {tool}. Ensure it is installed and on your system's PATH. Details: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading one of the tool's output channels failed.
    #[error("Failed while processing command output. Details: {0}")]
    Stream(String),

    /// The tool ran and its exit status was classified as a failure.
    #[error("{message}")]
    Tool {
        tool: String,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("JSON parsing error in {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed tool output: {0}")]
    MalformedOutput(String),

    /// One sub-operation of a multi-track extraction failed.
    #[error("An error occurred during {kind} extraction: {message}")]
    Extraction { kind: String, message: String },

    /// Tools whose version check failed.
    #[error("Unavailable tools: {}", .0.join(", "))]
    ToolsUnavailable(Vec<String>),

    #[error("Process runner has been shut down")]
    RunnerClosed,
}

impl MuxkitError {
    pub fn parse<C: Into<String>>(context: C, source: serde_json::Error) -> Self {
        MuxkitError::Parse {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MuxkitError>;

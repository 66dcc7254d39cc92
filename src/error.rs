//! Typed errors at the library boundary.
//!
//! Internals (tools, the inference client, the run log) use `anyhow`; the
//! variants here are the failures a caller is expected to match on.

use thiserror::Error;

/// Misconfiguration detected before any run begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing API credential (set `api_key` in the config or TOOLSMITH_API_KEY)")]
    MissingCredential,

    #[error("missing model identifier")]
    MissingModel,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("a tool named `{0}` is already registered")]
    DuplicateTool(String),

    #[error("could not parse model decision: {0}")]
    DecisionParse(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, AgentError>;

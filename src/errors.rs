// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobgraphError {
    #[error("there are no jobs")]
    NoJobs,

    #[error("failed to find {dependency} dependency (needed by job '{job}')")]
    DependencyNotFound { job: String, dependency: String },

    #[error("detected a circular dependency: {0}")]
    CircularDependency(String),

    #[error("job '{job}' step '{step}' exited with status {code}")]
    StepFailed { job: String, step: String, code: i32 },

    #[error("job '{job}' step '{step}' failed to start: {source}")]
    Spawn {
        job: String,
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("job '{job}' step '{step}': waiting for process failed: {source}")]
    Wait {
        job: String,
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stdout is required to be set")]
    MissingStdout,

    #[error("failed to find a shell")]
    NoShell,

    #[error("run was cancelled")]
    Cancelled,

    #[error("failed to read config {source_name}: {source}")]
    ConfigRead {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch config {url}: {source}")]
    ConfigFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JobgraphError>;

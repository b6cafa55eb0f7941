// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Canonical job identifier type (the key under `jobs:`).
pub type JobId = String;

/// Top-level configuration document.
///
/// ```yaml
/// version: "1"
/// jobs:
///   build:
///     name: Build everything
///     steps:
///       - name: compile
///         run: make all
///         env:
///           CFLAGS: -O2
///   test:
///     needs: [build]
///     steps:
///       - run: make test
/// ```
///
/// Jobs are kept in a `BTreeMap` so every consumer sees them id-sorted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub jobs: BTreeMap<JobId, JobConfig>,
}

/// A job: ordered steps plus the ids of the jobs it needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobConfig {
    /// Human readable name, exposed to steps as `JOBGRAPH_JOB_NAME`.
    #[serde(default)]
    pub name: String,

    /// Job ids that must complete successfully before this job starts.
    #[serde(default)]
    pub needs: Vec<JobId>,

    /// Steps, run strictly in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One shell command invocation within a job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub name: String,

    /// Command string handed to the shell.
    #[serde(default)]
    pub run: String,

    /// Step-scoped environment overrides. These win over both the inherited
    /// environment and the `JOBGRAPH_*` builtins.
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

/// A scalar environment value as written in the config.
///
/// Documents may write `RETRIES: 3` or `DEBUG: true`; everything is coerced
/// to text before it reaches a process. A YAML null (`FOO:`) becomes the
/// empty string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Null => Ok(()),
            EnvValue::Bool(b) => write!(f, "{b}"),
            EnvValue::Int(i) => write!(f, "{i}"),
            EnvValue::Float(x) => write!(f, "{x}"),
            EnvValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        EnvValue::Text(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        EnvValue::Text(s)
    }
}

// src/exec/env.rs

//! Environment composition for step processes.

use std::collections::BTreeMap;
use std::fmt::Display;

use tokio::process::Command;

/// Prefix of every builtin variable, e.g. `JOB_NAME` becomes
/// `JOBGRAPH_JOB_NAME`.
pub const ENV_BUILTIN_PREFIX: &str = "JOBGRAPH_";

/// Key/value environment handed to a process. Values are stored as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, overwriting any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Display) {
        self.vars.insert(key.into(), value.to_string());
    }

    /// Like [`Env::set`], but the key lives under [`ENV_BUILTIN_PREFIX`].
    pub fn set_builtin(&mut self, key: &str, value: impl Display) {
        self.set(format!("{ENV_BUILTIN_PREFIX}{key}"), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Layer `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &Env) {
        for (k, v) in other.vars.iter() {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    /// Encode every entry as `KEY=VALUE`.
    pub fn encode(&self) -> Vec<String> {
        self.vars.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Layer these entries over the environment the command inherits from
    /// this process.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(self.vars.iter());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Env
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Env::new();
        for (key, value) in iter {
            env.set(key, value);
        }
        env
    }
}

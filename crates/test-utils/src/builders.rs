#![allow(dead_code)]

use std::collections::BTreeMap;

use jobgraph::config::{ConfigFile, EnvValue, JobConfig, StepConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.config.version = Some(version.to_string());
        self
    }

    pub fn with_job(mut self, id: &str, job: JobConfig) -> Self {
        self.config.jobs.insert(id.to_string(), job);
        self
    }

    pub fn build(self) -> ConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        Self {
            job: JobConfig::default(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.job.name = name.to_string();
        self
    }

    pub fn needs(mut self, dependency: &str) -> Self {
        self.job.needs.push(dependency.to_string());
        self
    }

    pub fn step(self, name: &str, run: &str) -> Self {
        self.step_with_env(name, run, &[])
    }

    pub fn step_with_env(mut self, name: &str, run: &str, env: &[(&str, &str)]) -> Self {
        let env: BTreeMap<String, EnvValue> = env
            .iter()
            .map(|(k, v)| (k.to_string(), EnvValue::from(*v)))
            .collect();
        self.job.steps.push(StepConfig {
            name: name.to_string(),
            run: run.to_string(),
            env,
        });
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// src/config/loader.rs

use std::path::Path;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{JobgraphError, Result};

/// Document format of a config source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the source name: `.toml` means TOML, anything
    /// else is read as YAML.
    pub fn from_source(source: &str) -> Self {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Load a configuration document from a filesystem path or an
/// `http://` / `https://` URL.
///
/// This only retrieves and decodes the document. Graph-level problems
/// (unknown `needs`, cycles, no jobs) surface later from
/// [`crate::dag::Graph::build`].
pub async fn load_config(source: &str) -> Result<ConfigFile> {
    let contents = if is_url(source) {
        fetch(source).await?
    } else {
        tokio::fs::read_to_string(source).await.map_err(|e| JobgraphError::ConfigRead {
            source_name: source.to_string(),
            source: e,
        })?
    };

    let cfg = parse_config(&contents, ConfigFormat::from_source(source))?;
    debug!(source, jobs = cfg.jobs.len(), "loaded config");
    Ok(cfg)
}

/// Decode a config document that is already in memory.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<ConfigFile> {
    let cfg = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
        ConfigFormat::Toml => toml::from_str(contents)?,
    };
    Ok(cfg)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn fetch(url: &str) -> Result<String> {
    let fetch_err = |e: reqwest::Error| JobgraphError::ConfigFetch {
        url: url.to_string(),
        source: e,
    };

    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(fetch_err)?;
    response.text().await.map_err(fetch_err)
}

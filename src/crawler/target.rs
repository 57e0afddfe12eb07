//! Crawl input validation and target construction
//!
//! Caller input arrives as three parallel lists. This module checks the
//! orchestrator's preconditions and turns the lists into `Target`s.

use crate::config::Config;
use crate::CrawlError;
use std::path::{Path, PathBuf};

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Destination key; the artifact is named after it
    pub destination: String,

    /// Endpoint URL, without pagination parameters
    pub url: String,

    /// Bearer credential chosen for this target
    pub credential: String,

    /// Where the finished collection is stored
    pub artifact_path: PathBuf,
}

/// Ordered, non-empty sequence of credentials
#[derive(Debug, Clone)]
pub struct CredentialPool {
    tokens: Vec<String>,
}

impl CredentialPool {
    /// Creates a pool, rejecting an empty token list
    pub fn new(tokens: Vec<String>) -> Result<Self, CrawlError> {
        if tokens.is_empty() {
            return Err(CrawlError::NoCredentials);
        }
        Ok(Self { tokens })
    }

    /// Credential for the target at `index` (round-robin)
    pub fn for_index(&self, index: usize) -> &str {
        &self.tokens[index % self.tokens.len()]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Raw crawl input as supplied by the caller
///
/// List elements are loosely typed so that input read from a file can be
/// checked element by element.
#[derive(Debug, Clone, Default)]
pub struct CrawlInput {
    pub destinations: Vec<toml::Value>,
    pub urls: Vec<toml::Value>,
    pub credentials: Vec<String>,
}

impl CrawlInput {
    /// Builds input from already-typed lists
    pub fn from_strings<D, U, C>(destinations: D, urls: U, credentials: C) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            destinations: destinations
                .into_iter()
                .map(|d| toml::Value::String(d.into()))
                .collect(),
            urls: urls
                .into_iter()
                .map(|u| toml::Value::String(u.into()))
                .collect(),
            credentials: credentials.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the target lists and credential pool from a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            destinations: config.targets.destinations.clone(),
            urls: config.targets.urls.clone(),
            credentials: config.credentials.tokens.clone(),
        }
    }

    /// Checks the orchestrator's preconditions
    ///
    /// # Order of checks
    ///
    /// 1. Credential pool is non-empty
    /// 2. Both lists have the same length
    /// 3. Every destination is a string, then every URL is a string
    pub fn validate(&self) -> Result<ValidatedInput, CrawlError> {
        let pool = CredentialPool::new(self.credentials.clone())?;

        if self.destinations.len() != self.urls.len() {
            return Err(CrawlError::LengthMismatch {
                destinations: self.destinations.len(),
                urls: self.urls.len(),
            });
        }

        let destinations = strings_of(&self.destinations, "destinations")?;
        let urls = strings_of(&self.urls, "urls")?;

        Ok(ValidatedInput {
            pairs: destinations.into_iter().zip(urls).collect(),
            pool,
        })
    }
}

/// Input that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pairs: Vec<(String, String)>,
    pool: CredentialPool,
}

impl ValidatedInput {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Builds targets writing under `output_dir`, assigning credentials round-robin
    pub fn into_targets(self, output_dir: &Path) -> Vec<Target> {
        let pool = self.pool;
        self.pairs
            .into_iter()
            .enumerate()
            .map(|(index, (destination, url))| Target {
                artifact_path: artifact_path(output_dir, &destination),
                credential: pool.for_index(index).to_string(),
                destination,
                url,
            })
            .collect()
    }
}

/// Path of the artifact for `destination`
pub fn artifact_path(output_dir: &Path, destination: &str) -> PathBuf {
    output_dir.join(format!("{}.json", destination))
}

fn strings_of(values: &[toml::Value], list: &'static str) -> Result<Vec<String>, CrawlError> {
    values
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or(CrawlError::NotString { list })
        })
        .collect()
}

/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Harness configuration: where the corpus lives, which cases to run and how
//! many worker threads to use.

use miette::Diagnostic;
use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the location of the corpus for relative corpus paths
pub const CASES_PATH_ENV_VAR: &str = "OPA_CONFORMANCE_CASES_PATH";
/// Only run cases whose name contains this substring
pub const FILTER_ENV_VAR: &str = "OPA_CONFORMANCE_FILTER";
/// Number of worker threads
pub const JOBS_ENV_VAR: &str = "OPA_CONFORMANCE_JOBS";

/// Location of the corpus inside an OPA checkout
pub const DEFAULT_CORPUS_PATH: &str = "test/cases/testdata";

/// Errors building a [`HarnessConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
pub enum ConfigError {
    /// A relative corpus path with nothing to resolve it against
    #[error("cannot resolve relative corpus path {}", .0.display())]
    #[diagnostic(help(
        "set `OPA_CONFORMANCE_CASES_PATH`, or run under cargo so `CARGO_MANIFEST_DIR` is set"
    ))]
    UnresolvedPath(PathBuf),
    /// The worker count is not a positive integer
    #[error("invalid value `{0}` for `OPA_CONFORMANCE_JOBS`")]
    #[diagnostic(help("expected a positive integer"))]
    InvalidJobs(String),
}

/// Configuration of a harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Corpus directory. Relative paths are resolved by [`resolve_corpus_path`].
    pub corpus_path: PathBuf,
    /// Only run cases whose name contains this substring
    pub filter: Option<String>,
    /// Number of worker threads
    pub jobs: NonZeroUsize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            filter: None,
            jobs: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl HarnessConfig {
    /// Default configuration, with the filter and worker count taken from
    /// the environment when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(filter) = env::var(FILTER_ENV_VAR) {
            config.filter = Some(filter).filter(|f| !f.is_empty());
        }
        if let Ok(jobs) = env::var(JOBS_ENV_VAR) {
            config.jobs = parse_jobs(&jobs)?;
        }
        Ok(config)
    }

    /// The corpus directory as an absolute (or environment-provided) path
    pub fn resolved_corpus_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_corpus_path(&self.corpus_path)
    }
}

fn parse_jobs(s: &str) -> Result<NonZeroUsize, ConfigError> {
    s.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidJobs(s.to_owned()))
}

/// For relative paths, return the corpus location. For absolute paths,
/// return them unchanged.
///
/// A relative path is replaced by `OPA_CONFORMANCE_CASES_PATH` when that is
/// set; otherwise it is taken relative to an OPA checkout next to this
/// crate's workspace, `CARGO_MANIFEST_DIR/../opa`.
pub fn resolve_corpus_path(path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
    resolve_corpus_path_with(
        path.as_ref(),
        env::var(CASES_PATH_ENV_VAR).ok().as_deref(),
        env::var("CARGO_MANIFEST_DIR").ok().as_deref(),
    )
}

fn resolve_corpus_path_with(
    path: &Path,
    cases_path_override: Option<&str>,
    manifest_dir: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    if let Some(cases_path) = cases_path_override {
        return Ok(PathBuf::from(cases_path));
    }
    let manifest_dir = manifest_dir.ok_or_else(|| ConfigError::UnresolvedPath(path.into()))?;
    let mut full_path = PathBuf::from(manifest_dir);
    full_path.push("..");
    full_path.push("opa");
    full_path.push(path);
    Ok(full_path)
}

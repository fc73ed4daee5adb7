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

//! The test case file format shared by OPA implementations, and loading of
//! a corpus of such files from disk.

use crate::engine::Bindings;
use crate::term::Term;
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Representation of one case file: a list of test cases.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaseFile {
    /// The test cases, in file order
    pub cases: Vec<TestCase>,
}

/// One declarative test case.
///
/// Example (YAML):
/// ```yaml
/// cases:
/// - note: basic/defined
///   modules:
///   - |
///     package x
///     x = 1
///   query: data.x.x == 1
///   want_defined: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TestCase {
    /// Path of the file the case was loaded from, relative to the corpus root
    #[serde(skip)]
    pub filename: String,
    /// Name of the case within its file
    pub note: String,
    /// Query to evaluate
    pub query: String,
    /// Source of the policy modules, in order
    #[serde(default)]
    pub modules: Vec<String>,
    /// Base data document
    pub data: Option<Term>,
    /// Input document
    pub input: Option<Term>,
    /// Input given as a raw Rego term rather than JSON
    pub input_term: Option<String>,
    /// Expect the query to be defined (or undefined)
    pub want_defined: Option<bool>,
    /// Expect exactly these binding sets
    pub want_result: Option<Vec<Bindings>>,
    /// Sort the actual binding sets before comparing with `want_result`
    #[serde(default)]
    pub sort_bindings: bool,
    /// Expect evaluation to fail with this error code
    pub want_error_code: Option<String>,
    /// Expect evaluation to fail with this error message
    pub want_error: Option<String>,
}

/// What a test case expects of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation<'a> {
    /// The query is (un)defined
    Defined(bool),
    /// The query produces exactly these binding sets
    ResultSet {
        /// Expected binding sets
        bindings: &'a [Bindings],
        /// Sort the actual binding sets before comparing
        sort_bindings: bool,
    },
    /// Compilation or evaluation fails. Code and message are informational.
    Error {
        /// Expected error code
        code: Option<&'a str>,
        /// Expected error message
        message: Option<&'a str>,
    },
}

impl Expectation<'_> {
    /// Does this expectation call for a failure
    pub fn expects_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// The input a test case provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseInput<'a> {
    /// No input document
    Absent,
    /// A JSON input document
    Document(&'a Term),
    /// A raw Rego term; not supported by this harness
    RawTerm(&'a str),
}

impl<'a> CaseInput<'a> {
    /// The input document to evaluate against, if any
    pub fn document(self) -> Option<&'a Term> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Absent | Self::RawTerm(_) => None,
        }
    }
}

/// Errors in an individual test case
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
pub enum CaseError {
    /// None of the expectation fields are set
    #[error("test case `{0}` has no expectation")]
    #[diagnostic(help(
        "set one of `want_defined`, `want_result`, `want_error_code` or `want_error`"
    ))]
    NoExpectation(String),
}

impl TestCase {
    /// Identifier of the test case, unique within a corpus
    pub fn name(&self) -> String {
        format!("{}/{}", self.filename, self.note)
    }

    /// The case's expectation. When more than one kind is populated the
    /// first of defined, result set, error wins.
    pub fn expectation(&self) -> Result<Expectation<'_>, CaseError> {
        if let Some(want) = self.want_defined {
            Ok(Expectation::Defined(want))
        } else if let Some(bindings) = &self.want_result {
            Ok(Expectation::ResultSet {
                bindings,
                sort_bindings: self.sort_bindings,
            })
        } else if self.want_error_code.is_some() || self.want_error.is_some() {
            Ok(Expectation::Error {
                code: self.want_error_code.as_deref(),
                message: self.want_error.as_deref(),
            })
        } else {
            Err(CaseError::NoExpectation(self.name()))
        }
    }

    /// The case's input. A raw term takes precedence over a document.
    pub fn input(&self) -> CaseInput<'_> {
        match (&self.input_term, &self.input) {
            (Some(raw), _) => CaseInput::RawTerm(raw),
            (None, Some(doc)) => CaseInput::Document(doc),
            (None, None) => CaseInput::Absent,
        }
    }
}

/// Errors loading a corpus. Any of these is fatal for the whole run.
#[derive(Debug, Diagnostic, Error)]
pub enum LoadError {
    /// Failure traversing the corpus directory
    #[error("failed to walk corpus directory {}", .path.display())]
    Walk {
        /// Corpus root
        path: PathBuf,
        /// Underlying error
        #[source]
        source: walkdir::Error,
    },
    /// Failure reading a case file
    #[error("failed to read test file {}", .path.display())]
    Read {
        /// The case file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// A YAML case file is malformed
    #[error("failed to parse test file {}", .path.display())]
    Yaml {
        /// The case file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },
    /// A JSON case file is malformed
    #[error("failed to parse test file {}", .path.display())]
    Json {
        /// The case file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
    /// Two cases share an identifier
    #[error("duplicate test case `{0}`")]
    #[diagnostic(help("notes must be unique within a test file"))]
    DuplicateCase(String),
}

/// An ordered collection of test cases.
///
/// INVARIANT: cases are ordered by filename, keeping file order within a
/// file, and no two cases share a [`TestCase::name`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    cases: Vec<TestCase>,
}

impl Corpus {
    /// Build a corpus from cases constructed in memory.
    pub fn from_cases(mut cases: Vec<TestCase>) -> Result<Self, LoadError> {
        cases.sort_by(|a, b| a.filename.cmp(&b.filename));
        if let Some(duplicate) = cases.iter().map(TestCase::name).duplicates().next() {
            return Err(LoadError::DuplicateCase(duplicate));
        }
        Ok(Self { cases })
    }

    /// Load every case file (`.yaml`, `.yml` or `.json`) under `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        let root = root.as_ref();
        let mut cases = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|source| LoadError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() || !is_case_file(entry.path()) {
                continue;
            }
            let filename = relative_name(root, entry.path());
            let file = load_case_file(entry.path())?;
            debug!(file = %filename, cases = file.cases.len(), "loaded test file");
            cases.extend(file.cases.into_iter().map(|case| TestCase {
                filename: filename.clone(),
                ..case
            }));
        }
        Self::from_cases(cases)
    }

    /// Keep only the cases whose name contains `pattern`
    pub fn filter(self, pattern: &str) -> Self {
        Self {
            cases: self
                .cases
                .into_iter()
                .filter(|case| case.name().contains(pattern))
                .collect(),
        }
    }

    /// The cases, in order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Convenience method to check if the corpus is empty
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Borrowed iterator
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }
}

/// Returns true if the path has one of the case file extensions
fn is_case_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}

/// `path` relative to `root`, with `/` separators on every platform
fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

/// Read and parse one case file
pub fn load_case_file(path: &Path) -> Result<CaseFile, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&text).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

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

//! Definition of the traits describing the policy compiler and evaluation
//! engine under test. An implementation of these traits is all the harness
//! needs to run the conformance corpus against a Rego engine.

use crate::term::Term;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{self, Display};
use thiserror::Error;

/// One binding set: query variable name to its value for one satisfying
/// assignment.
pub type Bindings = serde_json::Map<String, serde_json::Value>;

/// Result of evaluating a query: the full sequence of binding sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    /// Binding sets in the order the engine produced them
    pub bindings: Vec<Bindings>,
}

impl ResultSet {
    /// Create a `ResultSet` from binding sets
    pub fn new(bindings: Vec<Bindings>) -> Self {
        Self { bindings }
    }

    /// The query is defined if it produced at least one binding set
    pub fn is_defined(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Number of binding sets
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Convenience method to check if no binding sets were produced
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<Bindings> for ResultSet {
    fn from_iter<T: IntoIterator<Item = Bindings>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A policy module handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModule {
    /// File name the module is known by in diagnostics
    pub name: String,
    /// Rego source text
    pub source: String,
}

impl PolicyModule {
    /// Name the sources of a test case `module-0.rego`, `module-1.rego`, ...
    /// keeping their order.
    pub fn numbered<S: AsRef<str>>(sources: &[S]) -> Vec<Self> {
        sources
            .iter()
            .enumerate()
            .map(|(i, source)| Self {
                name: format!("module-{i}.rego"),
                source: source.as_ref().to_owned(),
            })
            .collect()
    }
}

/// Opaque output of a [`PolicyCompiler`], consumed by the matching [`Engine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPolicy {
    bytes: Vec<u8>,
}

impl CompiledPolicy {
    /// Wrap compiled bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrow the compiled bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Everything an [`Engine`] needs to build an [`Evaluator`]. The value is
/// immutable once built and is consumed by [`Engine::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// The compiled policy
    pub policy: CompiledPolicy,
    /// Base data document, if the test case has one
    pub base_data: Option<Term>,
}

/// The step of a test case that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Compiling the policy modules and query
    Compile,
    /// Loading the compiled policy and base data
    Init,
    /// Evaluating the query
    Eval,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Init => write!(f, "init"),
            Self::Eval => write!(f, "eval"),
        }
    }
}

/// An error reported by the compiler or engine under test.
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
pub struct EngineError {
    stage: Stage,
    /// Machine-readable error class, e.g. `rego_parse_error`
    code: Option<SmolStr>,
    message: String,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} error ({code}): {}", self.stage, self.message),
            None => write!(f, "{} error: {}", self.stage, self.message),
        }
    }
}

impl EngineError {
    /// Construct an error for `stage`
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            code: None,
            message: message.into(),
        }
    }

    /// Construct a compile error
    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(Stage::Compile, message)
    }

    /// Construct an initialization error
    pub fn init(message: impl Into<String>) -> Self {
        Self::new(Stage::Init, message)
    }

    /// Construct an evaluation error
    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(Stage::Eval, message)
    }

    /// Attach an error code
    pub fn with_code(mut self, code: impl Into<SmolStr>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The stage that failed
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The error code, if the engine reported one
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of evaluating one test case
pub type Outcome = Result<ResultSet, EngineError>;

/// Compiles Rego modules plus a query into something an [`Engine`] can load.
pub trait PolicyCompiler {
    /// Compile `query` against `modules`, in the given order.
    fn compile(&self, query: &str, modules: &[PolicyModule])
        -> Result<CompiledPolicy, EngineError>;
}

/// Builds evaluators from compiled policies.
pub trait Engine {
    /// The ready-to-use evaluator type
    type Evaluator: Evaluator;

    /// Load the compiled policy and base data.
    fn init(&self, config: EngineConfig) -> Result<Self::Evaluator, EngineError>;
}

/// Evaluates the compiled query. Calls are blocking and have no timeout.
pub trait Evaluator {
    /// Evaluate against an input document (absent if the case has none).
    fn evaluate(&self, input: Option<&Term>) -> Outcome;
}

impl<T: PolicyCompiler + ?Sized> PolicyCompiler for &T {
    fn compile(
        &self,
        query: &str,
        modules: &[PolicyModule],
    ) -> Result<CompiledPolicy, EngineError> {
        (**self).compile(query, modules)
    }
}

impl<T: Engine + ?Sized> Engine for &T {
    type Evaluator = T::Evaluator;

    fn init(&self, config: EngineConfig) -> Result<Self::Evaluator, EngineError> {
        (**self).init(config)
    }
}

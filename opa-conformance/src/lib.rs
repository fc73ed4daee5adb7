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

//! Conformance harness for Rego evaluation engines.
//!
//! The harness reads the declarative test cases shared by OPA
//! implementations, compiles and evaluates each one with an implementation
//! of [`PolicyCompiler`] and [`Engine`], and checks the outcome against the
//! case's expectation. Results are compared as structural [`Term`]s, so
//! `{"a": 1.0}` and `{"a": 1}` are the same result.
#![warn(missing_docs)]

pub mod assert;
pub mod cases;
pub mod config;
pub mod engine;
mod err;
pub use err::HarnessError;
pub mod normalize;
pub mod runner;
pub mod term;

pub use assert::{check_outcome, Mismatch, Verdict};
pub use cases::{Corpus, Expectation, TestCase};
pub use config::HarnessConfig;
pub use engine::{
    Bindings, CompiledPolicy, Engine, EngineConfig, EngineError, Evaluator, PolicyCompiler,
    PolicyModule, ResultSet,
};
pub use normalize::normalize;
pub use runner::{CaseReport, CaseStatus, Harness, RunSummary};
pub use term::Term;

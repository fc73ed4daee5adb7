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

use crate::cases::{CaseError, LoadError};
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::normalize::NormalizeError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that stop a test case (or, for load and configuration errors, the
/// whole run) before its outcome can be checked. These are distinct from a
/// [`crate::assert::Mismatch`], where the check ran and disagreed.
#[derive(Debug, Diagnostic, Error)]
pub enum HarnessError {
    /// The harness could not be configured
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
    /// The corpus could not be loaded
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),
    /// The test case itself is defective
    #[error(transparent)]
    #[diagnostic(transparent)]
    Case(#[from] CaseError),
    /// Compilation failed and the case did not expect an error
    #[error("unexpected compile failure: {0}")]
    Compile(EngineError),
    /// The engine could not load the compiled policy or base data
    #[error("engine initialization failed: {0}")]
    Init(EngineError),
    /// A result could not be normalized
    #[error(transparent)]
    #[diagnostic(transparent)]
    Normalize(#[from] NormalizeError),
    /// The compiler or engine panicked
    #[error("engine panicked: {0}")]
    Panic(String),
}

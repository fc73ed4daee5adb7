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

//! Conversion of arbitrary serializable values into [`Term`]s.
//!
//! Values are written out as JSON text and read back with the term parser, so
//! the expected and the actual side of a comparison always go through the
//! same parser and share its equality (numeric literal normalization, key
//! typing, and so on).

use crate::term::{Term, TermError};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Errors produced by [`normalize`]. Either is fatal for the test case being
/// checked.
#[derive(Debug, Diagnostic, Error)]
pub enum NormalizeError {
    /// The value has no JSON representation
    #[error("value cannot be represented as a JSON document: {0}")]
    #[diagnostic(help("map keys must be strings and every `Serialize` impl must succeed"))]
    Serialize(#[source] serde_json::Error),
    /// The serialized text was rejected by the term parser
    #[error("serialized value `{text}` is not a valid term")]
    Parse {
        /// The serialized text
        text: String,
        /// Underlying error
        #[source]
        #[diagnostic_source]
        source: TermError,
    },
}

/// Convert `value` to its canonical [`Term`].
///
/// Non-finite floats (`NaN`, `inf`) have no JSON form; `serde_json` writes
/// them as `null`, so they normalize to [`Term::Null`].
pub fn normalize<T>(value: &T) -> Result<Term, NormalizeError>
where
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(value).map_err(NormalizeError::Serialize)?;
    Term::from_json_str(&text).map_err(|source| NormalizeError::Parse { text, source })
}

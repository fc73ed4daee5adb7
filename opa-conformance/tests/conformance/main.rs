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

//! End-to-end tests of the harness against a toy engine

// PANIC SAFETY tests
#![allow(clippy::unwrap_used)]
// PANIC SAFETY tests
#![allow(clippy::expect_used)]
// PANIC SAFETY tests
#![allow(clippy::panic)]
mod corpus;
mod scenarios;

use opa_conformance::{Harness, TestCase};
use std::path::PathBuf;
use toy::{ToyCompiler, ToyEngine};

/// Harness over the toy implementation
fn harness() -> Harness<ToyCompiler, ToyEngine> {
    Harness::new(ToyCompiler, ToyEngine)
}

/// Absolute path of the fixture corpus
fn fixture_corpus() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/cases")
}

/// Parse a single case written as YAML, attributed to `scenarios.yaml`
fn case(yaml: &str) -> TestCase {
    TestCase {
        filename: "scenarios.yaml".into(),
        ..serde_yaml::from_str(yaml).expect("test case should parse")
    }
}

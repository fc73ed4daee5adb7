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

//! Single cases through every stage of the harness

use crate::{case, harness};
use cool_asserts::assert_matches;
use opa_conformance::assert::Definedness;
use opa_conformance::cases::CaseError;
use opa_conformance::engine::Stage;
use opa_conformance::runner::RAW_INPUT_SKIP_REASON;
use opa_conformance::{CaseStatus, HarnessError, Mismatch};

#[test]
fn rule_is_defined() {
    let report = harness().run_case(&case(
        r#"
note: rule/defined
modules:
- |
  package x
  x = 1
query: data.x.x == 1
want_defined: true
"#,
    ));
    assert_eq!(report.name, "scenarios.yaml/rule/defined");
    assert_matches!(report.status, CaseStatus::Passed);
}

#[test]
fn undefined_against_want_defined() {
    let report = harness().run_case(&case(
        r#"
note: rule/undefined
modules:
- |
  package x
  x = 1
query: data.x.y == 1
want_defined: true
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Failed(Mismatch::Definedness {
            expected: Definedness::Defined,
            actual: Definedness::Undefined,
        })
    );
}

#[test]
fn numerically_equal_results_match() {
    let report = harness().run_case(&case(
        r#"
note: result/numbers
query: x = input.n
input:
  n: 1.00
want_result:
- x: 1
"#,
    ));
    assert_matches!(report.status, CaseStatus::Passed);
}

#[test]
fn sorted_bindings_ignore_engine_order() {
    let report = harness().run_case(&case(
        r#"
note: result/sorted
query: x = data.xs[_]
data:
  xs: [2, 1]
sort_bindings: true
want_result:
- x: 1
- x: 2
"#,
    ));
    assert_matches!(report.status, CaseStatus::Passed);
}

#[test]
fn wrong_result() {
    let report = harness().run_case(&case(
        r#"
note: result/wrong
query: x = data.xs[_]
data:
  xs: [2, 1]
want_result:
- x: 1
- x: 2
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Failed(Mismatch::ResultSet { expected, actual }) => {
            assert_eq!(expected.to_string(), r#"[{"x": 1}, {"x": 2}]"#);
            assert_eq!(actual.to_string(), r#"[{"x": 2}, {"x": 1}]"#);
        }
    );
}

#[test]
fn expected_error_but_success() {
    let report = harness().run_case(&case(
        r#"
note: error/missing
query: x = data.y
data:
  y: 7
want_error_code: eval_type_error
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Failed(Mismatch::ExpectedError { results: 1 })
    );
}

#[test]
fn expected_error() {
    let report = harness().run_case(&case(
        r#"
note: error/expected
query: error("boom")
want_error: boom
"#,
    ));
    assert_matches!(report.status, CaseStatus::Passed);
}

#[test]
fn unexpected_error() {
    let report = harness().run_case(&case(
        r#"
note: error/unexpected
query: error("boom")
want_defined: true
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Failed(Mismatch::UnexpectedError(err)) => {
            assert_eq!(err.stage(), Stage::Eval);
            assert_eq!(err.code(), Some("eval_builtin_error"));
            assert_eq!(err.message(), "boom");
        }
    );
}

#[test]
fn missing_expectation_is_fatal() {
    let report = harness().run_case(&case(
        r#"
note: case/no-expectation
query: data.x == 1
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Fatal(HarnessError::Case(CaseError::NoExpectation(name))) => {
            assert_eq!(name, "scenarios.yaml/case/no-expectation");
        }
    );
}

#[test]
fn unexpected_compile_error_is_fatal() {
    let report = harness().run_case(&case(
        r#"
note: compile/syntax
query: data.x === 1
want_defined: true
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Fatal(HarnessError::Compile(err)) => {
            assert_eq!(err.stage(), Stage::Compile);
            assert_eq!(err.code(), Some("rego_parse_error"));
        }
    );
}

#[test]
fn expected_compile_error_passes() {
    let report = harness().run_case(&case(
        r#"
note: compile/expected
modules:
- |
  x = 1
query: data.x == 1
want_error_code: rego_parse_error
"#,
    ));
    assert_matches!(report.status, CaseStatus::Passed);
}

#[test]
fn init_error_is_fatal_even_when_an_error_is_expected() {
    let report = harness().run_case(&case(
        r#"
note: init/conflict
modules:
- |
  package x
  x = 1
data:
  x: 1
query: data.x.x == 1
want_error_code: rego_type_error
"#,
    ));
    assert_matches!(
        report.status,
        CaseStatus::Fatal(HarnessError::Init(err)) => {
            assert_eq!(err.stage(), Stage::Init);
        }
    );
}

#[test]
fn raw_input_term_is_skipped() {
    let report = harness().run_case(&case(
        r#"
note: input/raw
query: input.x == 1
input:
  x: 1
input_term: '{"x": 1}'
"#,
    ));
    assert_matches!(report.status, CaseStatus::Skipped(reason) => {
        assert_eq!(reason, RAW_INPUT_SKIP_REASON);
    });
}

#[test]
fn input_and_data_reach_the_engine() {
    let report = harness().run_case(&case(
        r#"
note: input/and-data
query: x = input.user
input:
  user:
    name: alice
    roles: [admin]
data:
  unused: true
want_result:
- x:
    roles: [admin]
    name: alice
"#,
    ));
    assert_matches!(report.status, CaseStatus::Passed);
}

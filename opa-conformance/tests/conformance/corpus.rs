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

//! Running the fixture corpus under `tests/cases`

use crate::{case, fixture_corpus, harness};
use opa_conformance::cases::LoadError;
use opa_conformance::{CaseStatus, Corpus, HarnessConfig, HarnessError};
use std::num::NonZeroUsize;

fn jobs(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn fixture_corpus_passes() {
    let corpus = Corpus::load(fixture_corpus()).unwrap();
    assert_eq!(corpus.len(), 16);
    let summary = harness().run(&corpus, jobs(4));
    summary.assert_all_passed();
    assert_eq!(summary.passed(), 15);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(
        summary.to_string(),
        "15 passed, 0 failed, 0 fatal, 1 skipped"
    );
}

#[test]
fn reports_follow_corpus_order() {
    let corpus = Corpus::load(fixture_corpus()).unwrap();
    let summary = harness().run(&corpus, jobs(3));
    let expected: Vec<String> = corpus.iter().map(|case| case.name()).collect();
    let actual: Vec<String> = summary.reports.iter().map(|r| r.name.clone()).collect();
    similar_asserts::assert_eq!(expected, actual);
    assert_eq!(
        actual.first().map(String::as_str),
        Some("basic/defined.yaml/defined/rule-equals")
    );
    assert_eq!(
        actual.last().map(String::as_str),
        Some("errors/input_term.yml/input_term/set")
    );
}

#[test]
fn single_worker_matches_many() {
    let corpus = Corpus::load(fixture_corpus()).unwrap();
    let one = harness().run(&corpus, jobs(1));
    let many = harness().run(&corpus, jobs(16));
    let statuses = |summary: &opa_conformance::RunSummary| -> Vec<String> {
        summary
            .reports
            .iter()
            .map(|r| format!("{}: {}", r.name, r.status))
            .collect()
    };
    similar_asserts::assert_eq!(statuses(&one), statuses(&many));
}

#[test]
fn run_with_config_applies_filter() {
    let config = HarnessConfig {
        corpus_path: fixture_corpus(),
        filter: Some("errors/errors.yaml".into()),
        jobs: jobs(2),
    };
    let summary = harness().run_with_config(&config).unwrap();
    assert_eq!(summary.reports.len(), 3);
    assert!(summary
        .reports
        .iter()
        .all(|r| r.name.starts_with("errors/errors.yaml/")));
    assert!(summary.is_success());

    // a directory prefix also selects the skipped raw-input case
    let config = HarnessConfig {
        filter: Some("errors/".into()),
        ..config
    };
    let summary = harness().run_with_config(&config).unwrap();
    assert_eq!(summary.reports.len(), 4);
    assert_eq!(summary.skipped(), 1);
}

#[test]
fn run_with_config_missing_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        corpus_path: dir.path().join("does-not-exist"),
        filter: None,
        jobs: jobs(1),
    };
    assert!(matches!(
        harness().run_with_config(&config),
        Err(HarnessError::Load(LoadError::Walk { .. }))
    ));
}

#[test]
fn failures_are_collected() {
    let corpus = Corpus::from_cases(vec![
        case(
            r#"
note: a/pass
query: data.x == 1
data:
  x: 1
want_defined: true
"#,
        ),
        case(
            r#"
note: b/fail
query: data.x == 1
data:
  x: 2
want_defined: true
"#,
        ),
        case(
            r#"
note: c/fatal
query: data.x == 1
"#,
        ),
    ])
    .unwrap();
    let summary = harness().run(&corpus, jobs(2));
    assert_eq!(
        summary.to_string(),
        "1 passed, 1 failed, 1 fatal, 0 skipped"
    );
    assert!(!summary.is_success());
    let failures: Vec<&str> = summary.failures().map(|r| r.name.as_str()).collect();
    assert_eq!(
        failures,
        ["scenarios.yaml/b/fail", "scenarios.yaml/c/fatal"]
    );
    assert!(matches!(
        summary.report("scenarios.yaml/c/fatal").map(|r| &r.status),
        Some(CaseStatus::Fatal(HarnessError::Case(_)))
    ));
}

#[test]
#[should_panic(expected = "scenarios.yaml/b/fail: failed: expected defined but got undefined")]
fn assert_all_passed_lists_failures() {
    let corpus = Corpus::from_cases(vec![case(
        r#"
note: b/fail
query: data.x == 1
want_defined: true
"#,
    )])
    .unwrap();
    harness().run(&corpus, jobs(1)).assert_all_passed();
}

#[test]
fn duplicate_cases_are_rejected() {
    let twice = r#"
note: dup
query: data.x == 1
want_defined: false
"#;
    assert!(matches!(
        Corpus::from_cases(vec![case(twice), case(twice)]),
        Err(LoadError::DuplicateCase(name)) if name == "scenarios.yaml/dup"
    ));
}

/// Runs the upstream corpus from an OPA checkout against the toy engine.
/// Only useful for timing the loader and driver: most upstream cases use
/// Rego the toy engine does not understand.
#[test]
#[ignore]
fn upstream_corpus_loads() {
    let config = HarnessConfig::from_env().unwrap();
    let summary = harness().run_with_config(&config).unwrap();
    assert!(!summary.reports.is_empty());
}

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

//! Driving test cases through a compiler and engine implementation.

use crate::assert::{check_outcome, Mismatch, Verdict};
use crate::cases::{CaseInput, Corpus, TestCase};
use crate::config::HarnessConfig;
use crate::engine::{Engine, EngineConfig, Evaluator, PolicyCompiler, PolicyModule};
use crate::err::HarnessError;
use itertools::Itertools;
use std::any::Any;
use std::fmt::{self, Display};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Reason reported for cases whose input is a raw Rego term
pub const RAW_INPUT_SKIP_REASON: &str = "not implemented: non-json input values";

/// Final state of one test case
#[derive(Debug)]
pub enum CaseStatus {
    /// The outcome matched the expectation
    Passed,
    /// The outcome did not match the expectation
    Failed(Mismatch),
    /// The case could not be checked
    Fatal(HarnessError),
    /// The case was not run
    Skipped(String),
}

impl CaseStatus {
    /// Is this a failed or fatal case
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Fatal(_))
    }
}

impl From<Verdict> for CaseStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Self::Passed,
            Verdict::Fail(mismatch) => Self::Failed(mismatch),
        }
    }
}

impl Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed(mismatch) => write!(f, "failed: {mismatch}"),
            Self::Fatal(err) => write!(f, "fatal: {err}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Report for one test case
#[derive(Debug)]
pub struct CaseReport {
    /// [`TestCase::name`] of the case
    pub name: String,
    /// How the case ended
    pub status: CaseStatus,
    /// Wall-clock time spent on the case
    pub duration: Duration,
}

/// Reports for a whole run, in corpus order
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per case
    pub reports: Vec<CaseReport>,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&CaseStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| f(&r.status)).count()
    }

    /// Number of passed cases
    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Passed))
    }

    /// Number of cases with a mismatch
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Failed(_)))
    }

    /// Number of cases stopped by a fatal error
    pub fn fatal(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Fatal(_)))
    }

    /// Number of skipped cases
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Skipped(_)))
    }

    /// Failed and fatal cases
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.reports.iter().filter(|r| r.status.is_failure())
    }

    /// No case failed
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Look up the report for a case by name
    pub fn report(&self, name: &str) -> Option<&CaseReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    /// Assert that no case failed.
    /// # Panics
    /// If any case failed or was fatal, listing every one of them.
    /// PANIC SAFETY only used in testing code
    #[allow(clippy::panic)]
    #[track_caller]
    pub fn assert_all_passed(&self) {
        if !self.is_success() {
            let failures = self
                .failures()
                .map(|r| format!("  {}: {}", r.name, r.status))
                .join("\n");
            panic!("{self}\n{failures}");
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} fatal, {} skipped",
            self.passed(),
            self.failed(),
            self.fatal(),
            self.skipped()
        )
    }
}

/// Timing function
pub fn time_function<X, F>(f: F) -> (X, Duration)
where
    F: FnOnce() -> X,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Runs test cases against a compiler and an engine.
#[derive(Debug)]
pub struct Harness<C, E> {
    compiler: C,
    engine: E,
}

impl<C: PolicyCompiler, E: Engine> Harness<C, E> {
    /// Create a harness for the given implementation
    pub fn new(compiler: C, engine: E) -> Self {
        Self { compiler, engine }
    }

    /// Run one test case. Panics in the compiler or engine are caught and
    /// reported as fatal for this case.
    pub fn run_case(&self, case: &TestCase) -> CaseReport {
        let name = case.name();
        info!(case = %name, "running test");
        let (status, duration) = time_function(|| {
            panic::catch_unwind(AssertUnwindSafe(|| self.case_status(case)))
                .unwrap_or_else(|payload| {
                    CaseStatus::Fatal(HarnessError::Panic(panic_message(&*payload)))
                })
        });
        match &status {
            CaseStatus::Passed => debug!(case = %name, ?duration, "passed"),
            CaseStatus::Skipped(reason) => warn!(case = %name, %reason, "skipped"),
            CaseStatus::Failed(mismatch) => error!(case = %name, %mismatch, "failed"),
            CaseStatus::Fatal(err) => error!(case = %name, %err, "fatal error"),
        }
        CaseReport {
            name,
            status,
            duration,
        }
    }

    fn case_status(&self, case: &TestCase) -> CaseStatus {
        if let CaseInput::RawTerm(_) = case.input() {
            return CaseStatus::Skipped(RAW_INPUT_SKIP_REASON.to_owned());
        }
        match self.check_case(case) {
            Ok(verdict) => verdict.into(),
            Err(err) => CaseStatus::Fatal(err),
        }
    }

    /// compile -> init -> evaluate -> check, stopping at the first fatal error
    fn check_case(&self, case: &TestCase) -> Result<Verdict, HarnessError> {
        let expectation = case.expectation()?;
        let modules = PolicyModule::numbered(&case.modules);
        debug!(query = %case.query, modules = modules.len(), "compiling");
        let policy = match self.compiler.compile(&case.query, &modules) {
            Ok(policy) => policy,
            Err(err) if expectation.expects_error() => {
                return check_outcome(&expectation, &Err(err));
            }
            Err(err) => return Err(HarnessError::Compile(err)),
        };
        let evaluator = self
            .engine
            .init(EngineConfig {
                policy,
                base_data: case.data.clone(),
            })
            .map_err(HarnessError::Init)?;
        debug!("evaluating");
        let outcome = evaluator.evaluate(case.input().document());
        check_outcome(&expectation, &outcome)
    }

    /// Run every case of `corpus` on up to `jobs` worker threads. Reports are
    /// returned in corpus order.
    pub fn run(&self, corpus: &Corpus, jobs: NonZeroUsize) -> RunSummary
    where
        C: Sync,
        E: Sync,
    {
        let cases = corpus.cases();
        let workers = jobs.get().min(cases.len());
        let next = AtomicUsize::new(0);
        // cases are independent, so workers just claim the next unclaimed index
        let mut reports: Vec<(usize, CaseReport)> = std::thread::scope(|scope| {
            let handles = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(case) = cases.get(index) else {
                                break done;
                            };
                            done.push((index, self.run_case(case)));
                        }
                    })
                })
                .collect_vec();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|p| panic::resume_unwind(p)))
                .collect()
        });
        reports.sort_by_key(|(index, _)| *index);
        let summary = RunSummary {
            reports: reports.into_iter().map(|(_, report)| report).collect(),
        };
        info!(%summary, "run complete");
        summary
    }

    /// Load the corpus described by `config` and run it.
    pub fn run_with_config(&self, config: &HarnessConfig) -> Result<RunSummary, HarnessError>
    where
        C: Sync,
        E: Sync,
    {
        let path = config.resolved_corpus_path()?;
        info!(corpus = %path.display(), "loading corpus");
        let mut corpus = Corpus::load(&path)?;
        if let Some(pattern) = &config.filter {
            corpus = corpus.filter(pattern);
        }
        Ok(self.run(&corpus, config.jobs))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

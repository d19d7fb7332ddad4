//! Per-submission orchestration.
//!
//! One workspace serves every test case of a submission. Between cases the
//! workspace is swept back to its protected entries (script plus staged
//! fixtures), so a case never sees the previous case's output-file residue
//! while fixtures staged earlier are reused for free.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{ExerciseWithTests, Language, TestCase};
use crate::sandbox::{workspace, RunResult, SandboxRunner};
use crate::services::comparator::{self, FileCheck, TestResult};

#[derive(Clone)]
pub struct GraderService {
    runner: Arc<SandboxRunner>,
}

impl GraderService {
    pub fn new(runner: Arc<SandboxRunner>) -> Self {
        Self { runner }
    }

    /// Grade a submission against every test case of the exercise, in order.
    /// The result sequence always has one entry per case; a per-case engine
    /// failure marks that case failed and grading continues.
    pub async fn grade(
        &self,
        exercise: &ExerciseWithTests,
        script: &str,
        language_id: &str,
    ) -> Result<Vec<TestResult>> {
        let language = self.runner.resolve_language(language_id).await?;
        let ws = self.runner.prepare_workspace(&language, script).await?;

        let outcome = self.run_cases(&ws, &language, &exercise.test_cases).await;
        self.runner.release(&ws).await;
        outcome
    }

    async fn run_cases(
        &self,
        ws: &Path,
        language: &Language,
        cases: &[TestCase],
    ) -> Result<Vec<TestResult>> {
        let mut protected: HashSet<String> = HashSet::from([language.script_file()]);
        let mut results = Vec::with_capacity(cases.len());

        for (i, case) in cases.iter().enumerate() {
            let index = i as i64 + 1;
            if i > 0 {
                if let Err(e) = workspace::sweep(ws, &protected).await {
                    tracing::error!(case = index, error = %e, "workspace sweep failed");
                    results.push(failed_result(index, case, format!("workspace sweep failed: {e}")));
                    continue;
                }
            }

            protected.extend(self.runner.stage_fixtures(ws, &case.fixtures).await);

            let run = self
                .runner
                .execute(
                    ws,
                    language,
                    &case.args,
                    &case.stdin_lines,
                    self.runner.default_timeout(),
                )
                .await?;

            let files = self.hash_output_files(ws, case).await;
            let result = comparator::evaluate(index, case, &run, files);
            tracing::debug!(case = index, passed = result.passed, "test case graded");
            results.push(result);
        }

        Ok(results)
    }

    async fn hash_output_files(&self, ws: &Path, case: &TestCase) -> Vec<FileCheck> {
        if case.output_files.is_empty() {
            return Vec::new();
        }
        comparator::check_output_files(ws, &case.output_files).await
    }

    /// Diagnostic: run a reference solution once, no test cases, no progress.
    pub async fn test_solution(&self, script: &str, language_id: &str) -> Result<RunResult> {
        let result = self
            .runner
            .run(script, language_id, &[], &[], &[], self.runner.default_timeout())
            .await?;
        self.runner.release(&result.workspace).await;
        Ok(result)
    }

    /// Diagnostic: run one ad-hoc case and hash the requested output files.
    pub async fn run_single_case(
        &self,
        script: &str,
        language_id: &str,
        args: &[String],
        stdin_lines: &[String],
        fixtures: &[String],
        output_files: &std::collections::HashMap<String, String>,
    ) -> Result<(RunResult, Vec<FileCheck>)> {
        let result = self
            .runner
            .run(
                script,
                language_id,
                args,
                stdin_lines,
                fixtures,
                self.runner.default_timeout(),
            )
            .await?;
        let checks = if output_files.is_empty() {
            Vec::new()
        } else {
            comparator::check_output_files(&result.workspace, output_files).await
        };
        self.runner.release(&result.workspace).await;
        Ok((result, checks))
    }
}

fn failed_result(index: i64, case: &TestCase, error: String) -> TestResult {
    TestResult {
        index,
        args: case.args.clone(),
        expected_stdout: case.expected_stdout.clone(),
        actual_stdout: String::new(),
        expected_stderr: case.expected_stderr.clone().unwrap_or_default(),
        actual_stderr: String::new(),
        expected_exit_code: case.expected_exit_code,
        actual_exit_code: None,
        output_files: Vec::new(),
        error: Some(error),
        timed_out: false,
        passed: false,
    }
}

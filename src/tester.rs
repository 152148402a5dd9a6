//! Tester mode: aggregate trial runs
//!
//! Runs N randomized trials against an uploaded push_swap/checker pair,
//! validates each emitted script both by replaying it and through the user's
//! own checker, and tallies pass rates.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::generator;
use crate::machine::{self, InvalidOp, Verdict};
use crate::runner::{ProgramRunner, RunStatus};

const STDERR_SNIPPET_LEN: usize = 200;

/// Parameters for one aggregate run.
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub list_size: u32,
    pub max_operations: u32,
    pub test_count: u32,
    pub show_args: bool,
}

/// A trial that could not produce a usable verdict. Recorded on the trial
/// row; never aborts the batch.
#[derive(Debug, Error)]
pub enum TrialError {
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOp),
    #[error("{program} timed out")]
    Timeout { program: &'static str },
    #[error("{program} exited with code {code}: {stderr}")]
    NonZeroExit {
        program: &'static str,
        code: i32,
        stderr: String,
    },
    #[error("{program} could not be run: {message}")]
    Process {
        program: &'static str,
        message: String,
    },
}

/// One row in the detail table sent back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialReport {
    pub test: u32,
    pub validation: bool,
    pub operations: usize,
    pub performance_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tallies over a whole batch, rates as whole percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub validation_passed: u32,
    pub performance_passed: u32,
    pub total_tests: u32,
    pub validation_rate: u32,
    pub performance_rate: u32,
}

/// Per-trial rows plus the batch tallies.
#[derive(Debug)]
pub struct BatchOutcome {
    pub details: Vec<TrialReport>,
    pub summary: TestSummary,
}

struct TrialOutcome {
    operations: usize,
    verdict: Verdict,
    checker_ok: bool,
}

/// Run the full aggregate: `test_count` independent trials, each on a fresh
/// random instance.
pub async fn run_test_batch(
    runner: &dyn ProgramRunner,
    push_swap: &Path,
    checker: &Path,
    plan: &TestPlan,
) -> BatchOutcome {
    info!(
        "Starting test batch: {} trials, list size {}, max {} operations",
        plan.test_count, plan.list_size, plan.max_operations
    );

    let mut details = Vec::with_capacity(plan.test_count as usize);
    let mut validation_passed = 0u32;
    let mut performance_passed = 0u32;

    for test in 1..=plan.test_count {
        let numbers = generator::random_sequence(plan.list_size);
        let args: Vec<String> = numbers.iter().map(ToString::to_string).collect();

        match run_trial(runner, push_swap, checker, &numbers, &args).await {
            Ok(outcome) => {
                let validation = outcome.verdict.is_sorted() && outcome.checker_ok;
                let performance_valid = outcome.operations <= plan.max_operations as usize;
                if validation {
                    validation_passed += 1;
                }
                if performance_valid {
                    performance_passed += 1;
                }
                details.push(TrialReport {
                    test,
                    validation,
                    operations: outcome.operations,
                    performance_valid,
                    args: plan.show_args.then(|| args.join(" ")),
                    error: None,
                });
            }
            Err(err) => {
                warn!("Trial {} failed: {}", test, err);
                details.push(TrialReport {
                    test,
                    validation: false,
                    operations: 0,
                    performance_valid: false,
                    args: Some(args.join(" ")),
                    error: Some(err.to_string()),
                });
            }
        }
    }

    info!(
        "Batch finished: {}/{} validation, {}/{} performance",
        validation_passed, plan.test_count, performance_passed, plan.test_count
    );

    BatchOutcome {
        summary: TestSummary {
            validation_passed,
            performance_passed,
            total_tests: plan.test_count,
            validation_rate: rate(validation_passed, plan.test_count),
            performance_rate: rate(performance_passed, plan.test_count),
        },
        details,
    }
}

/// Run the uploaded push_swap on an instance and hand back its script.
pub(crate) async fn solve_instance(
    runner: &dyn ProgramRunner,
    push_swap: &Path,
    args: &[String],
) -> Result<String, TrialError> {
    let solve = runner
        .run(push_swap, args, None)
        .await
        .map_err(|e| TrialError::Process {
            program: "push_swap",
            message: format!("{:#}", e),
        })?;
    match solve.status {
        RunStatus::Exited(0) => Ok(solve.stdout),
        RunStatus::TimeLimitExceeded => Err(TrialError::Timeout {
            program: "push_swap",
        }),
        RunStatus::Exited(code) => Err(TrialError::NonZeroExit {
            program: "push_swap",
            code,
            stderr: snippet(&solve.stderr),
        }),
    }
}

/// One trial: run push_swap on the instance, replay its script, then hand
/// the same script to the uploaded checker. One push_swap invocation feeds
/// both checks so a nondeterministic program cannot drift between them.
async fn run_trial(
    runner: &dyn ProgramRunner,
    push_swap: &Path,
    checker: &Path,
    numbers: &[i32],
    args: &[String],
) -> Result<TrialOutcome, TrialError> {
    let script = solve_instance(runner, push_swap, args).await?;

    let ops = machine::parse_script(&script)?;
    let verdict = machine::run(numbers, &ops);

    let check = runner
        .run(checker, args, Some(&script))
        .await
        .map_err(|e| TrialError::Process {
            program: "checker",
            message: format!("{:#}", e),
        })?;
    if check.status == RunStatus::TimeLimitExceeded {
        return Err(TrialError::Timeout { program: "checker" });
    }
    // The checker contract is its stdout: the literal OK and nothing else.
    let checker_ok = check.stdout.trim() == "OK";

    Ok(TrialOutcome {
        operations: ops.len(),
        verdict,
        checker_ok,
    })
}

fn rate(passed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u32
}

fn snippet(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_SNIPPET_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(STDERR_SNIPPET_LEN).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutcome;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out canned outcomes in order, one per invocation.
    struct ScriptedRunner {
        outcomes: Mutex<VecDeque<Result<RunOutcome>>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<RunOutcome>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl ProgramRunner for ScriptedRunner {
        async fn run(
            &self,
            _program: &Path,
            _args: &[String],
            _stdin: Option<&str>,
        ) -> Result<RunOutcome> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("more invocations than scripted outcomes")
        }
    }

    fn exited(code: i32, stdout: &str, stderr: &str) -> Result<RunOutcome> {
        Ok(RunOutcome {
            status: RunStatus::Exited(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    fn timed_out() -> Result<RunOutcome> {
        Ok(RunOutcome {
            status: RunStatus::TimeLimitExceeded,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn plan(test_count: u32, max_operations: u32) -> TestPlan {
        // Single-element instances keep every trial verdict deterministic
        // regardless of which numbers the generator draws.
        TestPlan {
            list_size: 1,
            max_operations,
            test_count,
            show_args: false,
        }
    }

    #[tokio::test]
    async fn batch_tallies_mixed_trials() {
        let runner = ScriptedRunner::new(vec![
            // trial 1: empty script, checker agrees
            exited(0, "", ""),
            exited(0, "OK\n", ""),
            // trial 2: two rotations, still sorted, but over the op budget
            exited(0, "ra\nra\n", ""),
            exited(0, "OK\n", ""),
            // trial 3: garbage op, checker never runs
            exited(0, "xx\n", ""),
            // trial 4: hung push_swap
            timed_out(),
        ]);

        let outcome = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &plan(4, 1),
        )
        .await;

        assert_eq!(outcome.details.len(), 4);
        assert!(outcome.details[0].validation);
        assert!(outcome.details[0].performance_valid);
        assert!(outcome.details[1].validation);
        assert!(!outcome.details[1].performance_valid);
        assert_eq!(outcome.details[1].operations, 2);
        assert!(!outcome.details[2].validation);
        assert!(outcome.details[2]
            .error
            .as_deref()
            .unwrap()
            .contains("invalid operation"));
        assert!(outcome.details[3]
            .error
            .as_deref()
            .unwrap()
            .contains("timed out"));

        assert_eq!(outcome.summary.validation_passed, 2);
        assert_eq!(outcome.summary.performance_passed, 1);
        assert_eq!(outcome.summary.total_tests, 4);
        assert_eq!(outcome.summary.validation_rate, 50);
        assert_eq!(outcome.summary.performance_rate, 25);
    }

    #[tokio::test]
    async fn checker_disagreement_fails_validation() {
        let runner = ScriptedRunner::new(vec![exited(0, "", ""), exited(0, "KO\n", "")]);

        let outcome = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &plan(1, 100),
        )
        .await;

        assert!(!outcome.details[0].validation);
        assert!(outcome.details[0].error.is_none());
        assert_eq!(outcome.summary.validation_passed, 0);
    }

    #[tokio::test]
    async fn leftover_stack_b_fails_even_when_checker_approves() {
        let runner = ScriptedRunner::new(vec![exited(0, "pb\n", ""), exited(0, "OK\n", "")]);

        let outcome = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &plan(1, 100),
        )
        .await;

        assert!(!outcome.details[0].validation);
        assert_eq!(outcome.details[0].operations, 1);
    }

    #[tokio::test]
    async fn nonzero_exit_becomes_an_error_row() {
        let runner = ScriptedRunner::new(vec![exited(139, "", "segfault")]);

        let outcome = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &plan(1, 100),
        )
        .await;

        let row = &outcome.details[0];
        assert!(!row.validation);
        assert!(!row.performance_valid);
        let msg = row.error.as_deref().unwrap();
        assert!(msg.contains("exited with code 139"));
        assert!(msg.contains("segfault"));
        assert!(row.args.is_some());
    }

    #[tokio::test]
    async fn args_follow_the_show_args_flag() {
        let runner = ScriptedRunner::new(vec![
            exited(0, "", ""),
            exited(0, "OK\n", ""),
            exited(0, "", ""),
            exited(0, "OK\n", ""),
        ]);

        let hidden = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &plan(1, 100),
        )
        .await;
        assert!(hidden.details[0].args.is_none());

        let mut shown_plan = plan(1, 100);
        shown_plan.show_args = true;
        let shown = run_test_batch(
            &runner,
            Path::new("push_swap"),
            Path::new("checker"),
            &shown_plan,
        )
        .await;
        assert!(shown.details[0].args.is_some());
    }

    #[test]
    fn rates_round_to_nearest() {
        assert_eq!(rate(1, 3), 33);
        assert_eq!(rate(2, 3), 67);
        assert_eq!(rate(90, 100), 90);
        assert_eq!(rate(0, 0), 0);
    }

    #[test]
    fn stderr_snippet_is_bounded() {
        let long = "x".repeat(5000);
        assert!(snippet(&long).len() <= STDERR_SNIPPET_LEN + 4);
        assert_eq!(snippet("  boom  "), "boom");
    }
}

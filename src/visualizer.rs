//! Visualizer mode: one instance, full script
//!
//! Runs the uploaded push_swap on a single random instance and returns the
//! numbers plus the operation list for client-side stepping.

use std::path::Path;

use tracing::info;

use crate::generator;
use crate::machine::{self, Replay, Verdict};
use crate::runner::ProgramRunner;
use crate::tester::{self, TrialError};

/// Everything the animation needs: the instance, the script, and where the
/// replay ends up.
#[derive(Debug)]
pub struct VisualizeOutcome {
    pub numbers: Vec<i32>,
    pub operations: Vec<String>,
    pub verdict: Verdict,
}

/// Generate one instance, run the program on it, and strictly parse its
/// script. A script with an unknown code is an error here: the client cannot
/// step an operation that does not exist.
pub async fn prepare(
    runner: &dyn ProgramRunner,
    push_swap: &Path,
    list_size: u32,
) -> Result<VisualizeOutcome, TrialError> {
    let numbers = generator::random_sequence(list_size);
    let args: Vec<String> = numbers.iter().map(ToString::to_string).collect();

    let script = tester::solve_instance(runner, push_swap, &args).await?;
    let ops = machine::parse_script(&script)?;
    let operations: Vec<String> = ops.iter().map(|op| op.to_string()).collect();

    // Drive the replay to its end; the reported verdict is the state the
    // client's own stepping finishes on.
    let mut replay = Replay::new(&numbers, ops);
    while !replay.is_finished() {
        replay.step();
    }
    let verdict = replay.verdict();

    info!(
        "Visualization ready: {} numbers, {} operations, verdict {}",
        numbers.len(),
        replay.cursor(),
        verdict
    );

    Ok(VisualizeOutcome {
        numbers,
        operations,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunOutcome, RunStatus};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hands out one canned outcome per invocation.
    struct ScriptedRunner {
        outcomes: Mutex<Vec<Result<RunOutcome>>>,
    }

    impl ScriptedRunner {
        fn one(outcome: Result<RunOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(vec![outcome]),
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
            self.outcomes.lock().unwrap().pop().expect("no outcome left")
        }
    }

    fn exited(stdout: &str) -> Result<RunOutcome> {
        Ok(RunOutcome {
            status: RunStatus::Exited(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    #[tokio::test]
    async fn returns_instance_and_canonical_tokens() {
        let runner = ScriptedRunner::one(exited("ra\n rra \n"));
        let outcome = prepare(&runner, Path::new("push_swap"), 1).await.unwrap();
        assert_eq!(outcome.numbers.len(), 1);
        assert_eq!(outcome.operations, vec!["ra", "rra"]);
        assert_eq!(outcome.verdict, Verdict::Sorted);
    }

    #[tokio::test]
    async fn garbage_script_is_rejected() {
        let runner = ScriptedRunner::one(exited("sa\nxx\n"));
        let err = prepare(&runner, Path::new("push_swap"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TrialError::InvalidOperation(_)));
        assert!(err.to_string().contains("xx"));
    }

    #[tokio::test]
    async fn hung_program_is_reported() {
        let runner = ScriptedRunner::one(Ok(RunOutcome {
            status: RunStatus::TimeLimitExceeded,
            stdout: String::new(),
            stderr: String::new(),
        }));
        let err = prepare(&runner, Path::new("push_swap"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TrialError::Timeout { .. }));
    }
}
